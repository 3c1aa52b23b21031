// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use edaflow::chart::{ChartKind, ChartRenderer as _, SvgChartRenderer};
use edaflow::ingest::{summary_text, CsvLoader, TabularLoader as _};

mod fixtures;
mod profiler;

use fixtures::Case;

// Benchmark identity (keep stable):
// - Groups: `ingest.load`, `ingest.summary`, `chart.render`
// - Case IDs are the fixture ids (`small`, `medium`, `wide`), suffixed with the chart slug in
//   `chart.render`.
fn benches_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest.load");
    for case in Case::ALL {
        let payload = fixtures::csv(case);
        group.bench_function(case.id(), |b| {
            b.iter(|| {
                let table = CsvLoader.load("bench.csv", black_box(&payload)).expect("load");
                black_box(table.row_count())
            })
        });
    }
    group.finish();

    let mut group = c.benchmark_group("ingest.summary");
    for case in Case::ALL {
        let table = CsvLoader.load("bench.csv", &fixtures::csv(case)).expect("load");
        group.bench_function(case.id(), |b| b.iter(|| black_box(summary_text(black_box(&table)).len())));
    }
    group.finish();
}

fn benches_charts(c: &mut Criterion) {
    let mut group = c.benchmark_group("chart.render");
    for case in Case::ALL {
        let table = CsvLoader.load("bench.csv", &fixtures::csv(case)).expect("load");
        let numeric = table.select(&table.numeric_column_names());
        for kind in [ChartKind::Distribution, ChartKind::Spread, ChartKind::Correlation, ChartKind::MissingValues] {
            let input = if kind == ChartKind::MissingValues { &table } else { &numeric };
            group.bench_function(format!("{}_{}", case.id(), kind.slug()), |b| {
                b.iter(|| {
                    let image = SvgChartRenderer.render(kind, black_box(input)).expect("render");
                    black_box(image.to_data_url().len())
                })
            });
        }
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_ingest, benches_charts
}
criterion_main!(benches);
