use criterion::{black_box, criterion_group, criterion_main, Criterion};
use forecast_pipeline::{DataLoader, LoadForecastPipeline, PipelineConfig};
use polars::prelude::*;

const YEARS: [&str; 5] = [
    "2019/2020",
    "2020/2021",
    "2021/2022",
    "2022/2023",
    "2023/2024",
];

/// One GSP followed by `primaries` Primary substations, each with its detail row.
fn synthetic_sheet(gsps: usize, primaries: usize) -> DataFrame {
    let mut name = vec![];
    let mut gsp = vec![];
    let mut nrn = vec![];
    let mut voltage = vec![];
    let mut bus1 = vec![];
    let mut bus2 = vec![];
    let mut summer = vec![];
    let mut years: Vec<Vec<Option<String>>> = vec![vec![]; YEARS.len()];

    let mut push = |row: [Option<String>; 7], demand: Vec<Option<f64>>| {
        let [n, g, r, v, b1, b2, s] = row;
        name.push(n);
        gsp.push(g);
        nrn.push(r);
        voltage.push(v);
        bus1.push(b1);
        bus2.push(b2);
        summer.push(s);
        for (column, value) in years.iter_mut().zip(demand) {
            column.push(value.map(|d| format!("{:.2}", d)));
        }
    };

    for g in 0..gsps {
        let total = 100.0 + g as f64;
        push(
            [None, Some(format!("GSP{}", g)), None, Some("132/33".into()), None, None, Some("70%".into())],
            vec![Some(total * 0.95); 5],
        );
        push([None, None, None, None, None, None, None], vec![Some(total); 5]);

        for p in 0..primaries {
            // every third primary has a gap for the estimator to fill
            let demand: Vec<Option<f64>> = (0..YEARS.len())
                .map(|y| (p % 3 != 0 || y != 2).then(|| 10.0 + p as f64 + y as f64))
                .collect();
            push(
                [
                    Some(format!("P{}-{}", g, p)),
                    None,
                    Some(format!("NRN{}{}", g, p)),
                    Some("33/11".into()),
                    Some(format!("{}", 3000 + p)),
                    Some(format!("{}", 4000 + p)),
                    None,
                ],
                demand,
            );
            let second = (p % 2 == 0).then(|| "40%".to_string());
            push(
                [None, None, None, None, Some("60%".into()), second, None],
                vec![None; 5],
            );
        }
    }
    drop(push);

    let mut columns = vec![
        Series::new("Name", name),
        Series::new("GSP", gsp),
        Series::new("NRN", nrn),
        Series::new("Voltage Ratio", voltage),
        Series::new("PSS/E Bus #1", bus1),
        Series::new("PSS/E Bus #2", bus2),
        Series::new("Summer %", summer),
    ];
    for (label, values) in YEARS.iter().zip(years) {
        columns.push(Series::new(label, values));
    }
    DataFrame::new(columns).unwrap()
}

fn benchmark_ingest(c: &mut Criterion) {
    let df = synthetic_sheet(20, 50);
    let loader = DataLoader::new(&PipelineConfig::default()).unwrap();

    c.bench_function("ingest_2k_rows", |b| {
        b.iter(|| black_box(loader.from_dataframe(&df).unwrap()));
    });
}

fn benchmark_full_run(c: &mut Criterion) {
    let df = synthetic_sheet(20, 50);
    let config = PipelineConfig::fill();
    let loader = DataLoader::new(&config).unwrap();
    let table = loader.from_dataframe(&df).unwrap();
    let pipeline = LoadForecastPipeline::new(config);

    c.bench_function("pipeline_fill_2k_rows", |b| {
        b.iter(|| black_box(pipeline.run(table.clone()).unwrap()));
    });
}

criterion_group!(benches, benchmark_ingest, benchmark_full_run);
criterion_main!(benches);
