use forecast_pipeline::{DataLoader, FeederShare, LoadForecastPipeline, PipelineConfig};
use polars::prelude::*;

fn main() -> anyhow::Result<()> {
    // A GSP with its aggregate row, and one Primary with a forecast gap and
    // a half-known feeder split on the row beneath it.
    let sheet = df!(
        "Name" => [None, None, Some("Riverside"), None],
        "GSP" => [Some("NORTH"), None, None, None],
        "NRN" => [None, None, Some("NRN-0042"), None],
        "Voltage Ratio" => [Some("132/33"), None, Some("33/11"), None],
        "PSS/E Bus #1" => [None, None, Some("3001"), Some("60%")],
        "PSS/E Bus #2" => [None, None, Some("3002"), None],
        "Winter %" => [Some("80%"), None, None, None],
        "2019/2020" => [Some("90"), Some("100"), Some("10"), None],
        "2020/2021" => [Some("91"), Some("101"), None, None],
        "2021/2022" => [Some("92"), Some("102"), Some("12"), None]
    )?;

    let config = PipelineConfig::fill();
    let table = DataLoader::new(&config)?.from_dataframe(&sheet)?;
    let output = LoadForecastPipeline::new(config).run(table)?;

    println!("Load Forecast Example");
    println!("=====================");
    println!(
        "Rows: {} in, {} classified",
        output.rows_in,
        output.table.len()
    );
    println!();

    for record in &output.table.records {
        println!(
            "{} ({}) under GSP {}",
            record.name.as_deref().unwrap_or("-"),
            record.role,
            record.gsp_reference.as_deref().unwrap_or("?")
        );
        if let Some(factor) = record.diversity_factor {
            println!("  Diversity factor: {:.3}", factor);
        }
        for (year, (demand, estimate)) in output
            .table
            .years
            .iter()
            .zip(record.year_demand.iter().zip(&record.year_estimate))
        {
            let marker = if estimate.is_some() { " (estimated)" } else { "" };
            match demand {
                Some(value) => println!("  {}: {:.2} MW{}", year.label, value, marker),
                None => println!("  {}: -", year.label),
            }
        }
        for (feeder, share) in output.table.feeders.iter().zip(&record.feeder_share) {
            match share {
                FeederShare::Known(v) => println!("  {}: {:.0}%", feeder.name, v * 100.0),
                FeederShare::Filled(v) => {
                    println!("  {}: {:.0}% (filled)", feeder.name, v * 100.0)
                }
                FeederShare::Missing => println!("  {}: missing", feeder.name),
                FeederShare::Unassigned => {}
            }
        }
    }

    if !output.issues.is_empty() {
        println!();
        println!("Issues:");
        for issue in &output.issues {
            println!("  {}", issue);
        }
    }
    Ok(())
}
