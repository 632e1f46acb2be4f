use anyhow::Result;
use clap::{Parser, ValueEnum};
use forecast_pipeline::{
    to_dataframe, write_table, DataLoader, LoadForecastPipeline, OutputFormat, PipelineConfig,
};
use log::{info, warn};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "forecast_pipeline")]
#[command(about = "Classify, fill and estimate a substation load-forecast sheet")]
struct Args {
    /// Load estimate sheet exported to CSV
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (defaults to <input>_processed.<ext> next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON pipeline configuration; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Impute missing feeder shares, forecast years and seasonal values
    #[arg(long)]
    fill: bool,

    /// Percentile used for seasonal fill (0-100)
    #[arg(short, long)]
    percentile: Option<usize>,

    /// Output table format
    #[arg(long, value_enum, default_value = "csv")]
    output_format: OutputFormat,

    /// Also write the good and bad rows to separate files
    #[arg(long)]
    split: bool,

    /// How to report the run
    #[arg(short, long, value_enum, default_value = "summary")]
    report: ReportFormat,
}

#[derive(Clone, ValueEnum)]
enum ReportFormat {
    Json,
    Summary,
}

fn sibling(input: &Path, suffix: &str, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "load_estimates".to_string());
    input.with_file_name(format!("{}_{}.{}", stem, suffix, format.extension()))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Starting load forecast processing");

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if args.fill {
        config.fill = true;
    }
    if let Some(percentile) = args.percentile {
        config.seasonal_percentile = percentile;
    }

    let loader = DataLoader::new(&config)?;
    let table = loader.load_csv(&args.input)?;
    if table.years.is_empty() {
        warn!("No YYYY/YYYY forecast columns found in {}", args.input.display());
    }

    let output = LoadForecastPipeline::new(config).run(table)?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| sibling(&args.input, "processed", args.output_format));
    let mut df = to_dataframe(&output.table)?;
    write_table(&mut df, &output_path, args.output_format)?;

    if args.split {
        let (good, bad) = output.quality.split(&output.table);
        write_table(
            &mut to_dataframe(&good)?,
            sibling(&args.input, "good", args.output_format),
            args.output_format,
        )?;
        write_table(
            &mut to_dataframe(&bad)?,
            sibling(&args.input, "bad", args.output_format),
            args.output_format,
        )?;
    }

    match args.report {
        ReportFormat::Json => {
            let report = serde_json::json!({
                "input": args.input,
                "output": output_path,
                "rows_in": output.rows_in,
                "rows_out": output.table.len(),
                "quality": output.quality,
                "seasonal": output.seasonal,
                "issues": output.issues,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ReportFormat::Summary => {
            println!("Load Forecast Summary");
            println!("=====================");
            println!("Input: {}", args.input.display());
            println!("Output: {}", output_path.display());
            println!(
                "Rows: {} in, {} kept ({} good, {} bad)",
                output.rows_in,
                output.table.len(),
                output.quality.good_rows.len(),
                output.quality.bad_rows.len()
            );
            println!("Forecast years: {}", output.table.years.len());
            for (season, value) in &output.seasonal.values {
                match value {
                    Some(v) => println!(
                        "Seasonal {}th percentile, {}: {:.3}",
                        output.seasonal.percentile, season, v
                    ),
                    None => println!("Seasonal {}: no values", season),
                }
            }
            if !output.issues.is_empty() {
                println!();
                println!("Issues by kind:");
                for (kind, count) in &output.quality.issue_counts {
                    println!("  {}: {}", kind, count);
                }
                println!();
                for issue in &output.issues {
                    println!("  {}", issue);
                }
            }
        }
    }

    Ok(())
}
