use anyhow::{bail, Result};
use forecast_pipeline::{OutputFormat, PipelineConfig};
use std::path::PathBuf;

mod batch_processor;
mod verify;

use batch_processor::BatchProcessor;

fn print_usage() {
    println!("Usage:");
    println!("  load_estimates --process <input_dir> [--output <dir>] [--fill] [--format csv|parquet|ipc] [--config <file.json>]");
    println!("  load_estimates --verify-results <dir>");
    println!("Example: --process sheets --output processed --fill --format parquet");
}

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_format(value: Option<&str>) -> Result<OutputFormat> {
    match value {
        None | Some("csv") => Ok(OutputFormat::Csv),
        Some("parquet") => Ok(OutputFormat::Parquet),
        Some("ipc") | Some("arrow") => Ok(OutputFormat::Ipc),
        Some(other) => bail!("Unknown output format: {}", other),
    }
}

fn load_config(args: &[String]) -> Result<PipelineConfig> {
    let mut config = match flag_value(args, "--config") {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if args.iter().any(|a| a == "--fill") {
        config.fill = true;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()?;

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--process" {
        if args.len() > 2 {
            let input_dir = PathBuf::from(&args[2]);
            let output_dir = flag_value(&args, "--output")
                .map(PathBuf::from)
                .unwrap_or_else(|| input_dir.join("processed"));
            let config = load_config(&args)?;
            let format = parse_format(flag_value(&args, "--format"))?;

            let start = std::time::Instant::now();
            let summaries =
                BatchProcessor::new(input_dir, output_dir, config, format).process_all()?;
            let failed = summaries.iter().filter(|s| !s.succeeded()).count();

            println!(
                "\n✅ Processed {} sheets in {:?} ({} failed)",
                summaries.len(),
                start.elapsed(),
                failed
            );
        } else {
            print_usage();
        }
    } else if args.len() > 1 && args[1] == "--verify-results" {
        let dir = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        let config = load_config(&args)?;
        verify::verify_results(&dir, &config.columns.gsp)?;
    } else {
        print_usage();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flag_value() {
        let a = args(&["bin", "--process", "in", "--format", "parquet"]);
        assert_eq!(flag_value(&a, "--format"), Some("parquet"));
        assert_eq!(flag_value(&a, "--output"), None);
        assert_eq!(flag_value(&args(&["bin", "--format"]), "--format"), None);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format(None).unwrap(), OutputFormat::Csv);
        assert_eq!(parse_format(Some("arrow")).unwrap(), OutputFormat::Ipc);
        assert!(parse_format(Some("xlsx")).is_err());
    }

    #[test]
    fn test_fill_flag_overrides_default() {
        assert!(load_config(&args(&["bin", "--process", "in", "--fill"])).unwrap().fill);
        assert!(!load_config(&args(&["bin", "--process", "in"])).unwrap().fill);
    }
}
