use anyhow::{Context, Result};
use csv::Writer;
use forecast_pipeline::{
    to_dataframe, write_table, DataLoader, LoadForecastPipeline, OutputFormat, PipelineConfig,
    Role,
};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffixes this processor writes; sheets carrying them are never re-processed.
const OUTPUT_SUFFIXES: [&str; 3] = ["_processed", "_good", "_bad"];

/// One line of the batch summary CSV.
#[derive(Debug, Clone, Serialize)]
pub struct SheetSummary {
    pub sheet: String,
    pub status: String,
    pub rows_in: usize,
    pub rows_kept: usize,
    pub gsp_rows: usize,
    pub primary_rows: usize,
    pub good_rows: usize,
    pub bad_rows: usize,
    pub issues: usize,
    pub forecast_years: usize,
    pub processed_at: String,
}

impl SheetSummary {
    fn failed(sheet: String, error: &anyhow::Error) -> Self {
        Self {
            sheet,
            status: format!("failed: {:#}", error),
            rows_in: 0,
            rows_kept: 0,
            gsp_rows: 0,
            primary_rows: 0,
            good_rows: 0,
            bad_rows: 0,
            issues: 0,
            forecast_years: 0,
            processed_at: timestamp(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == "ok"
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn sheet_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct BatchProcessor {
    input_dir: PathBuf,
    output_dir: PathBuf,
    config: PipelineConfig,
    format: OutputFormat,
}

impl BatchProcessor {
    pub fn new(
        input_dir: PathBuf,
        output_dir: PathBuf,
        config: PipelineConfig,
        format: OutputFormat,
    ) -> Self {
        Self {
            input_dir,
            output_dir,
            config,
            format,
        }
    }

    /// Every `*.csv` sheet directly inside the input directory, sorted.
    pub fn find_sheets(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.input_dir.join("*.csv");
        let pattern = pattern
            .to_str()
            .with_context(|| format!("non UTF-8 path: {}", pattern.display()))?;

        let mut sheets: Vec<PathBuf> = glob(pattern)?
            .filter_map(Result::ok)
            .filter(|path| {
                let name = sheet_name(path);
                !OUTPUT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
            })
            .collect();
        sheets.sort();
        Ok(sheets)
    }

    pub fn process_all(&self) -> Result<Vec<SheetSummary>> {
        println!("🚀 Load Estimate Batch Processor");
        println!("Using {} threads", rayon::current_num_threads());
        println!("{}", "=".repeat(60));

        let sheets = self.find_sheets()?;
        if sheets.is_empty() {
            println!("⚠️  No CSV sheets found in {}", self.input_dir.display());
            return Ok(Vec::new());
        }
        println!("📁 Found {} sheets in {}", sheets.len(), self.input_dir.display());
        fs::create_dir_all(&self.output_dir)?;

        let pb = ProgressBar::new(sheets.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?,
        );

        // sheets are independent, one pipeline run each
        let summaries: Vec<SheetSummary> = sheets
            .par_iter()
            .map(|sheet| {
                let summary = self
                    .process_sheet(sheet)
                    .unwrap_or_else(|e| SheetSummary::failed(sheet_name(sheet), &e));
                pb.inc(1);
                summary
            })
            .collect();
        pb.finish_with_message("Sheets processed");

        for summary in &summaries {
            if summary.succeeded() {
                println!(
                    "  ✅ {}: {} rows kept ({} GSP, {} Primary), {} bad",
                    summary.sheet,
                    summary.rows_kept,
                    summary.gsp_rows,
                    summary.primary_rows,
                    summary.bad_rows
                );
            } else {
                println!("  ❌ {}: {}", summary.sheet, summary.status);
            }
        }

        let summary_path = self.write_summary(&summaries)?;
        println!("📋 Summary written to {}", summary_path.display());
        Ok(summaries)
    }

    pub fn process_sheet(&self, sheet: &Path) -> Result<SheetSummary> {
        let loader = DataLoader::new(&self.config)?;
        let table = loader.load_csv(sheet)?;
        let output = LoadForecastPipeline::new(self.config.clone())
            .run(table)
            .with_context(|| format!("processing {}", sheet.display()))?;

        let name = sheet_name(sheet);
        let ext = self.format.extension();
        write_table(
            &mut to_dataframe(&output.table)?,
            self.output_dir.join(format!("{}_processed.{}", name, ext)),
            self.format,
        )?;

        let (good, bad) = output.quality.split(&output.table);
        write_table(
            &mut to_dataframe(&good)?,
            self.output_dir.join(format!("{}_good.{}", name, ext)),
            self.format,
        )?;
        write_table(
            &mut to_dataframe(&bad)?,
            self.output_dir.join(format!("{}_bad.{}", name, ext)),
            self.format,
        )?;

        Ok(SheetSummary {
            sheet: name,
            status: "ok".to_string(),
            rows_in: output.rows_in,
            rows_kept: output.table.len(),
            gsp_rows: output.table.count_role(Role::Gsp),
            primary_rows: output.table.count_role(Role::Primary),
            good_rows: output.quality.good_rows.len(),
            bad_rows: output.quality.bad_rows.len(),
            issues: output.quality.total_issues(),
            forecast_years: output.table.years.len(),
            processed_at: timestamp(),
        })
    }

    fn write_summary(&self, summaries: &[SheetSummary]) -> Result<PathBuf> {
        let path = self.output_dir.join("batch_summary.csv");
        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create summary file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);
        for summary in summaries {
            writer
                .serialize(summary)
                .context("Failed to write summary row")?;
        }
        writer.flush()?;
        Ok(path)
    }
}
