use anyhow::{Context, Result};
use glob::glob;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Columns every processed sheet must carry.
const DERIVED_COLUMNS: [&str; 4] = ["source_row", "Sub_GSP", "Sub_Primary", "diverse_factor"];

fn read_processed(path: &Path) -> Result<DataFrame> {
    let df = match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => LazyFrame::scan_parquet(path, Default::default())?.collect()?,
        Some("arrow") => IpcReader::new(File::open(path)?).finish()?,
        _ => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
    };
    Ok(df)
}

fn flags(df: &DataFrame, column: &str) -> Result<Vec<bool>> {
    let text = df.column(column)?.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.eq_ignore_ascii_case("true")).unwrap_or(false))
        .collect())
}

/// Check one processed table; returns the number of problems found.
pub fn verify_table(df: &DataFrame, gsp_column: &str) -> Result<usize> {
    let names = df.get_column_names();
    let missing: Vec<&str> = DERIVED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !names.contains(c))
        .collect();
    if !missing.is_empty() {
        println!("    ❌ Missing derived columns: {:?}", missing);
        return Ok(missing.len());
    }

    let mut issues = 0;

    let unique_rows = df.column("source_row")?.n_unique()?;
    if unique_rows != df.height() {
        let duplicates = df.height() - unique_rows;
        println!("    ❌ Found {} duplicate source rows", duplicates);
        issues += duplicates;
    } else {
        println!("    ✅ No duplicate source rows");
    }

    let gsp = flags(df, "Sub_GSP")?;
    let primary = flags(df, "Sub_Primary")?;
    let misclassified = gsp.iter().zip(&primary).filter(|(g, p)| g == p).count();
    if misclassified > 0 {
        println!(
            "    ❌ {} rows are not exactly one of GSP or Primary",
            misclassified
        );
        issues += misclassified;
    } else {
        println!("    ✅ Every row is a GSP or a Primary");
    }

    if names.contains(&gsp_column) {
        let references = df.column(gsp_column)?.cast(&DataType::String)?;
        let orphans = references
            .str()?
            .into_iter()
            .zip(&primary)
            .filter(|(reference, is_primary)| **is_primary && reference.is_none())
            .count();
        if orphans > 0 {
            println!("    ⚠️  {} Primary rows have no GSP reference", orphans);
            issues += orphans;
        } else {
            println!("    ✅ Every Primary has a GSP reference");
        }
    }

    let factors = df.column("diverse_factor")?.cast(&DataType::Float64)?;
    let out_of_range = factors
        .f64()?
        .into_iter()
        .flatten()
        .filter(|f| *f <= 0.0 || *f > 1.0)
        .count();
    if out_of_range > 0 {
        println!(
            "    ❌ {} diversity factors outside (0, 1]",
            out_of_range
        );
        issues += out_of_range;
    } else {
        println!("    ✅ Diversity factors within (0, 1]");
    }

    println!("    📊 Total records: {}", df.height());
    println!(
        "    📊 GSP rows: {}, Primary rows: {}",
        gsp.iter().filter(|g| **g).count(),
        primary.iter().filter(|p| **p).count()
    );
    Ok(issues)
}

/// Re-read every processed sheet under `dir` and report structural problems.
pub fn verify_results(dir: &Path, gsp_column: &str) -> Result<usize> {
    println!("\n🔍 Load Estimate Verification");
    println!("{}", "=".repeat(60));

    let mut files: Vec<PathBuf> = Vec::new();
    for ext in ["csv", "parquet", "arrow"] {
        let pattern = dir.join(format!("*_processed.{}", ext));
        let pattern = pattern
            .to_str()
            .with_context(|| format!("non UTF-8 path: {}", pattern.display()))?;
        files.extend(glob(pattern)?.filter_map(Result::ok));
    }
    files.sort();

    if files.is_empty() {
        println!("⚠️  No processed sheets found in {}", dir.display());
        return Ok(0);
    }
    println!("📁 Checking {} processed sheets", files.len());

    let mut total_issues = 0;
    for file in &files {
        println!("\n  Verifying: {}", file.display());
        let df = read_processed(file).with_context(|| format!("reading {}", file.display()))?;
        total_issues += verify_table(&df, gsp_column)?;
    }

    println!("\n{}", "=".repeat(60));
    if total_issues == 0 {
        println!("✅ Verification passed! No issues found.");
    } else {
        println!("⚠️  Verification found {} issues", total_issues);
    }
    Ok(total_issues)
}
