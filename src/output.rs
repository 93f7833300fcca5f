use anyhow::{Context, Result};
use chrono::Local;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::api::Record;

/// Default run journal file name.
pub const LOG_FILE: &str = "scraper.log";

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Write the fetched records as a timestamped JSON and CSV pair.
pub fn write_results(records: &[Record], dir: &Path) -> Result<OutputPaths> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let paths = OutputPaths {
        json: dir.join(format!("results_{}.json", stamp)),
        csv: dir.join(format!("results_{}.csv", stamp)),
    };
    save_json(records, &paths.json)?;
    save_csv(records, &paths.csv)?;
    Ok(paths)
}

pub fn save_json(records: &[Record], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialize results")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write JSON file {}", path.display()))?;
    Ok(())
}

pub fn save_csv(records: &[Record], path: &Path) -> Result<()> {
    let header = csv_header(records);
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;

    writer
        .write_record(&header)
        .context("Failed to write CSV header")?;
    for record in records {
        let row: Vec<String> = header
            .iter()
            .map(|field| record.get(field).map(cell_value).unwrap_or_default())
            .collect();
        writer.write_record(&row).context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

/// Union of all field names across the records, sorted for a stable header.
pub fn csv_header(records: &[Record]) -> Vec<String> {
    let mut fields = BTreeSet::new();
    for record in records {
        for key in record.keys() {
            fields.insert(key.clone());
        }
    }
    fields.into_iter().collect()
}

fn cell_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Append-only run journal. Every milestone and every error path lands here.
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        RunLog { path: path.into() }
    }

    /// Append one timestamped line. A journal write failure is reported but
    /// never turns into a run failure of its own.
    pub fn append(&self, message: &str) {
        let line = format!("{} - {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", line));
        if let Err(e) = result {
            log::warn!("Failed to append to {}: {}", self.path.display(), e);
        }
    }
}
