//! Loading the multi-label source dataset from a local export.
//!
//! Supported layouts:
//! - JSONL: `{"text": "...", "labels": [17, 27], "id": "..."}` per line
//! - TSV: GoEmotions raw split files, no header, `text<TAB>17,27<TAB>id`
//! - CSV: header row with `text`, `labels` and optional `id`

use crate::dataset::RawExample;
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Jsonl,
    Tsv,
    Csv,
}

impl SourceFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> TrainingResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).unwrap_or_default();
        match ext.as_str() {
            "jsonl" | "json" | "ndjson" => Ok(Self::Jsonl),
            "tsv" => Ok(Self::Tsv),
            "csv" => Ok(Self::Csv),
            _ => Err(TrainingError::Dataset(format!(
                "cannot infer source format from {}; use .jsonl, .tsv or .csv",
                path.display()
            ))),
        }
    }
}

impl FromStr for SourceFormat {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" | "json" => Ok(Self::Jsonl),
            "tsv" => Ok(Self::Tsv),
            "csv" => Ok(Self::Csv),
            other => Err(TrainingError::InvalidSpec(format!("unknown source format: {other}"))),
        }
    }
}

/// Read every row of the source dataset.
pub fn read_source(path: &Path, format: Option<SourceFormat>) -> TrainingResult<Vec<RawExample>> {
    if !path.exists() {
        return Err(TrainingError::Dataset(format!("source dataset does not exist: {}", path.display())));
    }
    let format = match format {
        Some(f) => f,
        None => SourceFormat::from_path(path)?,
    };

    let rows = match format {
        SourceFormat::Jsonl => read_jsonl(path)?,
        SourceFormat::Tsv => read_delimited(path, b'\t', false)?,
        SourceFormat::Csv => read_delimited(path, b',', true)?,
    };

    debug!(path = %path.display(), format = ?format, rows = rows.len(), "Loaded source dataset");
    Ok(rows)
}

fn read_jsonl(path: &Path) -> TrainingResult<Vec<RawExample>> {
    let contents = std::fs::read_to_string(path)?;
    let mut rows = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row: RawExample = serde_json::from_str(line).map_err(|e| {
            TrainingError::Dataset(format!("failed to parse jsonl line {}: {}", idx + 1, e))
        })?;
        rows.push(row);
    }

    Ok(rows)
}

#[derive(Deserialize)]
struct DelimitedRow {
    text: String,
    labels: String,
    #[serde(default)]
    id: Option<String>,
}

fn read_delimited(path: &Path, delimiter: u8, has_headers: bool) -> TrainingResult<Vec<RawExample>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .quoting(has_headers)
        .flexible(true)
        .from_path(path)?;

    let parsed: Vec<DelimitedRow> = if has_headers {
        reader.deserialize().collect::<Result<_, _>>()?
    } else {
        reader
            .records()
            .map(|record| {
                record.map(|r| DelimitedRow {
                    text: r.get(0).unwrap_or_default().to_string(),
                    labels: r.get(1).unwrap_or_default().to_string(),
                    id: r.get(2).map(str::to_string),
                })
            })
            .collect::<Result<_, _>>()?
    };

    let mut rows = Vec::with_capacity(parsed.len());
    for (idx, row) in parsed.into_iter().enumerate() {
        let line = idx + 1 + usize::from(has_headers);
        let labels = parse_label_list(&row.labels)
            .map_err(|e| TrainingError::Dataset(format!("line {line}: {e}")))?;
        rows.push(RawExample { text: row.text, labels, id: row.id.filter(|s| !s.is_empty()) });
    }

    Ok(rows)
}

/// Parse a comma-separated label list such as `"17,27"`.
pub fn parse_label_list(raw: &str) -> Result<Vec<usize>, String> {
    let labels = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|e| format!("invalid label '{s}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    if labels.is_empty() {
        return Err("empty label list".to_string());
    }
    Ok(labels)
}
