//! Input providers for loading signatures from files

use crate::math::{InputPolicy, ScalarField};
use crate::signature::{parse_batch, Signature, SignatureInput};
use anyhow::{bail, Context, Result};
use std::io::{self, Read};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Json,
    Csv,
}

/// Reads a file, or stdin for `-`, and converts every record against `field`.
pub fn load_signatures(
    input: &str,
    field: &ScalarField,
    policy: InputPolicy,
) -> Result<Vec<Signature>> {
    let content = if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))?
    };

    parse_signatures(&content, field, policy)
}

pub fn parse_signatures(
    content: &str,
    field: &ScalarField,
    policy: InputPolicy,
) -> Result<Vec<Signature>> {
    let inputs = parse_inputs(content)?;
    parse_batch(&inputs, field, policy)
}

pub fn parse_inputs(content: &str) -> Result<Vec<SignatureInput>> {
    let format = detect_format(content)?;
    let inputs = match format {
        Format::Json => parse_json(content)?,
        Format::Csv => parse_csv(content)?,
    };
    debug!(?format, records = inputs.len(), "parsed signature input");
    Ok(inputs)
}

const BOM: &str = "\u{FEFF}";

pub fn detect_format(content: &str) -> Result<Format> {
    let trimmed = content.strip_prefix(BOM).unwrap_or(content).trim_start();

    if trimmed.starts_with('[') {
        return Ok(Format::Json);
    }

    if let Some(first_line) = trimmed.lines().next() {
        let columns: Vec<String> = first_line
            .split(',')
            .map(|c| c.trim().to_lowercase())
            .collect();
        let has_r = columns.iter().any(|c| c == "r");
        let has_s = columns.iter().any(|c| c == "s");
        let has_z = columns.iter().any(|c| c == "z");
        if has_r && has_s && has_z {
            return Ok(Format::Csv);
        }
    }

    bail!("Unable to detect input format. Use JSON array or CSV with r,s,z header.")
}

fn parse_json(content: &str) -> Result<Vec<SignatureInput>> {
    let content = content.strip_prefix(BOM).unwrap_or(content);
    Ok(serde_json::from_str(content)?)
}

fn parse_csv(content: &str) -> Result<Vec<SignatureInput>> {
    let content = content.strip_prefix(BOM).unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut inputs = Vec::new();
    for result in reader.deserialize() {
        inputs.push(result?);
    }
    Ok(inputs)
}
