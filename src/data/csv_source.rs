use super::Dataset;
use crate::utils::error::{AutoencoderError, Result};

/// Parse a numeric CSV where every record is one feature window.
pub fn decode(bytes: &[u8], has_headers: bool) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut dim: Option<usize> = None;
    let mut rows = 0usize;
    let mut values = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        match dim {
            None => dim = Some(record.len()),
            Some(expected) if expected != record.len() => {
                return Err(AutoencoderError::shape(
                    format!("{} columns", expected),
                    format!("{} columns on record {}", record.len(), line + 1),
                ));
            }
            Some(_) => {}
        }

        for (col, field) in record.iter().enumerate() {
            let value = field.parse::<f32>().map_err(|_| {
                AutoencoderError::data_format(format!(
                    "record {}, column {}: '{}' is not a number",
                    line + 1,
                    col + 1,
                    field
                ))
            })?;
            values.push(value);
        }
        rows += 1;
    }

    Dataset::new(rows, dim.unwrap_or(0), values)
}
