//! UN registration compliance exports: `aso_id,calc_time,is_compliant`.
use arcade_shared::types::{CatalogId, DataPayload, UnCompliance};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;

use crate::errors::ParseError;
use crate::feed::{EntryParser, Observation, RecordOutcome};

const COLUMNS: [&str; 3] = ["aso_id", "calc_time", "is_compliant"];

#[derive(Debug, Deserialize)]
struct ComplianceRow {
    aso_id: String,
    calc_time: String,
    is_compliant: String,
}

pub struct ComplianceParser;

impl EntryParser for ComplianceParser {
    fn parse(&self, _entry_key: &str, raw: &[u8]) -> Result<Vec<RecordOutcome>, ParseError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(raw);

        let headers = rdr.headers()?;
        if let Some(missing) = COLUMNS
            .iter()
            .find(|column| !headers.iter().any(|h| h == **column))
        {
            return Err(ParseError::MissingField(missing.to_string()));
        }

        Ok(rdr
            .deserialize::<ComplianceRow>()
            .map(|row| row.map_err(ParseError::from).and_then(observation))
            .collect())
    }
}

fn observation(row: ComplianceRow) -> RecordOutcome {
    let identifier = if !row.aso_id.is_empty() && row.aso_id.chars().all(|c| c.is_ascii_digit()) {
        CatalogId::norad(&row.aso_id)?
    } else {
        CatalogId::aso(&row.aso_id)?
    };

    let payload = DataPayload::Compliance(UnCompliance {
        is_compliant: parse_flag(&row.is_compliant)?,
        calc_time: row.calc_time,
    });
    payload.validate()?;

    Ok(Observation {
        dedup_key: identifier.key(),
        identifiers: vec![identifier],
        name: None,
        payload,
    })
}

fn parse_flag(value: &str) -> Result<bool, ParseError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        other => Err(ParseError::malformed(format!("invalid is_compliant '{}'", other))),
    }
}
