//! Starlink ephemeris archives: a zip of `MEME_<norad>_<name>_....txt`
//! files, each holding the predicted trajectory of one satellite.
use std::io::{Cursor, Read};

use arcade_shared::types::{CatalogId, DataPayload, OrbitEphemerisMessage};
use chrono::{NaiveDate, NaiveDateTime};

use crate::errors::ParseError;
use crate::feed::{EntryParser, Observation, RecordOutcome};
use crate::parsers::oem::parse_data_line;

const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const HEADER_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct StarlinkParser;

impl EntryParser for StarlinkParser {
    fn parse(&self, _entry_key: &str, raw: &[u8]) -> Result<Vec<RecordOutcome>, ParseError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(raw))
            .map_err(|e| ParseError::Archive(e.to_string()))?;

        let mut records = Vec::new();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| ParseError::Archive(e.to_string()))?;
            if file.is_dir() || !file.name().ends_with(".txt") {
                continue;
            }
            let file_name = file.name().to_string();

            let mut text = String::new();
            let record = match file.read_to_string(&mut text) {
                Ok(_) => parse_file(&file_name, &text),
                Err(e) => Err(ParseError::malformed(format!("{}: {}", file_name, e))),
            };
            records.push(record);
        }
        Ok(records)
    }
}

fn parse_file(file_name: &str, text: &str) -> RecordOutcome {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    let mut parts = base.split('_').skip(1);
    let (Some(norad), Some(object_name)) = (parts.next(), parts.next()) else {
        return Err(ParseError::malformed(format!("unexpected file name {}", file_name)));
    };
    let norad = CatalogId::norad(norad)?;

    let mut creation_date = None;
    let mut start_time = None;
    let mut stop_time = None;
    let mut ephemeris_lines = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            break;
        }
        match line_no {
            0 => creation_date = Some(header_time(line.get(8..))?),
            1 => {
                start_time = Some(header_time(line.get(16..39))?);
                stop_time = Some(header_time(line.get(55..78))?);
            }
            // State vectors sit on every fourth line, followed by covariance rows.
            n if n % 4 == 0 => {
                let mut ephemeris_line = parse_data_line(line)?;
                ephemeris_line.epoch = ephemeris_time(&ephemeris_line.epoch)?;
                ephemeris_lines.push(ephemeris_line);
            }
            _ => {}
        }
    }

    let creation_date =
        creation_date.ok_or_else(|| ParseError::MissingField("creation_date".to_string()))?;
    let stop_time = stop_time.ok_or_else(|| ParseError::MissingField("stop_time".to_string()))?;
    let start_time =
        start_time.ok_or_else(|| ParseError::MissingField("start_time".to_string()))?;

    let payload = DataPayload::Ephemeris(OrbitEphemerisMessage {
        ccsds_oem_vers: "2.0".to_string(),
        creation_date: creation_date.clone(),
        originator: "Starlink".to_string(),
        object_name: object_name.to_string(),
        object_id: norad.value().to_string(),
        center_name: "EARTH".to_string(),
        ref_frame: "EME2000".to_string(),
        time_system: "UTC".to_string(),
        start_time,
        stop_time: stop_time.clone(),
        ephemeris_lines,
    });
    payload.validate()?;

    Ok(Observation {
        dedup_key: format!("{}:{}:{}", norad.value(), creation_date, stop_time),
        identifiers: vec![norad],
        name: Some(object_name.to_string()),
        payload,
    })
}

/// `2020-11-24 06:06:01 UTC` to `2020-11-24T06:06:01`.
fn header_time(field: Option<&str>) -> Result<String, ParseError> {
    let field = field
        .ok_or_else(|| ParseError::malformed("header line too short"))?
        .trim();
    let value = field.strip_suffix("UTC").unwrap_or(field).trim();
    let parsed = NaiveDateTime::parse_from_str(value, HEADER_FORMAT)
        .map_err(|e| ParseError::malformed(format!("invalid header time '{}': {}", field, e)))?;
    Ok(parsed.format(OUTPUT_FORMAT).to_string())
}

/// `YYYYDDDhhmmss.ffffff`, day of year included.
fn ephemeris_time(field: &str) -> Result<String, ParseError> {
    let invalid = || ParseError::malformed(format!("invalid ephemeris time '{}'", field));
    let number = |range: std::ops::Range<usize>| -> Result<u32, ParseError> {
        field
            .get(range)
            .filter(|s| s.chars().all(|c| c.is_ascii_digit()))
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)
    };

    let year = number(0..4)? as i32;
    let ordinal = number(4..7)?;
    let (hour, minute, second) = (number(7..9)?, number(9..11)?, number(11..13)?);

    let micros = match field.get(13..) {
        None | Some("") => 0,
        Some(rest) => {
            let fraction = rest.strip_prefix('.').ok_or_else(invalid)?;
            if fraction.len() > 6 || !fraction.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            format!("{:0<6}", fraction).parse::<u32>().map_err(|_| invalid())?
        }
    };

    let time = NaiveDate::from_yo_opt(year, ordinal)
        .and_then(|date| date.and_hms_micro_opt(hour, minute, second, micros))
        .ok_or_else(invalid)?;
    Ok(time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string())
}
