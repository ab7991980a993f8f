//! Two-line element sets, optionally preceded by a name line.
use std::ops::Range;

use arcade_shared::types::{CatalogId, DataPayload, TwoLineElementSet};
use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::errors::ParseError;
use crate::feed::{EntryParser, Observation, RecordOutcome};
use crate::parsers::cospar_id;

const LINE_LENGTH: usize = 69;
const MICROS_PER_DAY: f64 = 86_400_000_000.0;

pub struct TleParser;

impl EntryParser for TleParser {
    fn parse(&self, _entry_key: &str, raw: &[u8]) -> Result<Vec<RecordOutcome>, ParseError> {
        let text = std::str::from_utf8(raw)?;
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();

        let mut records = Vec::new();
        let mut name: Option<&str> = None;
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            if line.starts_with("1 ") {
                match lines.get(i + 1) {
                    Some(next) if next.starts_with("2 ") => {
                        records.push(parse_element_set(name.take(), line, next));
                        i += 2;
                    }
                    _ => {
                        name = None;
                        records.push(Err(ParseError::malformed(format!(
                            "line 1 without line 2: {}",
                            line
                        ))));
                        i += 1;
                    }
                }
            } else if line.starts_with("2 ") {
                name = None;
                records.push(Err(ParseError::malformed(format!(
                    "line 2 without line 1: {}",
                    line
                ))));
                i += 1;
            } else {
                if let Some(dangling) = name.replace(line) {
                    records.push(Err(ParseError::malformed(format!(
                        "name without element set: {}",
                        dangling
                    ))));
                }
                i += 1;
            }
        }

        if let Some(dangling) = name {
            records.push(Err(ParseError::malformed(format!(
                "name without element set: {}",
                dangling
            ))));
        }
        Ok(records)
    }
}

fn parse_element_set(name: Option<&str>, line1: &str, line2: &str) -> RecordOutcome {
    verify_checksum(1, line1)?;
    verify_checksum(2, line2)?;

    let catalog_number = column(line1, 2..7)?;
    if column(line2, 2..7)? != catalog_number {
        return Err(ParseError::malformed(format!(
            "catalog numbers differ between lines: {} / {}",
            catalog_number,
            column(line2, 2..7)?
        )));
    }
    let norad = CatalogId::norad(catalog_number)?;

    let mut identifiers = vec![norad.clone()];
    if let Some(cospar) = international_designator(column(line1, 9..17)?) {
        identifiers.push(cospar);
    }

    let epoch_field = column(line1, 18..32)?;
    let epoch = parse_epoch(epoch_field)?;

    let name = name
        .map(|n| n.strip_prefix("0 ").unwrap_or(n).trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(Observation {
        dedup_key: format!("{}:{}", norad.value(), epoch_field),
        identifiers,
        name: name.clone(),
        payload: DataPayload::TwoLineElements(TwoLineElementSet {
            name,
            line1: line1.to_string(),
            line2: line2.to_string(),
            epoch,
        }),
    })
}

fn column(line: &str, range: Range<usize>) -> Result<&str, ParseError> {
    line.get(range.clone()).map(str::trim).ok_or_else(|| {
        ParseError::malformed(format!(
            "line too short for columns {}-{}",
            range.start + 1,
            range.end
        ))
    })
}

/// Modulo-10 checksum over the first 68 columns; `-` counts as 1.
fn verify_checksum(line_no: u8, line: &str) -> Result<(), ParseError> {
    if line.len() < LINE_LENGTH {
        return Err(ParseError::malformed(format!(
            "line {} has {} columns, expected {}",
            line_no,
            line.len(),
            LINE_LENGTH
        )));
    }
    let bytes = line.as_bytes();
    let expected = char::from(bytes[LINE_LENGTH - 1])
        .to_digit(10)
        .ok_or_else(|| ParseError::malformed(format!("line {} checksum is not a digit", line_no)))?;
    let computed = bytes[..LINE_LENGTH - 1]
        .iter()
        .map(|b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10;

    if expected != computed {
        return Err(ParseError::Checksum {
            line: line_no,
            expected,
            computed,
        });
    }
    Ok(())
}

fn two_digit_year(yy: &str) -> Result<i32, ParseError> {
    let yy: i32 = yy
        .parse()
        .map_err(|_| ParseError::malformed(format!("invalid year '{}'", yy)))?;
    Ok(if yy < 57 { 2000 + yy } else { 1900 + yy })
}

/// `98067A` becomes `1998-067A`. Designators that do not follow the
/// launch-year/launch-number/piece layout are ignored.
fn international_designator(field: &str) -> Option<CatalogId> {
    let year = two_digit_year(field.get(..2)?).ok()?;
    let launch = field.get(2..5)?;
    let piece = field.get(5..)?;
    cospar_id(&format!("{}-{}{}", year, launch, piece))
}

/// Epoch as `YYDDD.DDDDDDDD`: two-digit year and fractional day of year.
fn parse_epoch(field: &str) -> Result<DateTime<Utc>, ParseError> {
    let invalid = || ParseError::malformed(format!("invalid epoch '{}'", field));

    let year = two_digit_year(field.get(..2).ok_or_else(invalid)?)?;
    let day: f64 = field.get(2..).ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    if !(1.0..367.0).contains(&day) {
        return Err(invalid());
    }

    let start = NaiveDate::from_yo_opt(year, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(invalid)?
        .and_utc();
    let offset = Duration::microseconds(((day - 1.0) * MICROS_PER_DAY).round() as i64);
    Ok(start + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
";

    #[test]
    fn test_parses_three_line_set() {
        let records = TleParser.parse("tle/catalog.txt", ISS.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let observation = records.into_iter().next().unwrap().unwrap();

        assert_eq!(observation.dedup_key, "25544:08264.51782528");
        assert_eq!(observation.name.as_deref(), Some("ISS (ZARYA)"));
        let keys: Vec<_> = observation.identifiers.iter().map(|id| id.key()).collect();
        assert_eq!(keys, vec!["norad:25544", "cospar:1998-067A"]);

        let DataPayload::TwoLineElements(tle) = observation.payload else {
            panic!("expected element set");
        };
        assert_eq!(tle.epoch.year(), 2008);
        assert_eq!(tle.epoch.ordinal(), 264);
        assert_eq!(tle.epoch.hour(), 12);
    }

    #[test]
    fn test_bad_checksum_is_a_record_error() {
        let corrupted = ISS.replace("2927", "2928");
        let records = TleParser.parse("tle/catalog.txt", corrupted.as_bytes()).unwrap();
        assert!(matches!(
            records[0],
            Err(ParseError::Checksum { line: 1, expected: 8, computed: 7 })
        ));
    }

    #[test]
    fn test_malformed_record_does_not_hide_the_rest() {
        let text = format!("0 BROKEN\n1 99999U\n{}", ISS);
        let records = TleParser.parse("tle/catalog.txt", text.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_err());
        assert!(records[1].is_ok());
    }

    #[test]
    fn test_two_line_sets_have_no_name() {
        let two_line: String = ISS.lines().skip(1).collect::<Vec<_>>().join("\n");
        let records = TleParser.parse("tle/catalog.txt", two_line.as_bytes()).unwrap();
        let observation = records.into_iter().next().unwrap().unwrap();
        assert_eq!(observation.name, None);
    }

    #[test]
    fn test_epoch_parsing() {
        let epoch = parse_epoch("20001.50000000").unwrap();
        assert_eq!(epoch.to_rfc3339(), "2020-01-01T12:00:00+00:00");
        assert!(parse_epoch("20400.0").is_err());
        assert!(parse_epoch("xx001.0").is_err());
    }
}
