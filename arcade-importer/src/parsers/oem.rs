//! CCSDS orbit ephemeris messages in KVN form, one object per file.
use std::collections::HashMap;

use arcade_shared::types::{CatalogId, DataPayload, EphemerisLine, OrbitEphemerisMessage};

use crate::errors::ParseError;
use crate::feed::{EntryParser, Observation, RecordOutcome};
use crate::parsers::{cospar_id, file_stem};

/// Files are named after the NORAD catalog number of the object they
/// describe, e.g. `25544.oem`.
pub struct OemParser;

impl EntryParser for OemParser {
    fn parse(&self, entry_key: &str, raw: &[u8]) -> Result<Vec<RecordOutcome>, ParseError> {
        let text = std::str::from_utf8(raw)?;
        Ok(vec![parse_message(entry_key, text)])
    }
}

fn parse_message(entry_key: &str, text: &str) -> RecordOutcome {
    let norad = CatalogId::norad(file_stem(entry_key))?;

    let mut fields: HashMap<String, String> = HashMap::new();
    let mut ephemeris_lines = Vec::new();
    let mut in_meta = false;

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("COMMENT") {
            continue;
        }
        match line {
            "META_START" => {
                in_meta = true;
                continue;
            }
            "META_STOP" => {
                in_meta = false;
                continue;
            }
            "COVARIANCE_START" => break,
            _ => {}
        }

        if let Some((key, value)) = line.split_once('=') {
            fields.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
            continue;
        }
        if in_meta {
            return Err(ParseError::malformed(format!("unexpected metadata line: {}", line)));
        }

        let ephemeris_line = parse_data_line(line)?;
        let reached_stop = fields
            .get("stop_time")
            .is_some_and(|stop| *stop == ephemeris_line.epoch);
        ephemeris_lines.push(ephemeris_line);
        if reached_stop {
            break;
        }
    }

    let mut field = |name: &str| {
        fields
            .remove(name)
            .ok_or_else(|| ParseError::MissingField(name.to_string()))
    };
    let oem = OrbitEphemerisMessage {
        ccsds_oem_vers: field("ccsds_oem_vers")?,
        creation_date: field("creation_date")?,
        originator: field("originator")?,
        object_name: field("object_name")?,
        object_id: field("object_id")?,
        center_name: field("center_name")?,
        ref_frame: field("ref_frame")?,
        time_system: field("time_system")?,
        start_time: field("start_time")?,
        stop_time: field("stop_time")?,
        ephemeris_lines,
    };

    let mut identifiers = vec![norad.clone()];
    if let Some(cospar) = cospar_id(&oem.object_id) {
        identifiers.push(cospar);
    }
    let dedup_key = format!("{}:{}:{}", norad.value(), oem.creation_date, oem.stop_time);
    let name = Some(oem.object_name.clone()).filter(|n| !n.is_empty());

    let payload = DataPayload::Ephemeris(oem);
    payload.validate()?;

    Ok(Observation {
        dedup_key,
        identifiers,
        name,
        payload,
    })
}

/// `<epoch> x y z vx vy vz [ax ay az]`
pub(crate) fn parse_data_line(line: &str) -> Result<EphemerisLine, ParseError> {
    let mut parts = line.split_whitespace();
    let epoch = parts
        .next()
        .ok_or_else(|| ParseError::malformed("empty data line"))?
        .to_string();

    let values = parts
        .take(6)
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| ParseError::malformed(format!("invalid number '{}' at {}", v, epoch)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let state_vector: [f64; 6] = values
        .try_into()
        .map_err(|_| ParseError::malformed(format!("state vector at {} is incomplete", epoch)))?;

    Ok(EphemerisLine {
        epoch,
        state_vector,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_OEM: &str = "CCSDS_OEM_VERS = 2.0
COMMENT generated for tests
CREATION_DATE = 2020-11-24T06:06:01
ORIGINATOR = UT

META_START
OBJECT_NAME = ISS (ZARYA)
OBJECT_ID = 1998-067A
CENTER_NAME = EARTH
REF_FRAME = EME2000
TIME_SYSTEM = UTC
START_TIME = 2020-11-24T06:00:00
STOP_TIME = 2020-11-24T06:02:00
META_STOP

2020-11-24T06:00:00 -2956.1 5208.6 -2443.7 -4.12 -4.73 -4.07
2020-11-24T06:01:00 -3195.3 4913.4 -2682.2 -3.85 -5.10 -3.87
2020-11-24T06:02:00 -3418.6 4596.3 -2908.3 -3.59 -5.45 -3.65
2020-11-24T06:03:00 -3625.1 4258.9 -3120.9 -3.30 -5.78 -3.43

COVARIANCE_START
EPOCH = 2020-11-24T06:00:00
COVARIANCE_STOP
";

    #[test]
    fn test_parses_message() {
        let records = OemParser.parse("ut/25544.oem", ISS_OEM.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let observation = records.into_iter().next().unwrap().unwrap();

        assert_eq!(observation.dedup_key, "25544:2020-11-24T06:06:01:2020-11-24T06:02:00");
        assert_eq!(observation.name.as_deref(), Some("ISS (ZARYA)"));
        let keys: Vec<_> = observation.identifiers.iter().map(|id| id.key()).collect();
        assert_eq!(keys, vec!["norad:25544", "cospar:1998-067A"]);

        let DataPayload::Ephemeris(oem) = observation.payload else {
            panic!("expected ephemeris");
        };
        // Lines after STOP_TIME are not part of the message.
        assert_eq!(oem.ephemeris_lines.len(), 3);
        assert_eq!(oem.ephemeris_lines[1].state_vector[0], -3195.3);
        assert_eq!(oem.originator, "UT");
    }

    #[test]
    fn test_missing_metadata_is_a_record_error() {
        let text = ISS_OEM.replace("REF_FRAME = EME2000\n", "");
        let records = OemParser.parse("25544.oem", text.as_bytes()).unwrap();
        assert!(matches!(&records[0], Err(ParseError::MissingField(f)) if f == "ref_frame"));
    }

    #[test]
    fn test_unknown_frame_fails_validation() {
        let text = ISS_OEM.replace("EME2000", "MARS_FIXED");
        let records = OemParser.parse("25544.oem", text.as_bytes()).unwrap();
        assert!(matches!(records[0], Err(ParseError::Validation(_))));
    }

    #[test]
    fn test_non_numeric_file_name() {
        let records = OemParser.parse("ut/iss.oem", ISS_OEM.as_bytes()).unwrap();
        assert!(matches!(records[0], Err(ParseError::Validation(_))));
    }

    #[test]
    fn test_invalid_utf8_fails_the_entry() {
        assert!(matches!(
            OemParser.parse("25544.oem", &[0xff, 0xfe, 0x00]),
            Err(ParseError::Utf8(_))
        ));
    }

    #[test]
    fn test_short_state_vector() {
        assert!(parse_data_line("2020-11-24T06:00:00 1.0 2.0").is_err());
        assert!(parse_data_line("2020-11-24T06:00:00 1 2 3 4 5 x").is_err());
        let line = parse_data_line("2020-11-24T06:00:00 1 2 3 4 5 6 7 8 9").unwrap();
        assert_eq!(line.state_vector, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
