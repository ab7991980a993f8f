//! Parsers for the supported feed formats.
mod compliance;
mod oem;
mod starlink;
mod tle;

pub use compliance::ComplianceParser;
pub use oem::OemParser;
pub use starlink::StarlinkParser;
pub use tle::TleParser;

use arcade_shared::types::CatalogId;

/// Accepts COSPAR designators in their `YYYY-NNNP{1,3}` form.
pub(crate) fn cospar_id(value: &str) -> Option<CatalogId> {
    let value = value.trim().to_ascii_uppercase();
    let (year, rest) = value.split_once('-')?;
    let launch = rest.get(..3)?;
    let piece = rest.get(3..)?;

    let well_formed = year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
        && launch.chars().all(|c| c.is_ascii_digit())
        && (1..=3).contains(&piece.len())
        && piece.chars().all(|c| c.is_ascii_uppercase());
    if !well_formed {
        return None;
    }
    CatalogId::cospar(&value).ok()
}

/// Identifier of the object a file is named after (`.../<id>.<ext>`).
pub(crate) fn file_stem(entry_key: &str) -> &str {
    let file = entry_key.rsplit('/').next().unwrap_or(entry_key);
    file.split('.').next().unwrap_or(file)
}
