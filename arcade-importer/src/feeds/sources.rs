use std::sync::Arc;

use arcade_shared::types::{DataSourceSpec, DedupePolicy};
use cos::Bucket;

use super::{BucketFeed, HttpFeed};
use crate::errors::FeedError;
use crate::parsers::{ComplianceParser, OemParser, StarlinkParser, TleParser};

pub const TLE_SOURCE: &str = "CelesTrak - TLE";
pub const UT_OEM_SOURCE: &str = "UT - OEM";
pub const STARLINK_OEM_SOURCE: &str = "Starlink - OEM";
pub const COMPLIANCE_SOURCE: &str = "UN - Compliance";

const TLE_ENTRY_KEY: &str = "tle/catalog.txt";
const UT_OEM_PATTERN: &str = r"(^|/)[0-9]{1,9}\.oem$";
const STARLINK_OEM_PATTERN: &str = r"\.zip$";
const COMPLIANCE_PATTERN: &str = r"\.csv$";

fn spec(name: &str, default: DedupePolicy, dedupe: Option<DedupePolicy>) -> DataSourceSpec {
    DataSourceSpec::new(name)
        .public(true)
        .dedupe(dedupe.unwrap_or(default))
}

/// Two- or three-line element sets downloaded from `url`.
pub fn tle_feed(url: &str, dedupe: Option<DedupePolicy>) -> HttpFeed<TleParser> {
    HttpFeed::new(
        spec(TLE_SOURCE, DedupePolicy::ExactKey, dedupe),
        url,
        TLE_ENTRY_KEY,
        TleParser,
    )
}

/// CCSDS OEM files named after the NORAD id of their object.
pub fn ut_oem_feed(
    bucket: Arc<dyn Bucket>,
    dedupe: Option<DedupePolicy>,
) -> Result<BucketFeed<OemParser>, FeedError> {
    BucketFeed::new(
        spec(UT_OEM_SOURCE, DedupePolicy::ExactKey, dedupe),
        bucket,
        UT_OEM_PATTERN,
        OemParser,
    )
}

/// Zip archives of Starlink ephemeris text files.
pub fn starlink_oem_feed(
    bucket: Arc<dyn Bucket>,
    dedupe: Option<DedupePolicy>,
) -> Result<BucketFeed<StarlinkParser>, FeedError> {
    BucketFeed::new(
        spec(STARLINK_OEM_SOURCE, DedupePolicy::ExactKey, dedupe),
        bucket,
        STARLINK_OEM_PATTERN,
        StarlinkParser,
    )
}

/// UN registration compliance exports (`aso_id,calc_time,is_compliant`).
///
/// Compliance is recalculated over time, so every ingestion is kept as a new
/// version by default.
pub fn compliance_feed(
    bucket: Arc<dyn Bucket>,
    dedupe: Option<DedupePolicy>,
) -> Result<BucketFeed<ComplianceParser>, FeedError> {
    BucketFeed::new(
        spec(COMPLIANCE_SOURCE, DedupePolicy::AlwaysNew, dedupe),
        bucket,
        COMPLIANCE_PATTERN,
        ComplianceParser,
    )
}
