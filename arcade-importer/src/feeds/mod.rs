//! Concrete feeds and the registrations of the known data sources.
mod bucket;
mod http;
mod sources;

pub use bucket::BucketFeed;
pub use http::HttpFeed;
pub use sources::{
    compliance_feed, starlink_oem_feed, tle_feed, ut_oem_feed, COMPLIANCE_SOURCE,
    STARLINK_OEM_SOURCE, TLE_SOURCE, UT_OEM_SOURCE,
};
