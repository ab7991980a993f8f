//! Error types for the importer engine, feeds and parsers.
mod feed;
mod import;
mod parse;

pub use feed::FeedError;
pub use import::ImportError;
pub use parse::ParseError;
