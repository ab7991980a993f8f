//! Conversions between Neo4j rows and domain values.
use std::collections::BTreeSet;
use std::str::FromStr;

use arcade_shared::types::{
    AccessEvent, CatalogId, CosObject, DataNode, DataPayload, DataSource, DedupePolicy,
    ImportProgress, SpaceObject, User, UserAccessCount,
};
use chrono::{DateTime, SecondsFormat, Utc};
use neo4rs::Row;

use crate::errors::RepositoryError;

pub(super) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(super) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| RepositoryError::InvalidData(format!("timestamp '{}': {}", value, e)))
}

pub(super) fn parse<T>(value: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::InvalidData(format!("'{}': {}", value, e)))
}

fn parse_opt<T>(value: Option<String>) -> Result<Option<T>, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.as_deref().map(parse).transpose()
}

fn non_negative(value: i64, field: &str) -> Result<u64, RepositoryError> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::InvalidData(format!("negative {}: {}", field, value)))
}

pub(super) fn space_object(row: &Row) -> Result<SpaceObject, RepositoryError> {
    let identifiers = row
        .get::<Vec<String>>("identifiers")?
        .iter()
        .map(|key| parse::<CatalogId>(key))
        .collect::<Result<BTreeSet<_>, _>>()?;

    Ok(SpaceObject {
        id: parse(&row.get::<String>("id")?)?,
        identifiers,
        name: row.get::<Option<String>>("name")?,
        created_at: parse_timestamp(&row.get::<String>("created_at")?)?,
    })
}

pub(super) fn data_source(row: &Row) -> Result<DataSource, RepositoryError> {
    Ok(DataSource {
        id: parse(&row.get::<String>("id")?)?,
        name: row.get("name")?,
        public: row.get("public")?,
        dedupe: parse::<DedupePolicy>(&row.get::<String>("dedupe")?)?,
    })
}

pub(super) fn cos_object(row: &Row) -> Result<CosObject, RepositoryError> {
    Ok(CosObject {
        id: parse(&row.get::<String>("id")?)?,
        bucket: row.get("bucket")?,
        key: row.get("key")?,
        content_hash: row.get("content_hash")?,
        size: non_negative(row.get::<i64>("size")?, "size")?,
        created_at: parse_timestamp(&row.get::<String>("created_at")?)?,
    })
}

pub(super) fn data_node(row: &Row) -> Result<DataNode, RepositoryError> {
    let payload: DataPayload = serde_json::from_str(&row.get::<String>("payload")?)?;
    let version = u32::try_from(row.get::<i64>("version")?)
        .map_err(|_| RepositoryError::InvalidData("data node version out of range".to_string()))?;

    Ok(DataNode {
        id: parse(&row.get::<String>("id")?)?,
        space_object: parse(&row.get::<String>("space_object")?)?,
        provided_by: parse_opt(row.get::<Option<String>>("provided_by")?)?,
        kind: payload.kind(),
        dedup_key: row.get("dedup_key")?,
        ingest_key: row.get::<Option<String>>("ingest_key")?,
        version,
        payload,
        artifact: parse_opt(row.get::<Option<String>>("artifact")?)?,
        created_at: parse_timestamp(&row.get::<String>("created_at")?)?,
    })
}

pub(super) fn user(row: &Row) -> Result<User, RepositoryError> {
    Ok(User {
        id: parse(&row.get::<String>("id")?)?,
        email: row.get("email")?,
        created_at: parse_timestamp(&row.get::<String>("created_at")?)?,
    })
}

pub(super) fn access_event(row: &Row) -> Result<AccessEvent, RepositoryError> {
    Ok(AccessEvent {
        user: parse(&row.get::<String>("user")?)?,
        data_node: parse(&row.get::<String>("data_node")?)?,
        endpoint: row.get("endpoint")?,
        accessed_at: parse_timestamp(&row.get::<String>("at")?)?,
    })
}

pub(super) fn access_count(row: &Row) -> Result<UserAccessCount, RepositoryError> {
    Ok(UserAccessCount {
        user: parse(&row.get::<String>("user")?)?,
        email: row.get("email")?,
        access_count: non_negative(row.get::<i64>("access_count")?, "access count")?,
    })
}

pub(super) fn import_progress(row: &Row) -> Result<ImportProgress, RepositoryError> {
    let committed = non_negative(row.get::<i64>("committed_records")?, "committed records")?;
    Ok(ImportProgress {
        source: row.get("source")?,
        entry: row.get("entry")?,
        marker: row.get("marker")?,
        committed_records: usize::try_from(committed).map_err(|_| {
            RepositoryError::InvalidData("committed records out of range".to_string())
        })?,
        complete: row.get("complete")?,
        updated_at: parse_timestamp(&row.get::<String>("updated_at")?)?,
    })
}
