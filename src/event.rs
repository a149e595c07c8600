//! Ingest events.
//!
//! Storage notifications arrive as JSON with a list of records; only the
//! first record is acted on.

use anyhow::anyhow;
use serde::Deserialize;

use crate::store::ObjectLocation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestEvent {
    pub object: ObjectLocation,
}

impl From<ObjectLocation> for IngestEvent {
    fn from(object: ObjectLocation) -> Self {
        Self { object }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Notification {
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct Record {
    s3: Entity,
}

#[derive(Deserialize)]
struct Entity {
    bucket: Bucket,
    object: Object,
}

#[derive(Deserialize)]
struct Bucket {
    name: String,
}

#[derive(Deserialize)]
struct Object {
    key: String,
}

impl IngestEvent {
    pub fn from_notification_json(json: &str) -> anyhow::Result<Self> {
        let notification: Notification = serde_json::from_str(json)?;
        let record = notification
            .records
            .into_iter()
            .next()
            .ok_or(anyhow!("Notification has no records"))?;
        Ok(ObjectLocation::new(record.s3.bucket.name, record.s3.object.key).into())
    }
}
