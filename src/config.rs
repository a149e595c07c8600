//! Pipeline settings: where the key ring lives and where sealed objects go.

use anyhow::anyhow;

use crate::store::ObjectLocation;

/// Where the public key lives and where sealed objects go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    public_key: ObjectLocation,
    destination_bucket: Option<String>,
}

impl PipelineConfig {
    pub fn new(public_key: ObjectLocation) -> PipelineConfig {
        Self {
            public_key,
            destination_bucket: None,
        }
    }

    /// Builds a config from the `public_key_bucket`, `public_key_file` and
    /// `destination_bucket` settings.
    pub fn from_parts(
        public_key_bucket: &str,
        public_key_file: &str,
        destination_bucket: Option<String>,
    ) -> anyhow::Result<Self> {
        if public_key_bucket.is_empty() || public_key_file.is_empty() {
            return Err(anyhow!("Public key bucket and file must both be set"));
        }
        let config = Self::new(ObjectLocation::new(public_key_bucket, public_key_file));
        Ok(match destination_bucket {
            // an empty value means "not set"
            Some(bucket) if !bucket.is_empty() => config.with_destination_bucket(bucket),
            _ => config,
        })
    }

    #[must_use]
    pub fn with_destination_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.destination_bucket = Some(bucket.into());
        self
    }
}

impl PipelineConfig {
    pub fn public_key(&self) -> &ObjectLocation {
        &self.public_key
    }

    pub fn destination_bucket(&self) -> Option<&str> {
        self.destination_bucket.as_deref()
    }
}
