//! The ingestion handler: fetch the key ring and the object, seal the
//! object, and store the result when a destination is configured.

use anyhow::Context;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::encryption::Sealer;
use crate::event::IngestEvent;
use crate::keyring::KeyRingCollection;
use crate::literal::{Clock, SystemClock};
use crate::store::{ObjectLocation, ObjectStore, StoredObject};

pub const SEALED_CONTENT_TYPE: &str = "application/pgp-encrypted";

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Content type of the source object, as reported by the store.
    pub content_type: Option<String>,
    pub ciphertext: Vec<u8>,
    /// Set when the ciphertext was written back to the store.
    pub destination: Option<ObjectLocation>,
}

pub struct Pipeline<S, C = SystemClock> {
    store: S,
    config: PipelineConfig,
    sealer: Sealer<C>,
}

impl<S: ObjectStore> Pipeline<S> {
    pub fn new(store: S, config: PipelineConfig) -> Self {
        Self {
            store,
            config,
            sealer: Sealer::default(),
        }
    }
}

impl<S: ObjectStore, C: Clock> Pipeline<S, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Pipeline<S, C2> {
        Pipeline {
            store: self.store,
            config: self.config,
            sealer: Sealer::new(clock),
        }
    }

    pub fn handle(&self, event: &IngestEvent) -> anyhow::Result<IngestOutcome> {
        let source = &event.object;
        info!(%source, "received object");

        let key_location = self.config.public_key();
        let key_ring = self
            .store
            .get(key_location)
            .with_context(|| format!("Fetching public key {key_location}"))?;
        let rings = KeyRingCollection::from_bytes(&key_ring.bytes)
            .with_context(|| format!("Reading key ring {key_location}"))?;
        let recipient = self
            .sealer
            .recipient(&rings)
            .with_context(|| format!("Selecting a recipient from {key_location}"))?;

        let object = self
            .store
            .get(source)
            .with_context(|| format!("Fetching object {source}"))?;
        info!(
            content_type = object.content_type.as_deref().unwrap_or("unknown"),
            size = object.bytes.len(),
            "fetched object"
        );

        let ciphertext = self
            .sealer
            .seal_to(&recipient, &object.bytes)
            .with_context(|| format!("Sealing {source} for {}", recipient.keyid()))?;
        info!(%source, sealed = ciphertext.len(), keyid = %recipient.keyid(), "sealed object");

        let destination = match self.config.destination_bucket() {
            Some(bucket) => {
                let destination = ObjectLocation::new(bucket, source.key());
                self.store
                    .put(
                        &destination,
                        StoredObject::new(ciphertext.clone(), Some(SEALED_CONTENT_TYPE)),
                    )
                    .with_context(|| format!("Storing sealed object at {destination}"))?;
                info!(%destination, "stored sealed object");
                Some(destination)
            }
            None => {
                warn!(%source, "no destination bucket configured, sealed object not persisted");
                None
            }
        };

        Ok(IngestOutcome {
            content_type: object.content_type,
            ciphertext,
            destination,
        })
    }
}
