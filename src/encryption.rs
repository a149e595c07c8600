//! Hybrid encryption of packed literal data, and the [`Sealer`] that runs
//! selection, packing and encryption together.

use sequoia_openpgp::policy::StandardPolicy;
use sequoia_openpgp::serialize::stream::{Encryptor2, Message, Recipient};
use sequoia_openpgp::types::SymmetricAlgorithm;
use std::io::Write;
use tracing::debug;

use crate::error::{SealError, SealResult};
use crate::keyring::{KeyRingCollection, RecipientKey};
use crate::literal::{Clock, LiteralPacker, SystemClock};

pub const DEFAULT_SYMMETRIC_ALGORITHM: SymmetricAlgorithm = SymmetricAlgorithm::AES256;

/// Encrypts packed literal data to public keys.
///
/// Every call draws a fresh session key. The output is one PKESK per
/// recipient followed by a single SEIP packet carrying an MDC.
#[derive(Debug, Clone, Copy)]
pub struct HybridEncryptor {
    symmetric_algo: SymmetricAlgorithm,
}

impl Default for HybridEncryptor {
    fn default() -> Self {
        Self::new(DEFAULT_SYMMETRIC_ALGORITHM)
    }
}

impl HybridEncryptor {
    pub fn new(symmetric_algo: SymmetricAlgorithm) -> Self {
        Self { symmetric_algo }
    }

    pub fn symmetric_algo(&self) -> SymmetricAlgorithm {
        self.symmetric_algo
    }

    pub fn encrypt(&self, packed: &[u8], recipient: &RecipientKey<'_>) -> SealResult<Vec<u8>> {
        self.encrypt_to_all(packed, [recipient])
    }

    /// Encrypts once and wraps the session key for each recipient.
    pub fn encrypt_to_all<'a, 'r, R>(&self, packed: &[u8], recipients: R) -> SealResult<Vec<u8>>
    where
        'a: 'r,
        R: IntoIterator<Item = &'r RecipientKey<'a>>,
    {
        let recipients = recipients
            .into_iter()
            .map(|r| Recipient::new(r.keyid(), r.key()))
            .collect::<Vec<_>>();
        if recipients.is_empty() {
            return Err(SealError::Encryption("no recipients".to_string()));
        }
        let count = recipients.len();

        let mut sink = vec![];
        let message = Message::new(&mut sink);
        let mut w = Encryptor2::for_recipients(message, recipients)
            .symmetric_algo(self.symmetric_algo)
            .build()
            .map_err(SealError::encryption)?;
        // already a literal data packet, so it goes in as the SEIP body
        w.write_all(packed).map_err(SealError::encryption)?;
        w.finalize().map_err(SealError::encryption)?;

        debug!(
            recipients = count,
            algorithm = %self.symmetric_algo,
            plaintext = packed.len(),
            ciphertext = sink.len(),
            "encrypted message"
        );
        Ok(sink)
    }
}

/// Key selection, literal packing and encryption in one call.
#[derive(Debug, Clone)]
pub struct Sealer<C = SystemClock> {
    policy: StandardPolicy<'static>,
    packer: LiteralPacker<C>,
    encryptor: HybridEncryptor,
}

impl Default for Sealer<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> Sealer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            policy: StandardPolicy::new(),
            packer: LiteralPacker::new(clock),
            encryptor: HybridEncryptor::default(),
        }
    }

    /// Seals `payload` to the first encryption-capable key in `key_ring`.
    pub fn seal(&self, key_ring: &[u8], payload: &[u8]) -> SealResult<Vec<u8>> {
        let rings = KeyRingCollection::from_bytes(key_ring)?;
        let recipient = self.recipient(&rings)?;
        self.seal_to(&recipient, payload)
    }

    pub fn recipient<'a>(&self, rings: &'a KeyRingCollection) -> SealResult<RecipientKey<'a>> {
        rings.select_encryption_key(&self.policy, self.packer.clock().now())
    }

    pub fn seal_to(&self, recipient: &RecipientKey<'_>, payload: &[u8]) -> SealResult<Vec<u8>> {
        let packed = self.packer.pack(payload)?;
        self.encryptor.encrypt(&packed, recipient)
    }
}

/// Seals `payload` with the system clock, the standard policy and AES-256.
pub fn seal(key_ring: &[u8], payload: &[u8]) -> SealResult<Vec<u8>> {
    Sealer::default().seal(key_ring, payload)
}
