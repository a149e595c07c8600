//! Key-ring parsing and recipient selection.
//!
//! A key ring is read as a flat packet stream. Every primary key packet
//! starts a new ring, and the order in which key packets appear is kept
//! next to the certificate, because the certificate itself canonicalizes
//! (and may reorder) its subkeys.

use sequoia_openpgp::packet::{key, Key, Packet};
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::policy::Policy;
use sequoia_openpgp::types::{KeyFlags, PublicKeyAlgorithm};
use sequoia_openpgp::{Cert, Fingerprint, KeyID, PacketPile};
use std::time::SystemTime;
use tracing::debug;

use crate::error::{SealError, SealResult};

/// A public key picked out of a [`KeyRingCollection`].
///
/// The key material is borrowed from the collection it was selected from.
#[derive(Debug, Clone)]
pub struct RecipientKey<'a> {
    key: &'a Key<key::PublicParts, key::UnspecifiedRole>,
    flags: KeyFlags,
    ring: usize,
}

impl<'a> RecipientKey<'a> {
    pub fn key(&self) -> &'a Key<key::PublicParts, key::UnspecifiedRole> {
        self.key
    }

    pub fn keyid(&self) -> KeyID {
        self.key.keyid()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.key.fingerprint()
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.key.pk_algo()
    }

    pub fn flags(&self) -> &KeyFlags {
        &self.flags
    }

    /// Whether the key flags allow encrypting to this key.
    pub fn can_encrypt(&self) -> bool {
        can_encrypt(&self.flags)
    }

    /// Position of the ring this key came from.
    pub fn ring_index(&self) -> usize {
        self.ring
    }
}

fn can_encrypt(flags: &KeyFlags) -> bool {
    flags.for_transport_encryption() || flags.for_storage_encryption()
}

/// One certificate and the encoded order of its key packets.
#[derive(Debug, Clone)]
pub struct KeyRing {
    cert: Cert,
    order: Vec<Fingerprint>,
}

impl KeyRing {
    fn from_packets(packets: Vec<Packet>) -> SealResult<Self> {
        let order = packets
            .iter()
            .filter_map(|packet| match packet {
                Packet::PublicKey(k) => Some(k.fingerprint()),
                Packet::PublicSubkey(k) => Some(k.fingerprint()),
                Packet::SecretKey(k) => Some(k.fingerprint()),
                Packet::SecretSubkey(k) => Some(k.fingerprint()),
                _ => None,
            })
            .collect();
        let cert = Cert::from_packets(packets.into_iter()).map_err(SealError::parse)?;
        Ok(Self { cert, order })
    }

    pub fn cert(&self) -> &Cert {
        &self.cert
    }

    /// Fingerprints of the ring's keys, in the order they were encoded.
    pub fn key_order(&self) -> &[Fingerprint] {
        &self.order
    }

    /// First key, in encoded order, that is valid under `policy` at `time`
    /// and flagged for transport or storage encryption.
    fn first_encryption_key<'a>(
        &'a self,
        policy: &dyn Policy,
        time: SystemTime,
        ring: usize,
    ) -> Option<RecipientKey<'a>> {
        let valid = self
            .cert
            .keys()
            .with_policy(policy, time)
            .supported()
            .alive()
            .revoked(false)
            .filter_map(|ka| Some((ka.key().fingerprint(), ka.key_flags()?)))
            .filter(|(_, flags)| can_encrypt(flags))
            .collect::<Vec<_>>();

        self.order.iter().find_map(|fingerprint| {
            let (_, flags) = valid.iter().find(|(fpr, _)| fpr == fingerprint)?;
            // the policy-bound amalgamation can't outlive this call, so the
            // key itself is borrowed straight from the cert
            let key = self
                .cert
                .keys()
                .find(|ka| ka.key().fingerprint() == *fingerprint)?
                .key();
            Some(RecipientKey {
                key,
                flags: flags.clone(),
                ring,
            })
        })
    }
}

/// Ordered, read-only collection of key rings.
#[derive(Debug, Clone)]
pub struct KeyRingCollection {
    rings: Vec<KeyRing>,
}

impl KeyRingCollection {
    /// Parses armored or binary key-ring bytes.
    pub fn from_bytes(bytes: &[u8]) -> SealResult<Self> {
        let pile = PacketPile::from_bytes(bytes).map_err(SealError::parse)?;

        let mut rings = vec![];
        let mut current: Vec<Packet> = vec![];
        for packet in pile.into_children() {
            let primary = matches!(packet, Packet::PublicKey(_) | Packet::SecretKey(_));
            if primary && !current.is_empty() {
                rings.push(KeyRing::from_packets(std::mem::take(&mut current))?);
            }
            if current.is_empty() && !primary {
                if let Packet::Marker(_) = packet {
                    continue;
                }
                return Err(SealError::Parse(format!(
                    "expected a primary key packet, found {}",
                    packet.tag()
                )));
            }
            current.push(packet);
        }
        if !current.is_empty() {
            rings.push(KeyRing::from_packets(current)?);
        }

        if rings.is_empty() {
            return Err(SealError::Parse("no key rings in input".to_string()));
        }
        debug!(rings = rings.len(), "parsed key ring collection");
        Ok(Self { rings })
    }

    pub fn rings(&self) -> &[KeyRing] {
        &self.rings
    }

    /// Returns the first encryption-capable key of the first ring that has
    /// one. Validity (expiry, revocation, binding signatures) is judged at
    /// `time`, so the same bytes and time always give the same key.
    pub fn select_encryption_key(
        &self,
        policy: &dyn Policy,
        time: SystemTime,
    ) -> SealResult<RecipientKey<'_>> {
        let selected = self
            .rings
            .iter()
            .enumerate()
            .find_map(|(index, ring)| ring.first_encryption_key(policy, time, index))
            .ok_or(SealError::KeyNotFound)?;
        debug!(
            keyid = %selected.keyid(),
            algorithm = %selected.algorithm(),
            ring = selected.ring_index(),
            "selected encryption key"
        );
        Ok(selected)
    }
}
