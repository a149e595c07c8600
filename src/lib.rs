//! Seal objects into OpenPGP messages.
//!
//! The engine takes a key ring and a payload, both as bytes, and returns a
//! binary OpenPGP message that only the holder of the matching private key
//! can read:
//!
//! ```text
//! key-ring bytes ──► KeyRingCollection ──► RecipientKey ─┐
//!                                                         ├─► HybridEncryptor ──► PKESK ‖ SEIP+MDC
//! payload bytes ───► LiteralPacker ──────► literal data ─┘
//! ```
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! let key_ring = std::fs::read("recipient.asc")?;
//! let sealed = object_seal::seal(&key_ring, b"object bytes")?;
//! # Ok(())
//! # }
//! ```
//!
//! The [`pipeline`] module wires the engine to an [`store::ObjectStore`]
//! the way the ingestion service uses it.

pub mod config;
pub mod encryption;
pub mod error;
pub mod event;
pub mod keyring;
pub mod literal;
pub mod pipeline;
pub mod store;

#[cfg(test)]
mod testing;

pub use encryption::{seal, HybridEncryptor, Sealer};
pub use error::{SealError, SealResult};
pub use keyring::{KeyRing, KeyRingCollection, RecipientKey};
pub use literal::{Clock, FixedClock, LiteralPacker, SystemClock};
