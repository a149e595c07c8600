//! Literal data packing.
//!
//! The payload is wrapped in a single binary literal data packet with a
//! definite length header. Time is read through [`Clock`] so callers can
//! pin it.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sequoia_openpgp::packet::{Literal, Packet};
use sequoia_openpgp::serialize::{Serialize, SerializeInto};
use sequoia_openpgp::types::DataFormat;
use tracing::debug;

use crate::error::{SealError, SealResult};

/// Filename hint marking the payload as stream data rather than a file.
pub const STREAM_FILENAME: &str = "_CONSOLE";

/// Source of the literal packet timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(SystemTime);

impl FixedClock {
    pub fn new(time: SystemTime) -> Self {
        Self(time)
    }

    pub fn at_unix(secs: u64) -> Self {
        Self(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Builds binary literal data packets.
#[derive(Debug, Clone)]
pub struct LiteralPacker<C = SystemClock> {
    clock: C,
}

impl Default for LiteralPacker<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> LiteralPacker<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Serializes `payload` as a literal data packet stamped with the
    /// clock's current time.
    pub fn pack(&self, payload: &[u8]) -> SealResult<Vec<u8>> {
        let mut body = vec![];
        body.try_reserve_exact(payload.len())
            .map_err(SealError::write)?;
        body.extend_from_slice(payload);

        let mut literal = Literal::new(DataFormat::Binary);
        literal
            .set_filename(STREAM_FILENAME)
            .map_err(SealError::write)?;
        literal
            .set_date(self.clock.now())
            .map_err(SealError::write)?;
        literal.set_body(body);

        let packet = Packet::from(literal);
        let mut sink = vec![];
        sink.try_reserve_exact(packet.serialized_len())
            .map_err(SealError::write)?;
        packet.serialize(&mut sink).map_err(SealError::write)?;

        debug!(payload = payload.len(), packed = sink.len(), "packed literal data");
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sequoia_openpgp::parse::Parse;
    use sequoia_openpgp::PacketPile;

    const NOW: u64 = 1_700_000_000;

    fn unpack(packed: &[u8]) -> Literal {
        let pile = PacketPile::from_bytes(packed).unwrap();
        assert_eq!(pile.children().count(), 1);
        match pile.into_children().next().unwrap() {
            Packet::Literal(literal) => literal,
            other => panic!("expected literal data, got {}", other.tag()),
        }
    }

    #[test]
    fn test_pack_fields() {
        let packer = LiteralPacker::new(FixedClock::at_unix(NOW));
        let literal = unpack(&packer.pack(b"hello world").unwrap());

        assert_eq!(literal.format(), DataFormat::Binary);
        assert_eq!(literal.filename(), Some(STREAM_FILENAME.as_bytes()));
        assert_eq!(literal.date(), Some(UNIX_EPOCH + Duration::from_secs(NOW)));
        assert_eq!(literal.body(), b"hello world");
    }

    #[test]
    fn test_pack_empty_payload() {
        let packer = LiteralPacker::new(FixedClock::at_unix(NOW));
        let literal = unpack(&packer.pack(b"").unwrap());
        assert!(literal.body().is_empty());
    }

    #[test]
    fn test_definite_length_header() {
        let packer = LiteralPacker::new(FixedClock::at_unix(NOW));
        let packed = packer.pack(b"hello").unwrap();

        // new format CTB, tag 11
        assert_eq!(packed[0], 0xCB);
        // one-octet length: format, name length, name, date, body
        let body_len = 1 + 1 + STREAM_FILENAME.len() + 4 + 5;
        assert_eq!(packed[1] as usize, body_len);
        assert_eq!(packed.len(), 2 + body_len);
        assert!(packed.ends_with(b"hello"));
    }

    #[test]
    fn test_same_clock_same_bytes() {
        let packer = LiteralPacker::new(FixedClock::at_unix(NOW));
        assert_eq!(packer.pack(b"data").unwrap(), packer.pack(b"data").unwrap());
    }

    #[test]
    fn test_timestamp_follows_clock() {
        let early = LiteralPacker::new(FixedClock::at_unix(NOW)).pack(b"data").unwrap();
        let late = LiteralPacker::new(FixedClock::at_unix(NOW + 1)).pack(b"data").unwrap();
        assert_ne!(early, late);
        assert_eq!(
            unpack(&late).date(),
            Some(UNIX_EPOCH + Duration::from_secs(NOW + 1))
        );
    }

    #[test]
    fn test_subsecond_time_is_truncated() {
        let time = UNIX_EPOCH + Duration::from_millis(NOW * 1000 + 750);
        let literal = unpack(&LiteralPacker::new(FixedClock::new(time)).pack(b"x").unwrap());
        assert_eq!(literal.date(), Some(UNIX_EPOCH + Duration::from_secs(NOW)));
    }

    #[test]
    fn test_unrepresentable_time_is_write_error() {
        let before_epoch = UNIX_EPOCH - Duration::from_secs(1);
        let err = LiteralPacker::new(FixedClock::new(before_epoch))
            .pack(b"data")
            .unwrap_err();
        assert!(matches!(err, SealError::Write(_)));
    }

    #[test]
    fn test_system_clock_is_current() {
        let before = SystemTime::now() - Duration::from_secs(1);
        let literal = unpack(&LiteralPacker::default().pack(b"data").unwrap());
        assert!(literal.date().unwrap() >= before);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_body_survives_packing(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let packer = LiteralPacker::new(FixedClock::at_unix(NOW));
            let literal = unpack(&packer.pack(&payload).unwrap());
            prop_assert_eq!(literal.body(), payload.as_slice());
        }
    }
}
