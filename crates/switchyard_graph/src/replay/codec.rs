//! Binary encoding of replay events.
//!
//! Little-endian layout:
//!
//! ```text
//! u32 count
//! per event:
//!   u8  kind
//!   i32 source index
//!   u8  target flag   [i32 target index]
//!   i64 timestamp (Unix ms)
//!   u8  message flag  [u32 length, UTF-8 bytes]
//! ```
//!
//! Node names are not encoded; decoded IDs carry indices only.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::node::NodeId;
use crate::replay::event::{EventKind, ReplayEvent};

/// Errors raised while encoding or decoding replay data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The buffer ended in the middle of a field.
    #[error("replay data truncated: needed {needed} more bytes at offset {offset}")]
    Truncated {
        /// Byte offset of the incomplete field.
        offset: usize,
        /// Bytes missing.
        needed: usize,
    },
    /// An event carried an unknown kind tag.
    #[error("unknown replay event kind {0}")]
    UnknownEventKind(u8),
    /// A message was not valid UTF-8.
    #[error("replay message is not valid UTF-8")]
    InvalidUtf8,
    /// A length field does not fit the platform's address space.
    #[error("replay length {0} is too large")]
    LengthOverflow(u32),
    /// Bytes remained after the last event.
    #[error("{0} trailing bytes after the last replay event")]
    TrailingBytes(usize),
    /// An event count or message length does not fit in a `u32`.
    #[error("length {0} does not fit the replay format")]
    Oversized(usize),
}

/// Encodes `events` into a flat byte buffer.
///
/// # Errors
///
/// Returns [`CodecError::Oversized`] if the count or a message length
/// does not fit in a `u32`.
pub fn encode(events: &[ReplayEvent]) -> Result<Bytes, CodecError> {
    let count = u32::try_from(events.len()).map_err(|_| CodecError::Oversized(events.len()))?;
    let mut buf = BytesMut::with_capacity(4 + events.len() * 24);
    buf.put_u32_le(count);
    for event in events {
        buf.put_u8(event.kind as u8);
        buf.put_i32_le(event.source.index());
        match &event.target {
            Some(target) => {
                buf.put_u8(1);
                buf.put_i32_le(target.index());
            }
            None => buf.put_u8(0),
        }
        buf.put_i64_le(event.timestamp);
        match &event.message {
            Some(message) => {
                let len = u32::try_from(message.len())
                    .map_err(|_| CodecError::Oversized(message.len()))?;
                buf.put_u8(1);
                buf.put_u32_le(len);
                buf.put_slice(message.as_bytes());
            }
            None => buf.put_u8(0),
        }
    }
    Ok(buf.freeze())
}

/// Decodes a buffer produced by [`encode`].
///
/// # Errors
///
/// Returns a [`CodecError`] for truncated, malformed or oversized input.
pub fn decode(data: &[u8]) -> Result<Vec<ReplayEvent>, CodecError> {
    let mut reader = Reader { buf: data, total: data.len() };
    let count = reader.u32()?;
    let count = usize::try_from(count).map_err(|_| CodecError::LengthOverflow(count))?;
    // Each event takes at least 15 bytes; cap the preallocation by what the input can hold.
    let mut events = Vec::with_capacity(count.min(reader.buf.remaining() / 15));
    for _ in 0..count {
        let tag = reader.u8()?;
        let kind = EventKind::try_from(tag).map_err(CodecError::UnknownEventKind)?;
        let source = NodeId::new(reader.i32()?);
        let target = match reader.u8()? {
            0 => None,
            _ => Some(NodeId::new(reader.i32()?)),
        };
        let timestamp = reader.i64()?;
        let message = match reader.u8()? {
            0 => None,
            _ => Some(reader.string()?),
        };
        events.push(ReplayEvent {
            kind,
            source,
            target,
            message,
            timestamp,
        });
    }
    match reader.buf.remaining() {
        0 => Ok(events),
        trailing => Err(CodecError::TrailingBytes(trailing)),
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl Reader<'_> {
    fn need(&self, len: usize) -> Result<(), CodecError> {
        let remaining = self.buf.remaining();
        if remaining < len {
            return Err(CodecError::Truncated {
                offset: self.total - remaining,
                needed: len - remaining,
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    fn i32(&mut self) -> Result<i32, CodecError> {
        self.need(4)?;
        Ok(self.buf.get_i32_le())
    }

    fn i64(&mut self) -> Result<i64, CodecError> {
        self.need(8)?;
        Ok(self.buf.get_i64_le())
    }

    fn string(&mut self) -> Result<String, CodecError> {
        let len = self.u32()?;
        let len = usize::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
        self.need(len)?;
        let (raw, rest) = self.buf.split_at(len);
        self.buf = rest;
        String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ReplayEvent> {
        vec![
            ReplayEvent::new(EventKind::Transition, NodeId::new(0))
                .with_target(NodeId::new(1))
                .at(1_700_000_000_000),
            ReplayEvent::new(EventKind::Log, NodeId::new(1))
                .with_message("héllo")
                .at(-3),
            ReplayEvent::new(EventKind::MachineCompleted, NodeId::NONE)
                .with_message("")
                .at(0),
        ]
    }

    #[test]
    fn round_trip_preserves_fields() {
        let events = sample();
        let decoded = decode(&encode(&events).unwrap()).unwrap();
        assert_eq!(decoded, events);
        assert_eq!(decoded[2].message.as_deref(), Some(""));
        assert_eq!(decoded[2].source.index(), -1);
    }

    #[test]
    fn empty_sequence() {
        let bytes = encode(&[]).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0, 0]);
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn truncated_input() {
        let bytes = encode(&sample()).unwrap();
        let err = decode(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { needed: 2, .. }));
        assert!(matches!(decode(&[1, 0]), Err(CodecError::Truncated { offset: 0, needed: 2 })));
    }

    #[test]
    fn unknown_kind() {
        let mut bytes = encode(&sample()).unwrap().to_vec();
        bytes[4] = 42;
        assert_eq!(decode(&bytes), Err(CodecError::UnknownEventKind(42)));
    }

    #[test]
    fn invalid_utf8() {
        let event = ReplayEvent::new(EventKind::Log, NodeId::new(0)).with_message("ab").at(0);
        let mut bytes = encode(&[event]).unwrap().to_vec();
        let last = bytes.len() - 1;
        bytes[last] = 0xFF;
        assert_eq!(decode(&bytes), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn trailing_bytes() {
        let mut bytes = encode(&sample()).unwrap().to_vec();
        bytes.push(0);
        assert_eq!(decode(&bytes), Err(CodecError::TrailingBytes(1)));
    }
}
