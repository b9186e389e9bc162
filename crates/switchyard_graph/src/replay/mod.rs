//! Event recording and deterministic replay.
//!
//! A [`ReplayRecorder`] is an observer that keeps the most recent events of
//! one or more runs. Its snapshot can be encoded to bytes, decoded later and
//! fed, event by event and in the original order, to any handler through a
//! [`Replay`].
//!
//! # Example
//!
//! ```ignore
//! let recorder = Arc::new(ReplayRecorder::default());
//! let machine = StateMachine::new(graph).with_observer(recorder.clone());
//! machine.run(&CancellationToken::new()).await?;
//!
//! let bytes = Replay::from_recorder(&recorder).encode()?;
//! Replay::decode(&bytes)?.replay_all(|event| println!("{event}"));
//! ```

mod codec;
mod event;
mod recorder;
mod ring;

pub use codec::{CodecError, decode, encode};
pub use event::{EventKind, ReplayEvent};
pub use recorder::{DEFAULT_CAPACITY, ReplayRecorder};
pub use ring::RingBuffer;

use bytes::Bytes;

/// An ordered, immutable sequence of replay events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replay {
    events: Vec<ReplayEvent>,
}

impl Replay {
    /// Wraps an event sequence.
    #[must_use]
    pub fn new(events: Vec<ReplayEvent>) -> Self {
        Self { events }
    }

    /// Snapshots the live events of `recorder`.
    #[must_use]
    pub fn from_recorder(recorder: &ReplayRecorder) -> Self {
        Self::new(recorder.snapshot())
    }

    /// Decodes a sequence produced by [`Replay::encode`].
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if `data` is malformed.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        decode(data).map(Self::new)
    }

    /// Encodes the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Oversized`] if a length does not fit the format.
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        encode(&self.events)
    }

    /// The events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[ReplayEvent] {
        &self.events
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if there are no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Calls `handler` once per event, in order.
    pub fn replay_all<F>(&self, mut handler: F)
    where
        F: FnMut(&ReplayEvent),
    {
        for event in &self.events {
            handler(event);
        }
    }
}

impl From<Vec<ReplayEvent>> for Replay {
    fn from(events: Vec<ReplayEvent>) -> Self {
        Self::new(events)
    }
}
