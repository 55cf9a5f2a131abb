//! Pairing state machine.
//!
//! Holds at most one pending text per channel. When a payload arrives and
//! the peer slot is already filled, both slots are taken and combined into
//! a [`CandidateRecord`]; otherwise the payload waits for its peer.

use crate::channel::{ChannelId, ScanPayload};

/// Combined report of both stations for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// `trim(channel 1) + "|" + trim(channel 2)`
    pub combined_text: String,
}

impl CandidateRecord {
    fn combine(channel1: &str, channel2: &str) -> Self {
        Self {
            combined_text: format!("{}|{}", channel1.trim(), channel2.trim()),
        }
    }
}

/// Observable pairing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    /// Neither slot holds a value.
    Empty,
    /// Exactly one slot holds a value; the other station is awaited.
    WaitingPeer(ChannelId),
}

/// Per-channel pending slots.
#[derive(Debug, Default)]
pub struct Reconciler {
    slots: [Option<String>; 2],
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload, pairing it with the peer's pending text if present.
    ///
    /// A new value for a channel overwrites any unconsumed value already
    /// pending for that channel.
    pub fn offer(&mut self, payload: ScanPayload) -> Option<CandidateRecord> {
        let channel = payload.channel;
        self.slots[channel.index()] = Some(payload.text);

        if self.slots[channel.peer().index()].is_none() {
            return None;
        }

        let first = self.slots[ChannelId::Channel1.index()].take()?;
        let second = self.slots[ChannelId::Channel2.index()].take()?;
        Some(CandidateRecord::combine(&first, &second))
    }

    /// Text currently waiting on `channel`, if any.
    pub fn pending(&self, channel: ChannelId) -> Option<&str> {
        self.slots[channel.index()].as_deref()
    }

    /// Drop both pending slots. Returns how many values were discarded.
    pub fn clear(&mut self) -> usize {
        self.slots.iter_mut().filter_map(Option::take).count()
    }

    pub fn state(&self) -> PairingState {
        match (&self.slots[0], &self.slots[1]) {
            (Some(_), None) => PairingState::WaitingPeer(ChannelId::Channel2),
            (None, Some(_)) => PairingState::WaitingPeer(ChannelId::Channel1),
            _ => PairingState::Empty,
        }
    }
}
