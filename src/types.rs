//! Core types for the notification fabric.

use std::fmt;
use std::sync::Arc;

/// Position on a publisher's visibility clock.
///
/// Every broadcast takes the next tick; every subscriber records the tick
/// current at the moment it was added. A subscriber is eligible for a
/// notification iff its tick-at-add is strictly less than the notification's
/// tick.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(pub u64);

impl Tick {
    pub fn next(self) -> Self {
        Tick(self.0 + 1)
    }
}

impl fmt::Debug for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tick({})", self.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maximum length of an [`UpdateKey`] in bytes.
pub const MAX_UPDATE_KEY_BYTES: usize = 16;

/// Stable, equality-comparable identity of a notification kind.
///
/// Coalesced publishes ([`Listeners::update`](crate::Listeners::update)) are
/// keyed by this value: two updates with equal keys collapse into the most
/// recent one per call queue. Keys are short byte strings; anything stable
/// works, such as an enum discriminant, an interned name, or a hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdateKey {
    bytes: [u8; MAX_UPDATE_KEY_BYTES],
    len: u8,
}

impl UpdateKey {
    /// Build a key from raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if `raw` is longer than [`MAX_UPDATE_KEY_BYTES`].
    pub fn from_bytes(raw: &[u8]) -> Self {
        assert!(
            raw.len() <= MAX_UPDATE_KEY_BYTES,
            "update key exceeds {} bytes",
            MAX_UPDATE_KEY_BYTES
        );
        let mut bytes = [0u8; MAX_UPDATE_KEY_BYTES];
        bytes[..raw.len()].copy_from_slice(raw);
        Self {
            bytes,
            len: raw.len() as u8,
        }
    }

    /// Build a key from a short name.
    ///
    /// # Panics
    ///
    /// Panics if the name is longer than [`MAX_UPDATE_KEY_BYTES`] bytes.
    pub fn named(name: &str) -> Self {
        Self::from_bytes(name.as_bytes())
    }

    /// The key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl From<u64> for UpdateKey {
    fn from(raw: u64) -> Self {
        Self::from_bytes(&raw.to_le_bytes())
    }
}

impl fmt::Debug for UpdateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_graphic()) => {
                write!(f, "UpdateKey({:?})", s)
            }
            _ => write!(f, "UpdateKey({:02x?})", self.as_bytes()),
        }
    }
}

/// Registration key of a subscriber: the pointer identity of its `Arc`,
/// metadata erased.
///
/// Valid for as long as the subscriber is alive, which the subscriber
/// contract guarantees for the whole add..remove interval.
pub(crate) fn listener_key<L: ?Sized>(listener: &Arc<L>) -> usize {
    Arc::as_ptr(listener).cast::<()>() as usize
}
