//! Session identifiers.
//!
//! A [`SessionId`] has exactly the shape of an OpenTelemetry trace id: 128 random
//! bits rendered as 32 lowercase hex characters. Reusing that format lets session
//! correlation ride on the trace-context representations backends already index.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of the hex rendering of a [`SessionId`].
pub const SESSION_ID_HEX_LEN: usize = 32;

/// A 128-bit session identifier.
///
/// Stored as two `u64` halves with `#[repr(C)]` so the type has no padding and
/// can live inside a [`crossbeam_utils::atomic::AtomicCell`] whose
/// compare-and-set compares raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(C)]
pub struct SessionId {
    high: u64,
    low: u64,
}

impl SessionId {
    /// The all-zero id. Never handed out by a session manager.
    pub const INVALID: SessionId = SessionId { high: 0, low: 0 };

    /// Builds an id from its high and low 64-bit halves.
    #[inline]
    pub const fn from_halves(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    #[inline]
    pub const fn from_u128(value: u128) -> Self {
        Self {
            high: (value >> 64) as u64,
            low: value as u64,
        }
    }

    #[inline]
    pub const fn as_u128(&self) -> u128 {
        ((self.high as u128) << 64) | self.low as u128
    }

    /// Returns `true` unless this is [`SessionId::INVALID`].
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.high != 0 || self.low != 0
    }

    /// Generates a fresh random id from the thread-local CSPRNG.
    ///
    /// Draws two independent 64-bit values and retries on the all-zero id.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let id = Self::from_halves(rng.gen(), rng.gen());
            if id.is_valid() {
                return id;
            }
        }
    }

    /// Generates a fresh random id guaranteed to differ from `previous`.
    pub fn random_excluding(previous: SessionId) -> Self {
        loop {
            let id = Self::random();
            if id != previous {
                return id;
            }
        }
    }

    /// Renders the id as 32 lowercase hex characters.
    pub fn as_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.high, self.low)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({self})")
    }
}

/// Error returned when parsing a [`SessionId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSessionIdError {
    #[error("session id must be {SESSION_ID_HEX_LEN} hex characters, got {0}")]
    InvalidLength(usize),
    #[error("session id contains non-hex character {0:?}")]
    InvalidCharacter(char),
    #[error("session id must not be all zeros")]
    AllZeros,
}

impl FromStr for SessionId {
    type Err = ParseSessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != SESSION_ID_HEX_LEN {
            return Err(ParseSessionIdError::InvalidLength(s.len()));
        }
        if let Some(bad) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ParseSessionIdError::InvalidCharacter(bad));
        }
        let value = u128::from_str_radix(s, 16)
            .map_err(|_| ParseSessionIdError::InvalidLength(s.len()))?;
        let id = Self::from_u128(value);
        if !id.is_valid() {
            return Err(ParseSessionIdError::AllZeros);
        }
        Ok(id)
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
