//! Identifier types for the checkout pipeline.
//!
//! This module provides strongly-typed identifiers for orders and catalog
//! variants, plus the human-facing readable order ID.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An internal order identifier (UUID v4).
///
/// Distinct from [`ReadableOrderId`], which is the human-facing reference
/// printed on confirmation emails and packing slips.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(uuid::Uuid);

impl OrderId {
    /// Create an `OrderId` from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a new random `OrderId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Return the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Return the bytes of the UUID.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl FromStr for OrderId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
        Ok(Self(uuid))
    }
}

impl fmt::Debug for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderId({})", self.0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for OrderId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0.to_string()
    }
}

impl AsRef<[u8]> for OrderId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// A catalog variant identifier from the fulfillment provider.
///
/// Variant IDs are numeric on the provider side; the newtype keeps them from
/// being confused with quantities or prices in payload construction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(u64);

impl VariantId {
    /// Create a `VariantId` from a raw provider ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Return the raw numeric ID.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl FromStr for VariantId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self).map_err(|_| IdError::InvalidVariant)
    }
}

impl fmt::Debug for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariantId({})", self.0)
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Prefix for readable order IDs.
const READABLE_PREFIX: &str = "RUK";

/// Alphabet for the random suffix of a readable order ID.
const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of the random suffix.
const SUFFIX_LEN: usize = 4;

/// A human-facing order reference, e.g. `RUK-483920XK7M`.
///
/// Format: `RUK-` followed by the last six digits of the creation timestamp
/// (milliseconds) and four random uppercase alphanumerics. Not guaranteed
/// globally unique on its own; uniqueness is carried by [`OrderId`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadableOrderId(String);

impl ReadableOrderId {
    /// Generate a readable order ID from the current time.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(chrono::Utc::now())
    }

    /// Generate a readable order ID for a specific timestamp.
    #[must_use]
    pub fn generate_at(at: chrono::DateTime<chrono::Utc>) -> Self {
        use rand::Rng;

        let millis = at.timestamp_millis().unsigned_abs().to_string();
        let tail_start = millis.len().saturating_sub(6);
        let tail = &millis[tail_start..];

        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..SUFFIX_ALPHABET.len());
                SUFFIX_ALPHABET[idx] as char
            })
            .collect();

        Self(format!("{READABLE_PREFIX}-{tail}{suffix}"))
    }

    /// Return the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ReadableOrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for ReadableOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReadableOrderId({})", self.0)
    }
}

impl fmt::Display for ReadableOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not a valid numeric variant ID.
    #[error("invalid variant ID")]
    InvalidVariant,
}
