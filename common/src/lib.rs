//! Common types for the renter coordination layer.
//!
//! This crate provides the identifiers shared by the bus and the autopilot:
//! - **Contract IDs**: identify a storage contract with a host (renewals produce new IDs)
//! - **Sector roots**: content hashes of the fixed-size sectors stored under a contract
//! - **Host public keys**: stable identity of a storage host
//! - **Upload IDs**: opaque tokens chosen by workers to identify one upload session
//!
//! All identifiers are fixed-size byte arrays rendered as lowercase hex, both in
//! `Display`/`Debug` output and in their serde representation.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Size of a single sector stored on a host (4 MiB).
pub const SECTOR_SIZE: u64 = 1 << 22;

// ============================================================================
// Identifiers
// ============================================================================

/// Error returned when parsing a hex-encoded identifier fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

macro_rules! fixed_id {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Length of the identifier in bytes.
            pub const LEN: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s).map_err(|e| IdParseError::InvalidHex(e.to_string()))?;
                let actual = bytes.len();
                let arr: [u8; $len] = bytes.try_into().map_err(|_| IdParseError::InvalidLength {
                    expected: $len,
                    actual,
                })?;
                Ok(Self(arr))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_id!(
    /// Identifier of a file contract. A renewal produces a contract with a new ID.
    ContractId,
    32
);

fixed_id!(
    /// Merkle root of a sector's contents.
    Hash256,
    32
);

fixed_id!(
    /// Ed25519 public key identifying a storage host.
    PublicKey,
    32
);

fixed_id!(
    /// Opaque identifier of an upload session, chosen by the worker performing the upload.
    UploadId,
    8
);

impl UploadId {
    /// Generate a random upload ID.
    pub fn random() -> Self {
        let mut bytes = [0u8; 8];
        rand::rng().fill(&mut bytes);
        Self(bytes)
    }
}

// ============================================================================
// Hosts
// ============================================================================

/// A host eligible for scanning: its identity and the address it announced.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HostAddress {
    /// Public key of the host
    pub public_key: PublicKey,
    /// Network address the host announced, e.g. "host.example.com:9982"
    pub net_address: String,
}
