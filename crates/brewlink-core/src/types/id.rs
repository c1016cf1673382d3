//! Newtype wrappers for domain identifiers.
//!
//! Using distinct types prevents accidentally passing an opaque
//! `ChannelKey` where a `ReceiptId` is expected. Both keys are
//! server-issued opaque strings; `CafeId` is a numeric identifier of a
//! physical cafe.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric identifier of a physical cafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CafeId(pub i64);

impl CafeId {
    /// Return the inner numeric value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CafeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CafeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Macro to define a newtype wrapper around an opaque server-issued string.
macro_rules! define_opaque_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a key from an existing string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Return the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_opaque_key! {
    /// Opaque key identifying the presence-channel topic a user joined
    /// for one cafe session.
    ChannelKey
}

define_opaque_key! {
    /// Identifier of a submitted receipt.
    ReceiptId
}
