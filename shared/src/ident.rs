//! Validated identifiers for devices and sequence tokens
//!
//! Both are used as path segments by the file-backed queue, so every value
//! must pass an allow-list before it reaches storage.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::protocol::POINTER_FILE;

/// Longest accepted identifier
pub const MAX_IDENT_LEN: usize = 128;

/// Which kind of identifier failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    Device,
    Sequence,
}

impl fmt::Display for IdentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentKind::Device => write!(f, "device"),
            IdentKind::Sequence => write!(f, "sequence"),
        }
    }
}

/// Rejected identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} identifier: {value:?}")]
pub struct IdentError {
    pub kind: IdentKind,
    pub value: String,
}

fn check(kind: IdentKind, value: &str) -> Result<(), IdentError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_IDENT_LEN
        && !value.starts_with('.')
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));

    if valid {
        Ok(())
    } else {
        Err(IdentError {
            kind,
            value: value.to_string(),
        })
    }
}

macro_rules! ident_type {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $extra:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a raw identifier
            pub fn new(value: impl Into<String>) -> Result<Self, IdentError> {
                let value = value.into();
                check($kind, &value)?;
                let extra: fn(&str) -> bool = $extra;
                if !extra(&value) {
                    return Err(IdentError { kind: $kind, value });
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdentError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

ident_type!(
    /// Name of a polling device, safe to use as a directory name
    DeviceId,
    IdentKind::Device,
    |_| true
);

ident_type!(
    /// Opaque command batch version, safe to use as a file name.
    ///
    /// Tokens are compared for equality only; no ordering is implied.
    SeqToken,
    IdentKind::Sequence,
    |v| v != POINTER_FILE
);
