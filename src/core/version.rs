//! Protocol version triples and revision comparison.
//!
//! A `Version` is a `(major, minor, maintenance)` triple ordered by the
//! full triple. Handshake compatibility is decided on the `Revision`
//! (major and minor only): maintenance differences are tolerated across a
//! channel, revision differences are not.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A protocol version triple.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub maintenance: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16, maintenance: u16) -> Self {
        Self {
            major,
            minor,
            maintenance,
        }
    }

    /// The compatibility-relevant portion of this version.
    pub const fn revision(&self) -> Revision {
        Revision {
            major: self.major,
            minor: self.minor,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.maintenance)
    }
}

/// The `(major, minor)` portion of a [`Version`].
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
pub struct Revision {
    pub major: u16,
    pub minor: u16,
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
