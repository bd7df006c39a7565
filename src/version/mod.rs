/// Server versions and the per-version adapter chain
///
/// - `chain`: ordered adapter records and resolution (`VersionAdapter`)
/// - `base`: 9.6 SQL templates, the oldest node implementing every operation
/// - `pg10`: sequence properties moved to `pg_catalog.pg_sequence`
/// - `pg12`: `pg_class.relhasoids` removed
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::core::AdminError;

pub mod base;
pub mod chain;
pub mod pg10;
pub mod pg12;

pub use chain::{AdapterNode, CapabilityLookup, Operation, Overrides, VersionAdapter, ADAPTER_CHAIN};

/// PostgreSQL server version
///
/// Before 10 the major version has two parts (9.6) and `minor` is part of it;
/// from 10 on `minor` is the patch release (10.5). Ordering is by
/// `(major, minor)` either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl ServerVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse `server_version_num` (90624, 100005, 160001)
    pub fn from_version_num(num: u32) -> Result<Self, AdminError> {
        let major = num / 10000;
        if major == 0 {
            return Err(AdminError::UnsupportedVersion(num.to_string()));
        }
        if major >= 10 {
            Ok(Self::new(major, num % 10000))
        } else {
            Ok(Self::new(major, (num / 100) % 100))
        }
    }

    /// Major version only: `9.6` stays `9.6`, `10.5` becomes `10`
    #[must_use]
    pub const fn major_version(self) -> Self {
        if self.major >= 10 {
            Self::new(self.major, 0)
        } else {
            self
        }
    }
}

impl FromStr for ServerVersion {
    type Err = AdminError;

    /// Accepts `server_version` strings: `9.6.24`, `10.5`, `16beta1`, `12.3 (Debian 12.3-1)`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let numeric: String = s
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let major = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .filter(|m| *m > 0)
            .ok_or_else(|| AdminError::UnsupportedVersion(s.to_string()))?;
        let minor = match parts.next() {
            Some(p) => p
                .parse::<u32>()
                .map_err(|_| AdminError::UnsupportedVersion(s.to_string()))?,
            None => 0,
        };

        Ok(Self::new(major, minor))
    }
}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor).cmp(&(other.major, other.minor))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.major < 10 || self.minor != 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}", self.major)
        }
    }
}

/// Catalog or syntax feature whose presence depends on the server version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// `pg_class.relhasoids` and `WITH OIDS` tables (gone in 12)
    HasObjectIdentifiers,
    /// `pg_catalog.pg_sequence` holds sequence parameters (10+)
    SequenceCatalog,
}
