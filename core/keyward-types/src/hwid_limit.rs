//! Device limit attached to a license key.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// The sentinel meaning "no device binding at all".
pub const UNLIMITED: &str = "unlimited";

/// How many devices may use a key.
///
/// On the wire this is either the string `"unlimited"` or a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "HwidLimitRepr", into = "HwidLimitRepr")]
pub enum HwidLimit {
    /// Verification never consults or records a device.
    Unlimited,
    /// Verification binds the first device it sees.
    Devices(NonZeroU32),
}

impl HwidLimit {
    /// A single device, the default for new keys.
    pub const SINGLE: Self = Self::Devices(NonZeroU32::MIN);

    /// Returns true for the unlimited sentinel.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Returns the device count, or None when unlimited.
    #[must_use]
    pub fn devices(&self) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::Devices(n) => Some(n.get()),
        }
    }
}

impl Default for HwidLimit {
    fn default() -> Self {
        Self::SINGLE
    }
}

impl fmt::Display for HwidLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str(UNLIMITED),
            Self::Devices(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for HwidLimit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == UNLIMITED {
            return Ok(Self::Unlimited);
        }
        s.parse::<NonZeroU32>()
            .map(Self::Devices)
            .map_err(|_| Error::InvalidHwidLimit(s.to_string()))
    }
}

/// Wire representation: a JSON number or the `"unlimited"` string.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum HwidLimitRepr {
    Count(u64),
    Word(String),
}

impl TryFrom<HwidLimitRepr> for HwidLimit {
    type Error = Error;

    fn try_from(repr: HwidLimitRepr) -> Result<Self, Self::Error> {
        match repr {
            HwidLimitRepr::Word(word) if word == UNLIMITED => Ok(Self::Unlimited),
            HwidLimitRepr::Word(word) => Err(Error::InvalidHwidLimit(word)),
            HwidLimitRepr::Count(n) => u32::try_from(n)
                .ok()
                .and_then(NonZeroU32::new)
                .map(Self::Devices)
                .ok_or_else(|| Error::InvalidHwidLimit(n.to_string())),
        }
    }
}

impl From<HwidLimit> for HwidLimitRepr {
    fn from(limit: HwidLimit) -> Self {
        match limit {
            HwidLimit::Unlimited => Self::Word(UNLIMITED.to_string()),
            HwidLimit::Devices(n) => Self::Count(u64::from(n.get())),
        }
    }
}
