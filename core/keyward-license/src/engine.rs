//! The verification decision.
//!
//! [`decide`] is a pure function of the stored record, the presented HWID
//! and the current time. Checks run in a fixed order and stop at the first
//! failure:
//!
//! 1. unknown key → [`Verdict::Invalid`]
//! 2. deadline strictly before now → [`Verdict::Expired`]
//! 3. unlimited key → valid, no binding
//! 4. unbound key → valid, proposes [`Mutation::BindHwid`]
//! 5. bound to another device → [`Verdict::Mismatch`]
//! 6. bound to this device → valid
//!
//! The proposed binding is not applied here. The caller commits it through
//! the store's conditional update.

use chrono::NaiveDateTime;
use keyward_types::{Expiry, ExpiryCheck, LicenseKey, UNLIMITED};

/// Outcome of verifying a key against a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No such key.
    Invalid,
    /// The key is past its expiry.
    Expired,
    /// The key is bound to a different device.
    Mismatch,
    /// Access granted.
    Valid {
        /// The bound device, or `"unlimited"` for keys without binding.
        hwid: String,
        /// The key's expiry as stored.
        expiry: Expiry,
    },
}

impl Verdict {
    /// Returns true if access is granted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Returns the caller-facing message for a refusal.
    #[must_use]
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Invalid => Some("Invalid Key"),
            Self::Expired => Some("Expired"),
            Self::Mismatch => Some("HWID Mismatch"),
            Self::Valid { .. } => None,
        }
    }
}

/// A store change proposed by [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Record this HWID as the key's permanent device.
    BindHwid(String),
}

/// A verdict plus the change needed to make it true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub mutation: Option<Mutation>,
}

impl Decision {
    fn refuse(verdict: Verdict) -> Self {
        Self {
            verdict,
            mutation: None,
        }
    }
}

/// Decides whether `presented_hwid` may use `record` at time `now`.
#[must_use]
pub fn decide(record: Option<&LicenseKey>, presented_hwid: &str, now: NaiveDateTime) -> Decision {
    let Some(record) = record else {
        return Decision::refuse(Verdict::Invalid);
    };

    match record.expiry.check(now) {
        ExpiryCheck::Expired => return Decision::refuse(Verdict::Expired),
        // Lenient expiry parse: unreadable expiry data never expires.
        ExpiryCheck::Malformed => {}
        ExpiryCheck::NeverExpires | ExpiryCheck::Active => {}
    }

    let valid = |hwid: &str| Verdict::Valid {
        hwid: hwid.to_string(),
        expiry: record.expiry.clone(),
    };

    if record.hwid_limit.is_unlimited() {
        return Decision {
            verdict: valid(UNLIMITED),
            mutation: None,
        };
    }

    match record.binding() {
        None => Decision {
            verdict: valid(presented_hwid),
            mutation: Some(Mutation::BindHwid(presented_hwid.to_string())),
        },
        Some(bound) if bound != presented_hwid => Decision::refuse(Verdict::Mismatch),
        Some(bound) => Decision {
            verdict: valid(bound),
            mutation: None,
        },
    }
}
