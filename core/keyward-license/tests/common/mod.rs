//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, Utc};
use keyward_types::{HwidLimit, LicenseKey, NewLicenseKey};

/// A fixed "now" well after the 2020 fixtures.
pub fn now() -> NaiveDateTime {
    at(2026, 10, 19, 12, 0, 0)
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

/// An unbound single-device lifetime key.
pub fn unbound(key: &str) -> LicenseKey {
    NewLicenseKey::new(key).into_record(Utc::now())
}

/// A single-device key already bound to `hwid`.
pub fn bound(key: &str, hwid: &str) -> LicenseKey {
    let mut record = unbound(key);
    record.bound_hwid = Some(hwid.to_string());
    record
}

/// An unlimited-device key.
pub fn unlimited(key: &str) -> LicenseKey {
    NewLicenseKey::new(key)
        .with_hwid_limit(HwidLimit::Unlimited)
        .into_record(Utc::now())
}

/// A key with the given expiry text.
pub fn expiring(key: &str, expiry: &str) -> LicenseKey {
    NewLicenseKey::new(key)
        .with_expiry(expiry)
        .into_record(Utc::now())
}
