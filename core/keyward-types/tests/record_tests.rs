use chrono::Utc;
use keyward_types::{Expiry, HwidLimit, NewLicenseKey};
use std::num::NonZeroU32;

// ── HwidLimit ────────────────────────────────────────────────────

#[test]
fn hwid_limit_defaults_to_single_device() {
    assert_eq!(HwidLimit::default(), HwidLimit::SINGLE);
    assert_eq!(HwidLimit::default().devices(), Some(1));
    assert!(!HwidLimit::default().is_unlimited());
}

#[test]
fn hwid_limit_wire_forms() {
    let one: HwidLimit = serde_json::from_str("1").unwrap();
    assert_eq!(one, HwidLimit::SINGLE);

    let three: HwidLimit = serde_json::from_str("3").unwrap();
    assert_eq!(three.devices(), Some(3));

    let unlimited: HwidLimit = serde_json::from_str(r#""unlimited""#).unwrap();
    assert!(unlimited.is_unlimited());
    assert_eq!(unlimited.devices(), None);

    assert_eq!(serde_json::to_string(&HwidLimit::Unlimited).unwrap(), r#""unlimited""#);
    assert_eq!(serde_json::to_string(&HwidLimit::SINGLE).unwrap(), "1");
}

#[test]
fn hwid_limit_rejects_invalid_values() {
    for raw in ["0", "-1", r#""lots""#, "1.5", "null", "4294967296"] {
        assert!(serde_json::from_str::<HwidLimit>(raw).is_err(), "{raw}");
    }
}

#[test]
fn hwid_limit_from_str() {
    assert_eq!("unlimited".parse::<HwidLimit>().unwrap(), HwidLimit::Unlimited);
    assert_eq!(
        "2".parse::<HwidLimit>().unwrap(),
        HwidLimit::Devices(NonZeroU32::new(2).unwrap())
    );
    let err = "0".parse::<HwidLimit>().unwrap_err();
    assert!(err.to_string().contains("invalid hwid limit"));
}

#[test]
fn hwid_limit_display() {
    assert_eq!(HwidLimit::Unlimited.to_string(), "unlimited");
    assert_eq!(HwidLimit::SINGLE.to_string(), "1");
}

// ── LicenseKey ───────────────────────────────────────────────────

#[test]
fn new_key_defaults() {
    let new = NewLicenseKey::new("FREE1");
    assert_eq!(new.expiry, Expiry::lifetime());
    assert_eq!(new.hwid_limit, HwidLimit::SINGLE);
}

#[test]
fn into_record_is_unbound() {
    let now = Utc::now();
    let record = NewLicenseKey::new("ABC123")
        .with_expiry("2020-01-01T00:00:00")
        .with_hwid_limit(HwidLimit::Unlimited)
        .into_record(now);

    assert_eq!(record.key, "ABC123");
    assert_eq!(record.expiry.as_str(), "2020-01-01T00:00:00");
    assert!(record.hwid_limit.is_unlimited());
    assert_eq!(record.bound_hwid, None);
    assert_eq!(record.created_at, now);
    assert!(!record.is_bound());
}

#[test]
fn empty_binding_counts_as_unbound() {
    let mut record = NewLicenseKey::new("K").into_record(Utc::now());
    record.bound_hwid = Some(String::new());
    assert!(!record.is_bound());
    assert_eq!(record.binding(), None);

    record.bound_hwid = Some("H1".into());
    assert!(record.is_bound());
    assert_eq!(record.binding(), Some("H1"));
}

#[test]
fn record_serde_uses_wire_names() {
    let record = NewLicenseKey::new("K").into_record(Utc::now());
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["expiry"], "lifetime");
    assert_eq!(value["hwid_limit"], 1);
    assert!(value["bound_hwid"].is_null());

    let parsed: keyward_types::LicenseKey = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, record);
}
