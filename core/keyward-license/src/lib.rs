//! License verification and key lifecycle for Keyward.
//!
//! This crate handles:
//! - The verification decision for a key and a presented hardware ID
//! - Committing the first device that verifies as the key's permanent binding
//! - Administrative add/delete/reset/list operations
//!
//! # Design Principles
//!
//! - **Pure decisions**: [`decide`] never touches storage; it proposes a
//!   [`Mutation`] that the [`Verifier`] commits
//! - **One device per key**: the binding is committed with the store's
//!   atomic `bind_if_unbound`, so concurrent first uses have one winner
//! - **Lenient expiry**: unreadable expiry data never expires
//! - **No hidden purge**: expired keys stay listed and are reported as expired

mod clock;
mod engine;
mod error;
mod lifecycle;
mod verifier;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{decide, Decision, Mutation, Verdict};
pub use error::{LicenseError, LicenseResult};
pub use lifecycle::LifecycleManager;
pub use verifier::Verifier;
