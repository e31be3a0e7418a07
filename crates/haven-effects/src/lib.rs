//! # Haven Effects
//!
//! Effect handler implementations for the collaborator contracts defined in
//! `haven-core`: a system clock and a manually-driven test clock, an
//! AES-256-GCM contact vault, an Ed25519 identity validator, and an
//! in-memory ledger client for tests and simulation.
//!
//! The engine in `haven-recovery` consumes these only through the
//! `haven-core` traits; swapping a handler never touches engine code.

#![forbid(unsafe_code)]

pub mod clock;
pub mod ledger;
pub mod validator;
pub mod vault;

pub use clock::{ManualClock, SystemClock};
pub use ledger::MockLedgerClient;
pub use validator::Ed25519Validator;
pub use vault::SealedContactVault;
