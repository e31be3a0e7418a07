//! # Haven Core
//!
//! Core vocabulary for the Haven guardian-recovery engine: identifier and
//! time primitives, the unified error type, domain events, notification
//! payloads, and the contracts of every external collaborator the engine
//! consumes (clock, contact vault, ledger client, notifier senders,
//! identity validator).
//!
//! ## What Belongs Here
//!
//! - Types shared by more than one Haven crate
//! - Collaborator traits, so the engine can be driven entirely through
//!   constructor-injected dependencies
//! - The event bus used for observer-style subscriptions
//!
//! ## What Does NOT Belong Here
//!
//! - Effect handler implementations (belong in haven-effects)
//! - Recovery lifecycle state and rules (belong in haven-recovery)
//! - Notification routing (belongs in haven-notify)

#![forbid(unsafe_code)]

pub mod effects;
pub mod error;
pub mod events;
pub mod identity;
pub mod notification;
pub mod time;

pub use effects::{
    Clock, ContactVault, EmailSender, IdentityValidator, LedgerClient, OwnershipTransfer,
    PushSender, SmsSender,
};
pub use error::{Error, ErrorClass, Result};
pub use events::{EventBus, RecoveryEvent};
pub use identity::{ContactId, EntryId, Identity, RequestId};
pub use notification::{Notification, NotificationKind};
pub use time::{PhysicalTime, DAY_MS, HOUR_MS, MINUTE_MS, SECOND_MS, WEEK_MS};
