//! # Haven Notify
//!
//! Routes engine notifications to the host application's delivery channels.
//! The dispatcher classifies a resolved contact as email or phone, hands the
//! notification to the matching injected sender, and degrades gracefully:
//! push if the classified channel is unconfigured, a structured log line if
//! nothing is.
//!
//! Delivery is advisory. No sender outcome — including an outright error —
//! ever fails the state-machine operation that produced the notification.

#![forbid(unsafe_code)]

pub mod dispatcher;

pub use dispatcher::NotificationDispatcher;
