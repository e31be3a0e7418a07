//! Notification dispatch and channel classification.

use haven_core::{
    EmailSender, EventBus, Notification, NotificationKind, PushSender, RecoveryEvent, SmsSender,
};
use std::sync::Arc;

/// Delivery channel inferred from the shape of a resolved contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Email,
    Phone,
    Unknown,
}

fn classify(contact: &str) -> Channel {
    if contact.contains('@') {
        return Channel::Email;
    }
    let digits: String = contact
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let rest = digits.strip_prefix('+').unwrap_or(&digits);
    if (7..=15).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit()) {
        Channel::Phone
    } else {
        Channel::Unknown
    }
}

fn subject(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::GuardianApprovalRequest => "Recovery approval requested",
        NotificationKind::RecoveryInitiated => "Wallet recovery initiated",
        NotificationKind::ThresholdReached => "Recovery approval threshold reached",
        NotificationKind::TimeLockWarning => "Recovery executes in 24 hours",
        NotificationKind::RecoveryExecuted => "Wallet recovery executed",
        NotificationKind::RecoveryCancelled => "Wallet recovery cancelled",
        NotificationKind::TestCompleted => "Recovery test completed",
    }
}

/// Routes notifications to the injected delivery senders.
///
/// All three senders are optional; construction with none of them yields a
/// dispatcher that logs every notification, which is the correct behavior for
/// headless test environments.
#[derive(Clone)]
pub struct NotificationDispatcher {
    email: Option<Arc<dyn EmailSender>>,
    sms: Option<Arc<dyn SmsSender>>,
    push: Option<Arc<dyn PushSender>>,
    events: EventBus,
}

impl NotificationDispatcher {
    /// Create a dispatcher with no delivery senders configured.
    pub fn new(events: EventBus) -> Self {
        Self {
            email: None,
            sms: None,
            push: None,
            events,
        }
    }

    /// Configure the email sender.
    pub fn with_email(mut self, sender: Arc<dyn EmailSender>) -> Self {
        self.email = Some(sender);
        self
    }

    /// Configure the SMS sender.
    pub fn with_sms(mut self, sender: Arc<dyn SmsSender>) -> Self {
        self.sms = Some(sender);
        self
    }

    /// Configure the push sender.
    pub fn with_push(mut self, sender: Arc<dyn PushSender>) -> Self {
        self.push = Some(sender);
        self
    }

    /// Deliver `notification` to `contact`, best-effort.
    ///
    /// A missing contact is skipped, an unroutable contact falls back to push
    /// and then to the logging sink, and sender failures are logged and
    /// swallowed. This function has no error path by design.
    pub async fn dispatch(&self, notification: &Notification, contact: Option<&str>) {
        let Some(contact) = contact else {
            tracing::debug!(
                kind = notification.kind.as_str(),
                recipient = %notification.recipient,
                "no resolvable contact, skipping notification"
            );
            self.events.publish(RecoveryEvent::NotificationSkipped {
                kind: notification.kind,
                recipient: notification.recipient,
            });
            return;
        };

        self.events
            .publish(RecoveryEvent::Notification(notification.clone()));

        let outcome = match classify(contact) {
            Channel::Email => match &self.email {
                Some(sender) => Some(
                    sender
                        .send_email(contact, subject(notification.kind), &notification.message)
                        .await,
                ),
                None => self.push_fallback(notification, contact).await,
            },
            Channel::Phone => match &self.sms {
                Some(sender) => Some(sender.send_sms(contact, &notification.message).await),
                None => self.push_fallback(notification, contact).await,
            },
            Channel::Unknown => self.push_fallback(notification, contact).await,
        };

        match outcome {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                // Advisory path: delivery failure never reaches the caller.
                tracing::warn!(
                    kind = notification.kind.as_str(),
                    recipient = %notification.recipient,
                    error = %err,
                    "notification delivery failed"
                );
            }
            None => {
                tracing::info!(
                    kind = notification.kind.as_str(),
                    recipient = %notification.recipient,
                    message = %notification.message,
                    "notification (logging sink)"
                );
                self.events.publish(RecoveryEvent::NotificationLogged {
                    kind: notification.kind,
                    recipient: notification.recipient,
                });
            }
        }
    }

    /// Push if configured; `None` means "fall through to the logging sink".
    async fn push_fallback(
        &self,
        notification: &Notification,
        contact: &str,
    ) -> Option<haven_core::Result<()>> {
        let sender = self.push.as_ref()?;
        Some(
            sender
                .send_push(contact, subject(notification.kind), &notification.message)
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ed25519_dalek::SigningKey;
    use haven_core::{Error, Identity, RequestId, Result};
    use rand::rngs::OsRng;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEmail {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EmailSender for RecordingEmail {
        async fn send_email(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSms {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SmsSender for RecordingSms {
        async fn send_sms(&self, to: &str, _body: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(to.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingPush {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PushSender for RecordingPush {
        async fn send_push(&self, to: &str, _title: &str, _body: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(to.to_string());
            Ok(())
        }
    }

    struct FailingEmail;

    #[async_trait]
    impl EmailSender for FailingEmail {
        async fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> Result<()> {
            Err(Error::internal("smtp down"))
        }
    }

    fn notification() -> Notification {
        let identity =
            Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());
        Notification {
            kind: NotificationKind::RecoveryInitiated,
            request_id: RequestId::new(),
            recipient: identity,
            message: "recovery initiated".to_string(),
            timestamp_ms: 0,
            metadata: None,
        }
    }

    #[test]
    fn classification() {
        assert_eq!(classify("guardian@example.com"), Channel::Email);
        assert_eq!(classify("+1 555-123-4567"), Channel::Phone);
        assert_eq!(classify("5551234567"), Channel::Phone);
        assert_eq!(classify("not a contact"), Channel::Unknown);
        assert_eq!(classify("+12"), Channel::Unknown);
    }

    #[tokio::test]
    async fn email_contact_routes_to_email_sender() {
        let email = Arc::new(RecordingEmail::default());
        let dispatcher =
            NotificationDispatcher::new(EventBus::new()).with_email(email.clone());

        dispatcher
            .dispatch(&notification(), Some("owner@example.com"))
            .await;

        let sent = email.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "owner@example.com");
        assert_eq!(sent[0].1, "Wallet recovery initiated");
    }

    #[tokio::test]
    async fn phone_contact_routes_to_sms_sender() {
        let sms = Arc::new(RecordingSms::default());
        let dispatcher = NotificationDispatcher::new(EventBus::new()).with_sms(sms.clone());

        dispatcher.dispatch(&notification(), Some("+15551234567")).await;

        assert_eq!(sms.sent.lock().unwrap().as_slice(), ["+15551234567"]);
    }

    #[tokio::test]
    async fn missing_contact_emits_skip_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let dispatcher = NotificationDispatcher::new(bus);

        dispatcher.dispatch(&notification(), None).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "notification-skipped");
    }

    #[tokio::test]
    async fn unconfigured_channel_falls_back_to_push() {
        let push = Arc::new(RecordingPush::default());
        let dispatcher = NotificationDispatcher::new(EventBus::new()).with_push(push.clone());

        dispatcher
            .dispatch(&notification(), Some("owner@example.com"))
            .await;

        assert_eq!(push.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_senders_falls_back_to_logging_sink() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let dispatcher = NotificationDispatcher::new(bus);

        dispatcher
            .dispatch(&notification(), Some("owner@example.com"))
            .await;

        // First the dispatch-attempt event, then the logging-sink event.
        assert_eq!(rx.recv().await.unwrap().kind(), "notification");
        assert_eq!(rx.recv().await.unwrap().kind(), "notification-logged");
    }

    #[tokio::test]
    async fn sender_errors_are_swallowed() {
        let dispatcher =
            NotificationDispatcher::new(EventBus::new()).with_email(Arc::new(FailingEmail));

        // Must not panic or surface the error.
        dispatcher
            .dispatch(&notification(), Some("owner@example.com"))
            .await;
    }
}
