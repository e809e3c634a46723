//! Push-transport contracts, no-op adapter, and scriptable in-memory adapter.

use std::{cell::RefCell, collections::BTreeSet, future::Future, pin::Pin, rc::Rc};

use futures::{
    channel::mpsc::{unbounded, UnboundedSender},
    stream::{self, LocalBoxStream},
    StreamExt,
};
use serde::{Deserialize, Serialize};

use crate::NotificationPayload;

/// Object-safe boxed future used by [`PushTransport`] async methods.
pub type PushFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Process-wide entry point invoked for messages delivered while the app is in the background.
///
/// A plain function pointer: background delivery may run without any of the app's state.
pub type BackgroundHandler = fn(&RemoteMessage);

/// Authorization answer reported by the push transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushAuthorization {
    /// The user granted notification permission.
    Authorized,
    /// Quiet/provisional delivery was granted.
    Provisional,
    /// The user denied notification permission.
    Denied,
    /// The user has not answered the permission prompt.
    NotDetermined,
}

impl PushAuthorization {
    /// Returns whether notifications may be delivered under this answer.
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Authorized | Self::Provisional)
    }
}

/// Visible title/body block of a remote message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNotification {
    /// Banner title.
    pub title: Option<String>,
    /// Banner body text.
    pub body: Option<String>,
}

/// Message delivered by the push transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    /// Transport-assigned message id, when provided.
    #[serde(default)]
    pub message_id: Option<String>,
    /// Visible notification block; data-only messages carry none.
    #[serde(default)]
    pub notification: Option<RemoteNotification>,
    /// Attached payload.
    #[serde(default)]
    pub data: NotificationPayload,
}

impl RemoteMessage {
    /// Creates a data-only message.
    pub fn data_only(data: NotificationPayload) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Creates a message with a visible notification block.
    pub fn with_notification(
        title: impl Into<String>,
        body: impl Into<String>,
        data: NotificationPayload,
    ) -> Self {
        Self {
            message_id: None,
            notification: Some(RemoteNotification {
                title: Some(title.into()),
                body: Some(body.into()),
            }),
            data,
        }
    }
}

/// How the OS should present push messages received while the app is in the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForegroundPresentation {
    /// Show the banner/alert.
    pub alert: bool,
    /// Update the app badge.
    pub badge: bool,
    /// Play the notification sound.
    pub sound: bool,
}

impl Default for ForegroundPresentation {
    fn default() -> Self {
        Self {
            alert: true,
            badge: true,
            sound: true,
        }
    }
}

/// Host service for the cloud push-messaging client.
pub trait PushTransport {
    /// Prompts for (or reads) push notification permission.
    fn request_permission<'a>(&'a self) -> PushFuture<'a, Result<PushAuthorization, String>>;

    /// Configures foreground presentation of push messages.
    fn set_foreground_presentation<'a>(
        &'a self,
        options: ForegroundPresentation,
    ) -> PushFuture<'a, Result<(), String>>;

    /// Registers the process-wide background message entry point.
    fn set_background_handler(&self, handler: BackgroundHandler) -> Result<(), String>;

    /// Fetches the current device token.
    fn token<'a>(&'a self) -> PushFuture<'a, Result<Option<String>, String>>;

    /// Stream of messages received while the app is in the foreground.
    fn message_stream(&self) -> LocalBoxStream<'static, RemoteMessage>;

    /// Stream of messages whose notification was tapped while the app was backgrounded.
    fn opened_app_stream(&self) -> LocalBoxStream<'static, RemoteMessage>;

    /// Stream of refreshed device tokens.
    fn token_refresh_stream(&self) -> LocalBoxStream<'static, String>;

    /// Returns the message whose tap launched the app from a terminated state, if any.
    fn initial_message<'a>(&'a self) -> PushFuture<'a, Result<Option<RemoteMessage>, String>>;

    /// Subscribes the device to a broadcast topic.
    fn subscribe_to_topic<'a>(&'a self, topic: &'a str) -> PushFuture<'a, Result<(), String>>;

    /// Unsubscribes the device from a broadcast topic.
    fn unsubscribe_from_topic<'a>(&'a self, topic: &'a str)
        -> PushFuture<'a, Result<(), String>>;
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op push transport for targets without a push client.
///
/// Permission is reported as denied and every stream ends immediately.
pub struct NoopPushTransport;

impl PushTransport for NoopPushTransport {
    fn request_permission<'a>(&'a self) -> PushFuture<'a, Result<PushAuthorization, String>> {
        Box::pin(async { Ok(PushAuthorization::Denied) })
    }

    fn set_foreground_presentation<'a>(
        &'a self,
        _options: ForegroundPresentation,
    ) -> PushFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn set_background_handler(&self, _handler: BackgroundHandler) -> Result<(), String> {
        Ok(())
    }

    fn token<'a>(&'a self) -> PushFuture<'a, Result<Option<String>, String>> {
        Box::pin(async { Ok(None) })
    }

    fn message_stream(&self) -> LocalBoxStream<'static, RemoteMessage> {
        stream::empty().boxed_local()
    }

    fn opened_app_stream(&self) -> LocalBoxStream<'static, RemoteMessage> {
        stream::empty().boxed_local()
    }

    fn token_refresh_stream(&self) -> LocalBoxStream<'static, String> {
        stream::empty().boxed_local()
    }

    fn initial_message<'a>(&'a self) -> PushFuture<'a, Result<Option<RemoteMessage>, String>> {
        Box::pin(async { Ok(None) })
    }

    fn subscribe_to_topic<'a>(&'a self, _topic: &'a str) -> PushFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn unsubscribe_from_topic<'a>(
        &'a self,
        _topic: &'a str,
    ) -> PushFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug)]
struct MemoryPushState {
    authorization: Result<PushAuthorization, String>,
    foreground_error: Option<String>,
    token: Result<Option<String>, String>,
    initial_message: Option<RemoteMessage>,
    topics: BTreeSet<String>,
    permission_requests: usize,
    token_requests: usize,
    initial_message_requests: usize,
    foreground_presentation: Option<ForegroundPresentation>,
    background_handler: Option<BackgroundHandler>,
    message_senders: Vec<UnboundedSender<RemoteMessage>>,
    opened_senders: Vec<UnboundedSender<RemoteMessage>>,
    token_senders: Vec<UnboundedSender<String>>,
    stream_subscriptions: usize,
}

impl Default for MemoryPushState {
    fn default() -> Self {
        Self {
            authorization: Ok(PushAuthorization::Authorized),
            foreground_error: None,
            token: Ok(None),
            initial_message: None,
            topics: BTreeSet::new(),
            permission_requests: 0,
            token_requests: 0,
            initial_message_requests: 0,
            foreground_presentation: None,
            background_handler: None,
            message_senders: Vec::new(),
            opened_senders: Vec::new(),
            token_senders: Vec::new(),
            stream_subscriptions: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory push transport with scripted answers and manually emitted events.
pub struct MemoryPushTransport {
    inner: Rc<RefCell<MemoryPushState>>,
}

impl MemoryPushTransport {
    /// Scripts the permission answer (default: authorized).
    pub fn set_authorization(&self, authorization: Result<PushAuthorization, String>) {
        self.inner.borrow_mut().authorization = authorization;
    }

    /// Makes foreground presentation setup fail with `error`.
    pub fn fail_foreground_presentation(&self, error: impl Into<String>) {
        self.inner.borrow_mut().foreground_error = Some(error.into());
    }

    /// Scripts the token answer (default: no token).
    pub fn set_token(&self, token: Result<Option<String>, String>) {
        self.inner.borrow_mut().token = token;
    }

    /// Scripts the cold-start message.
    pub fn set_initial_message(&self, message: Option<RemoteMessage>) {
        self.inner.borrow_mut().initial_message = message;
    }

    /// Number of permission prompts requested so far.
    pub fn permission_requests(&self) -> usize {
        self.inner.borrow().permission_requests
    }

    /// Number of token fetches requested so far.
    pub fn token_requests(&self) -> usize {
        self.inner.borrow().token_requests
    }

    /// Number of cold-start message lookups so far.
    pub fn initial_message_requests(&self) -> usize {
        self.inner.borrow().initial_message_requests
    }

    /// Number of event streams handed out so far.
    pub fn stream_subscriptions(&self) -> usize {
        self.inner.borrow().stream_subscriptions
    }

    /// Last configured foreground presentation.
    pub fn foreground_presentation(&self) -> Option<ForegroundPresentation> {
        self.inner.borrow().foreground_presentation
    }

    /// Registered background entry point.
    pub fn background_handler(&self) -> Option<BackgroundHandler> {
        self.inner.borrow().background_handler
    }

    /// Topics currently subscribed.
    pub fn topics(&self) -> Vec<String> {
        self.inner.borrow().topics.iter().cloned().collect()
    }

    /// Delivers a foreground message to every live subscriber; returns how many received it.
    pub fn emit_message(&self, message: RemoteMessage) -> usize {
        broadcast(&mut self.inner.borrow_mut().message_senders, message)
    }

    /// Delivers a background tap to every live subscriber; returns how many received it.
    pub fn emit_opened_app(&self, message: RemoteMessage) -> usize {
        broadcast(&mut self.inner.borrow_mut().opened_senders, message)
    }

    /// Delivers a token refresh to every live subscriber; returns how many received it.
    pub fn emit_token_refresh(&self, token: impl Into<String>) -> usize {
        broadcast(&mut self.inner.borrow_mut().token_senders, token.into())
    }
}

fn broadcast<T: Clone>(senders: &mut Vec<UnboundedSender<T>>, event: T) -> usize {
    senders.retain(|sender| !sender.is_closed());
    senders
        .iter()
        .filter(|sender| sender.unbounded_send(event.clone()).is_ok())
        .count()
}

impl PushTransport for MemoryPushTransport {
    fn request_permission<'a>(&'a self) -> PushFuture<'a, Result<PushAuthorization, String>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            state.permission_requests += 1;
            state.authorization.clone()
        })
    }

    fn set_foreground_presentation<'a>(
        &'a self,
        options: ForegroundPresentation,
    ) -> PushFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            if let Some(error) = state.foreground_error.clone() {
                return Err(error);
            }
            state.foreground_presentation = Some(options);
            Ok(())
        })
    }

    fn set_background_handler(&self, handler: BackgroundHandler) -> Result<(), String> {
        self.inner.borrow_mut().background_handler = Some(handler);
        Ok(())
    }

    fn token<'a>(&'a self) -> PushFuture<'a, Result<Option<String>, String>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            state.token_requests += 1;
            state.token.clone()
        })
    }

    fn message_stream(&self) -> LocalBoxStream<'static, RemoteMessage> {
        let (tx, rx) = unbounded();
        let mut state = self.inner.borrow_mut();
        state.stream_subscriptions += 1;
        state.message_senders.push(tx);
        rx.boxed_local()
    }

    fn opened_app_stream(&self) -> LocalBoxStream<'static, RemoteMessage> {
        let (tx, rx) = unbounded();
        let mut state = self.inner.borrow_mut();
        state.stream_subscriptions += 1;
        state.opened_senders.push(tx);
        rx.boxed_local()
    }

    fn token_refresh_stream(&self) -> LocalBoxStream<'static, String> {
        let (tx, rx) = unbounded();
        let mut state = self.inner.borrow_mut();
        state.stream_subscriptions += 1;
        state.token_senders.push(tx);
        rx.boxed_local()
    }

    fn initial_message<'a>(&'a self) -> PushFuture<'a, Result<Option<RemoteMessage>, String>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            state.initial_message_requests += 1;
            Ok(state.initial_message.clone())
        })
    }

    fn subscribe_to_topic<'a>(&'a self, topic: &'a str) -> PushFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner.borrow_mut().topics.insert(topic.to_string());
            Ok(())
        })
    }

    fn unsubscribe_from_topic<'a>(
        &'a self,
        topic: &'a str,
    ) -> PushFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner.borrow_mut().topics.remove(topic);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use futures::StreamExt;

    use super::*;

    #[test]
    fn push_authorization_grant_policy() {
        assert!(PushAuthorization::Authorized.is_granted());
        assert!(PushAuthorization::Provisional.is_granted());
        assert!(!PushAuthorization::Denied.is_granted());
        assert!(!PushAuthorization::NotDetermined.is_granted());
    }

    #[test]
    fn memory_push_transport_broadcasts_to_live_streams() {
        let push = MemoryPushTransport::default();
        let transport: &dyn PushTransport = &push;
        let mut first = transport.message_stream();
        let second = transport.message_stream();
        drop(second);

        let message = RemoteMessage::data_only(NotificationPayload::new().with("route", "/a"));
        assert_eq!(push.emit_message(message.clone()), 1);
        assert_eq!(block_on(first.next()), Some(message));
        assert_eq!(push.stream_subscriptions(), 2);
    }

    #[test]
    fn memory_push_transport_counts_requests_and_tracks_topics() {
        let push = MemoryPushTransport::default();
        let transport: &dyn PushTransport = &push;
        push.set_token(Ok(Some("tok".to_string())));

        assert_eq!(
            block_on(transport.request_permission()),
            Ok(PushAuthorization::Authorized)
        );
        assert_eq!(block_on(transport.token()), Ok(Some("tok".to_string())));
        block_on(transport.subscribe_to_topic("news")).expect("subscribe");
        block_on(transport.subscribe_to_topic("sports")).expect("subscribe");
        block_on(transport.unsubscribe_from_topic("news")).expect("unsubscribe");

        assert_eq!(push.permission_requests(), 1);
        assert_eq!(push.token_requests(), 1);
        assert_eq!(push.topics(), vec!["sports".to_string()]);
    }

    #[test]
    fn noop_push_transport_is_denied_and_silent() {
        let transport: &dyn PushTransport = &NoopPushTransport;
        assert_eq!(
            block_on(transport.request_permission()),
            Ok(PushAuthorization::Denied)
        );
        assert_eq!(block_on(transport.token()), Ok(None));
        assert_eq!(block_on(transport.initial_message()), Ok(None));
        assert_eq!(block_on(transport.message_stream().next()), None);
        assert_eq!(block_on(transport.token_refresh_stream().next()), None);
    }

    #[test]
    fn remote_message_deserializes_without_optional_fields() {
        let message: RemoteMessage =
            serde_json::from_str(r#"{"data":{"type":"alert"}}"#).expect("decode message");
        assert_eq!(message.notification, None);
        assert_eq!(message.data.notification_type(), Some("alert"));
    }
}
