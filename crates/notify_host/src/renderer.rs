//! Local-notification renderer contracts and adapters.

use std::{cell::RefCell, future::Future, pin::Pin, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::NotificationId;

/// Object-safe boxed future used by [`LocalNotificationRenderer`] async methods.
pub type RendererFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Callback the renderer invokes when the user taps a shown notification or one of its actions.
pub type TapHandler = Rc<dyn Fn(NotificationResponse)>;

/// Renderer start-up settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Small icon resource used for notifications (Android drawable name).
    pub icon: String,
    /// Whether the renderer should prompt for permission during initialization.
    ///
    /// Permission is requested explicitly afterwards, so this stays off by default.
    pub request_permission_on_init: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            icon: "@mipmap/ic_launcher".to_string(),
            request_permission_on_init: false,
        }
    }
}

/// Interruption level of a notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelImportance {
    /// No sound or visual interruption.
    Min,
    /// No sound.
    Low,
    /// Sound without heads-up display.
    Default,
    /// Sound and heads-up display.
    #[default]
    High,
    /// Urgent, full-screen capable.
    Max,
}

/// Notification channel declaration for platforms that group notifications by channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Stable channel id.
    pub id: String,
    /// User-visible channel name.
    pub name: String,
    /// User-visible channel description.
    pub description: String,
    /// Channel importance.
    pub importance: ChannelImportance,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            id: "default_channel".to_string(),
            name: "Notifications".to_string(),
            description: "General notifications".to_string(),
            importance: ChannelImportance::High,
        }
    }
}

/// One interactive button shown on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Normalized identifier reported back on tap.
    pub id: String,
    /// Human-readable label.
    pub label: String,
}

/// Pre-declared set of actions referenced by notifications on platforms that require it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCategory {
    /// Category identifier.
    pub id: String,
    /// Actions in display order.
    pub actions: Vec<NotificationAction>,
}

/// Fully prepared local notification handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNotification {
    /// Display-level identifier.
    pub id: NotificationId,
    /// Banner title.
    pub title: String,
    /// Banner body text.
    pub body: String,
    /// Encoded payload returned verbatim on tap.
    pub payload: Option<String>,
    /// Action buttons in display order.
    pub actions: Vec<NotificationAction>,
    /// Registered action category, on platforms that need one.
    pub category_id: Option<String>,
    /// Channel the notification is posted to.
    pub channel_id: String,
}

/// Tap report delivered by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResponse {
    /// Identifier of the tapped notification, when known.
    pub id: Option<NotificationId>,
    /// Action button identifier; `None` for a tap on the notification body.
    pub action_id: Option<String>,
    /// Reply text entered into a text-input action.
    pub input: Option<String>,
    /// Encoded payload attached at show time.
    pub payload: Option<String>,
}

/// Whether the current process was launched by tapping a local notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchDetails {
    /// True when the tap launched the app from a terminated state.
    pub launched_app: bool,
    /// Encoded payload of the launching notification.
    pub payload: Option<String>,
}

/// Host service for on-device notification banners.
pub trait LocalNotificationRenderer {
    /// Prepares the renderer and installs the tap handler (replacing any earlier one).
    fn initialize<'a>(
        &'a self,
        settings: &'a RendererSettings,
        on_tap: TapHandler,
    ) -> RendererFuture<'a, Result<(), String>>;

    /// Requests permission to show notifications.
    ///
    /// `Ok(None)` means the platform gave no answer.
    fn request_permission<'a>(&'a self) -> RendererFuture<'a, Result<Option<bool>, String>>;

    /// Declares a notification channel.
    fn create_channel<'a>(
        &'a self,
        channel: &'a ChannelSettings,
    ) -> RendererFuture<'a, Result<(), String>>;

    /// Replaces the set of registered action categories.
    fn register_categories<'a>(
        &'a self,
        categories: &'a [ActionCategory],
    ) -> RendererFuture<'a, Result<(), String>>;

    /// Displays a notification.
    fn show<'a>(
        &'a self,
        notification: &'a LocalNotification,
    ) -> RendererFuture<'a, Result<(), String>>;

    /// Removes one shown notification.
    fn cancel<'a>(&'a self, id: NotificationId) -> RendererFuture<'a, Result<(), String>>;

    /// Removes every shown notification.
    fn cancel_all<'a>(&'a self) -> RendererFuture<'a, Result<(), String>>;

    /// Reports whether a notification tap launched the current process.
    fn launch_details<'a>(&'a self) -> RendererFuture<'a, Result<Option<LaunchDetails>, String>>;
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op renderer for targets without a local notification surface.
pub struct NoopLocalRenderer;

impl LocalNotificationRenderer for NoopLocalRenderer {
    fn initialize<'a>(
        &'a self,
        _settings: &'a RendererSettings,
        _on_tap: TapHandler,
    ) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn request_permission<'a>(&'a self) -> RendererFuture<'a, Result<Option<bool>, String>> {
        Box::pin(async { Ok(None) })
    }

    fn create_channel<'a>(
        &'a self,
        _channel: &'a ChannelSettings,
    ) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn register_categories<'a>(
        &'a self,
        _categories: &'a [ActionCategory],
    ) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn show<'a>(
        &'a self,
        _notification: &'a LocalNotification,
    ) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn cancel<'a>(&'a self, _id: NotificationId) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn cancel_all<'a>(&'a self) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn launch_details<'a>(&'a self) -> RendererFuture<'a, Result<Option<LaunchDetails>, String>> {
        Box::pin(async { Ok(None) })
    }
}

#[derive(Default)]
struct MemoryRendererState {
    initialize_error: Option<String>,
    permission: Option<Result<Option<bool>, String>>,
    category_error: Option<String>,
    show_error: Option<String>,
    launch_details: Option<LaunchDetails>,
    tap_handler: Option<TapHandler>,
    initialize_calls: usize,
    permission_requests: usize,
    launch_detail_requests: usize,
    channels: Vec<ChannelSettings>,
    category_registrations: Vec<Vec<ActionCategory>>,
    shown: Vec<LocalNotification>,
    cancelled: Vec<NotificationId>,
    cancel_all_calls: usize,
}

#[derive(Clone, Default)]
/// In-memory renderer recording every call, with scripted failures and manual taps.
pub struct MemoryLocalRenderer {
    inner: Rc<RefCell<MemoryRendererState>>,
}

impl std::fmt::Debug for MemoryLocalRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("MemoryLocalRenderer")
            .field("initialize_calls", &state.initialize_calls)
            .field("shown", &state.shown.len())
            .finish_non_exhaustive()
    }
}

impl MemoryLocalRenderer {
    /// Makes every `initialize` call fail with `error`.
    pub fn fail_initialize(&self, error: impl Into<String>) {
        self.inner.borrow_mut().initialize_error = Some(error.into());
    }

    /// Scripts the permission answer (default: granted).
    pub fn set_permission(&self, permission: Result<Option<bool>, String>) {
        self.inner.borrow_mut().permission = Some(permission);
    }

    /// Makes category registration fail with `error` until cleared with `None`.
    pub fn set_category_error(&self, error: Option<String>) {
        self.inner.borrow_mut().category_error = error;
    }

    /// Makes `show` fail with `error` until cleared with `None`.
    pub fn set_show_error(&self, error: Option<String>) {
        self.inner.borrow_mut().show_error = error;
    }

    /// Scripts the launch details.
    pub fn set_launch_details(&self, details: Option<LaunchDetails>) {
        self.inner.borrow_mut().launch_details = details;
    }

    /// Number of `initialize` calls so far.
    pub fn initialize_calls(&self) -> usize {
        self.inner.borrow().initialize_calls
    }

    /// Number of permission prompts so far.
    pub fn permission_requests(&self) -> usize {
        self.inner.borrow().permission_requests
    }

    /// Number of launch-detail lookups so far.
    pub fn launch_detail_requests(&self) -> usize {
        self.inner.borrow().launch_detail_requests
    }

    /// Channels declared so far.
    pub fn channels(&self) -> Vec<ChannelSettings> {
        self.inner.borrow().channels.clone()
    }

    /// Every successful category registration, oldest first.
    pub fn category_registrations(&self) -> Vec<Vec<ActionCategory>> {
        self.inner.borrow().category_registrations.clone()
    }

    /// Notifications shown so far, oldest first.
    pub fn shown(&self) -> Vec<LocalNotification> {
        self.inner.borrow().shown.clone()
    }

    /// Identifiers cancelled individually so far.
    pub fn cancelled(&self) -> Vec<NotificationId> {
        self.inner.borrow().cancelled.clone()
    }

    /// Number of `cancel_all` calls so far.
    pub fn cancel_all_calls(&self) -> usize {
        self.inner.borrow().cancel_all_calls
    }

    /// Delivers a tap to the installed handler; returns false when none is installed.
    pub fn tap(&self, response: NotificationResponse) -> bool {
        let handler = self.inner.borrow().tap_handler.clone();
        match handler {
            Some(handler) => {
                handler(response);
                true
            }
            None => false,
        }
    }

    /// Taps a previously shown notification, optionally on one of its actions.
    ///
    /// Returns false when no such notification was shown or no handler is installed.
    pub fn tap_shown(&self, id: NotificationId, action_id: Option<&str>) -> bool {
        let payload = self
            .inner
            .borrow()
            .shown
            .iter()
            .find(|notification| notification.id == id)
            .map(|notification| notification.payload.clone());
        let Some(payload) = payload else {
            return false;
        };
        self.tap(NotificationResponse {
            id: Some(id),
            action_id: action_id.map(str::to_string),
            input: None,
            payload,
        })
    }
}

impl LocalNotificationRenderer for MemoryLocalRenderer {
    fn initialize<'a>(
        &'a self,
        _settings: &'a RendererSettings,
        on_tap: TapHandler,
    ) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            state.initialize_calls += 1;
            if let Some(error) = state.initialize_error.clone() {
                return Err(error);
            }
            state.tap_handler = Some(on_tap);
            Ok(())
        })
    }

    fn request_permission<'a>(&'a self) -> RendererFuture<'a, Result<Option<bool>, String>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            state.permission_requests += 1;
            state.permission.clone().unwrap_or(Ok(Some(true)))
        })
    }

    fn create_channel<'a>(
        &'a self,
        channel: &'a ChannelSettings,
    ) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner.borrow_mut().channels.push(channel.clone());
            Ok(())
        })
    }

    fn register_categories<'a>(
        &'a self,
        categories: &'a [ActionCategory],
    ) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            if let Some(error) = state.category_error.clone() {
                return Err(error);
            }
            state.category_registrations.push(categories.to_vec());
            Ok(())
        })
    }

    fn show<'a>(
        &'a self,
        notification: &'a LocalNotification,
    ) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            if let Some(error) = state.show_error.clone() {
                return Err(error);
            }
            state.shown.push(notification.clone());
            Ok(())
        })
    }

    fn cancel<'a>(&'a self, id: NotificationId) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner.borrow_mut().cancelled.push(id);
            Ok(())
        })
    }

    fn cancel_all<'a>(&'a self) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner.borrow_mut().cancel_all_calls += 1;
            Ok(())
        })
    }

    fn launch_details<'a>(&'a self) -> RendererFuture<'a, Result<Option<LaunchDetails>, String>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            state.launch_detail_requests += 1;
            Ok(state.launch_details.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::executor::block_on;

    use super::*;

    fn notification(raw_id: i32, payload: Option<&str>) -> LocalNotification {
        LocalNotification {
            id: NotificationId::new(raw_id).expect("positive id"),
            title: "Hi".to_string(),
            body: "There".to_string(),
            payload: payload.map(str::to_string),
            actions: Vec::new(),
            category_id: None,
            channel_id: ChannelSettings::default().id,
        }
    }

    #[test]
    fn memory_renderer_routes_taps_through_latest_handler() {
        let renderer = MemoryLocalRenderer::default();
        let obj: &dyn LocalNotificationRenderer = &renderer;
        let first_hits = Rc::new(Cell::new(0));
        let second_hits = Rc::new(Cell::new(0));

        let hits = first_hits.clone();
        block_on(obj.initialize(
            &RendererSettings::default(),
            Rc::new(move |_: NotificationResponse| hits.set(hits.get() + 1)),
        ))
        .expect("initialize");
        let hits = second_hits.clone();
        block_on(obj.initialize(
            &RendererSettings::default(),
            Rc::new(move |_: NotificationResponse| hits.set(hits.get() + 1)),
        ))
        .expect("reinitialize");

        assert!(renderer.tap(NotificationResponse::default()));
        assert_eq!(first_hits.get(), 0);
        assert_eq!(second_hits.get(), 1);
        assert_eq!(renderer.initialize_calls(), 2);
    }

    #[test]
    fn memory_renderer_tap_shown_carries_payload_and_action() {
        let renderer = MemoryLocalRenderer::default();
        let obj: &dyn LocalNotificationRenderer = &renderer;
        let seen: Rc<RefCell<Option<NotificationResponse>>> = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        block_on(obj.initialize(
            &RendererSettings::default(),
            Rc::new(move |response: NotificationResponse| *sink.borrow_mut() = Some(response)),
        ))
        .expect("initialize");
        block_on(obj.show(&notification(7, Some("{\"route\":\"/x\"}")))).expect("show");

        let id = NotificationId::new(7).expect("positive id");
        assert!(renderer.tap_shown(id, Some("reply")));
        let response = seen.borrow().clone().expect("tap delivered");
        assert_eq!(response.id, Some(id));
        assert_eq!(response.action_id.as_deref(), Some("reply"));
        assert_eq!(response.payload.as_deref(), Some("{\"route\":\"/x\"}"));

        let unknown = NotificationId::new(8).expect("positive id");
        assert!(!renderer.tap_shown(unknown, None));
    }

    #[test]
    fn memory_renderer_scripted_failures_surface_as_errors() {
        let renderer = MemoryLocalRenderer::default();
        let obj: &dyn LocalNotificationRenderer = &renderer;
        renderer.fail_initialize("no renderer");
        renderer.set_show_error(Some("display failed".to_string()));

        let init = block_on(obj.initialize(
            &RendererSettings::default(),
            Rc::new(|_: NotificationResponse| {}),
        ));
        assert_eq!(init, Err("no renderer".to_string()));
        assert!(!renderer.tap(NotificationResponse::default()));
        assert_eq!(
            block_on(obj.show(&notification(1, None))),
            Err("display failed".to_string())
        );
        assert!(renderer.shown().is_empty());
    }

    #[test]
    fn noop_renderer_succeeds_without_launch_details() {
        let obj: &dyn LocalNotificationRenderer = &NoopLocalRenderer;
        block_on(obj.show(&notification(1, None))).expect("show");
        assert_eq!(block_on(obj.request_permission()), Ok(None));
        assert_eq!(block_on(obj.launch_details()), Ok(None));
    }
}
