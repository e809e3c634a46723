//! Notification lifecycle controller.
//!
//! [`NotificationLifecycle`] owns the shared state behind the three public operations:
//! `initialize` negotiates permissions once, `listen` binds push event streams and reports a
//! cold-start tap once per process, and `send` renders a local notification. Every collaborator
//! failure is logged and absorbed; callers only ever see the boolean from `initialize`.
//!
//! All guards (`initialization`, `streams_bound`, `cold_start_checked`) are flipped
//! synchronously before the first `.await` of the operation that owns them, so concurrent calls
//! on the single-threaded executor never duplicate work. Callbacks are read when an event is
//! delivered, never captured when `listen` runs.

use std::{
    cell::{Cell, RefCell},
    future::Future,
    rc::Rc,
};

use futures::{
    future::{AbortHandle, Abortable, FutureExt, LocalBoxFuture, Shared},
    task::LocalSpawnExt,
    StreamExt,
};
use notify_host::{
    decode_optional_payload, encode_payload, HostServices, LocalNotification, NotificationId,
    NotificationIdAllocator, NotificationPayload, NotificationResponse, RemoteMessage,
    TapHandler,
};
use tracing::{debug, info, warn};

use crate::{
    categories::{ActionCategoryRegistry, ActionSet},
    config::NotifyConfig,
    navigation::NavigationHandler,
};

/// Readiness of a [`NotificationLifecycle`]; only ever moves forward outside of tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    /// `initialize` has not completed.
    Uninitialized,
    /// Permissions were negotiated; sends are accepted.
    Initialized,
    /// Event streams are bound.
    Listening,
}

/// Callback for pushes received while the app is in the foreground.
pub type ReceiveCallback = Rc<dyn Fn(&RemoteMessage)>;
/// Callback for tapped notifications from either source.
pub type TapCallback = Rc<dyn Fn(&NotificationPayload)>;
/// Callback for refreshed push tokens.
pub type TokenCallback = Rc<dyn Fn(&str)>;

/// Host callbacks installed by `listen`; a later `listen` replaces all of them.
#[derive(Clone, Default)]
pub struct ListenHandlers {
    /// Foreground push callback.
    pub on_receive: Option<ReceiveCallback>,
    /// Tap callback.
    pub on_tap: Option<TapCallback>,
    /// Token refresh callback.
    pub on_token_refresh: Option<TokenCallback>,
    /// Navigation applied to every tap after `on_tap`.
    pub navigation: Option<Rc<dyn NavigationHandler>>,
}

impl ListenHandlers {
    /// Sets the foreground push callback.
    #[must_use]
    pub fn on_receive(mut self, callback: impl Fn(&RemoteMessage) + 'static) -> Self {
        self.on_receive = Some(Rc::new(callback));
        self
    }

    /// Sets the tap callback.
    #[must_use]
    pub fn on_tap(mut self, callback: impl Fn(&NotificationPayload) + 'static) -> Self {
        self.on_tap = Some(Rc::new(callback));
        self
    }

    /// Sets the token refresh callback.
    #[must_use]
    pub fn on_token_refresh(mut self, callback: impl Fn(&str) + 'static) -> Self {
        self.on_token_refresh = Some(Rc::new(callback));
        self
    }

    /// Sets the navigation handler.
    #[must_use]
    pub fn navigation(mut self, handler: impl NavigationHandler + 'static) -> Self {
        self.navigation = Some(Rc::new(handler));
        self
    }
}

impl std::fmt::Debug for ListenHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenHandlers")
            .field("on_receive", &self.on_receive.is_some())
            .field("on_tap", &self.on_tap.is_some())
            .field("on_token_refresh", &self.on_token_refresh.is_some())
            .field("navigation", &self.navigation.is_some())
            .finish()
    }
}

/// Local notification request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingNotification {
    /// Banner title.
    pub title: String,
    /// Banner body text.
    pub body: String,
    /// Payload returned on tap.
    pub data: Option<NotificationPayload>,
    /// Action button labels in display order.
    pub actions: Vec<String>,
}

impl OutgoingNotification {
    /// Creates a request without payload or actions.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_data(mut self, data: NotificationPayload) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets action button labels.
    #[must_use]
    pub fn with_actions<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = labels.into_iter().map(Into::into).collect();
        self
    }
}

type PendingInitialization = Shared<LocalBoxFuture<'static, bool>>;

struct LifecycleInner {
    services: HostServices,
    config: NotifyConfig,
    ids: NotificationIdAllocator,
    categories: ActionCategoryRegistry,
    state: Cell<LifecycleState>,
    permission_granted: Cell<Option<bool>>,
    initialization: RefCell<Option<PendingInitialization>>,
    renderer_ready: Cell<bool>,
    token: RefCell<Option<String>>,
    handlers: RefCell<ListenHandlers>,
    streams_bound: Cell<bool>,
    cold_start_checked: Cell<bool>,
    subscriptions: RefCell<Vec<AbortHandle>>,
}

/// Shared handle to the notification lifecycle; clones refer to the same state.
#[derive(Clone)]
pub struct NotificationLifecycle {
    inner: Rc<LifecycleInner>,
}

impl std::fmt::Debug for NotificationLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationLifecycle")
            .field("state", &self.inner.state.get())
            .field("platform", &self.inner.services.platform)
            .finish_non_exhaustive()
    }
}

impl NotificationLifecycle {
    /// Creates an uninitialized lifecycle over the given collaborators.
    pub fn new(services: HostServices, config: NotifyConfig) -> Self {
        let categories = ActionCategoryRegistry::new(config.category_prefix.clone());
        Self {
            inner: Rc::new(LifecycleInner {
                services,
                config,
                ids: NotificationIdAllocator::new(),
                categories,
                state: Cell::new(LifecycleState::Uninitialized),
                permission_granted: Cell::new(None),
                initialization: RefCell::new(None),
                renderer_ready: Cell::new(false),
                token: RefCell::new(None),
                handlers: RefCell::new(ListenHandlers::default()),
                streams_bound: Cell::new(false),
                cold_start_checked: Cell::new(false),
                subscriptions: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    /// Config in use.
    pub fn config(&self) -> &NotifyConfig {
        &self.inner.config
    }

    /// Whether the local renderer initialized successfully.
    pub fn renderer_ready(&self) -> bool {
        self.inner.renderer_ready.get()
    }

    /// Prepares both collaborators and negotiates permissions.
    ///
    /// Returns true only when both the renderer and the push transport granted permission.
    /// Repeated and concurrent calls share the first run's result.
    pub async fn initialize(&self) -> bool {
        if let Some(granted) = self.inner.permission_granted.get() {
            return granted;
        }
        let pending = self
            .inner
            .initialization
            .borrow_mut()
            .get_or_insert_with(|| {
                let inner = self.inner.clone();
                async move { inner.run_initialization().await }
                    .boxed_local()
                    .shared()
            })
            .clone();
        pending.await
    }

    /// Installs host callbacks, binds push event streams once, and reports a cold-start tap once.
    ///
    /// Does nothing before `initialize` has completed.
    pub async fn listen(&self, handlers: ListenHandlers) {
        let inner = &self.inner;
        if inner.state.get() < LifecycleState::Initialized {
            debug!("listen ignored: notifications not initialized");
            return;
        }

        *inner.handlers.borrow_mut() = handlers;
        let bind_streams = !inner.streams_bound.replace(true);
        let check_cold_start = !inner.cold_start_checked.replace(true);
        let bound = bind_streams && inner.bind_streams();
        if bind_streams && !bound {
            inner.streams_bound.set(false);
        }

        match inner
            .services
            .renderer
            .initialize(&inner.config.renderer, inner.tap_handler())
            .await
        {
            Ok(()) => inner.renderer_ready.set(true),
            Err(error) => warn!(%error, "failed to re-prime local notification renderer"),
        }

        if check_cold_start {
            inner.report_cold_start().await;
        }

        if bound {
            inner.advance(LifecycleState::Listening);
            info!("notification listeners bound");
        }
    }

    /// Shows a local notification; returns its id, or `None` when nothing was attempted.
    ///
    /// Rendering failures are logged and swallowed.
    pub async fn send(&self, notification: OutgoingNotification) -> Option<NotificationId> {
        if self.inner.state.get() < LifecycleState::Initialized {
            debug!("send ignored: notifications not initialized");
            return None;
        }
        self.inner.show(notification).await
    }

    /// Returns the cached push token, fetching it on first use.
    pub async fn token(&self) -> Option<String> {
        let inner = &self.inner;
        if inner.state.get() < LifecycleState::Initialized {
            return None;
        }
        let cached = inner.token.borrow().clone();
        if cached.is_some() {
            return cached;
        }
        match inner.services.push.token().await {
            Ok(Some(token)) => Some(inner.token.borrow_mut().get_or_insert(token).clone()),
            Ok(None) => None,
            Err(error) => {
                warn!(%error, "failed to fetch push token");
                None
            }
        }
    }

    /// Subscribes to a push topic; returns whether the transport accepted it.
    pub async fn subscribe_to_topic(&self, topic: &str) -> bool {
        if self.inner.state.get() < LifecycleState::Initialized {
            return false;
        }
        match self.inner.services.push.subscribe_to_topic(topic).await {
            Ok(()) => true,
            Err(error) => {
                warn!(topic, %error, "topic subscription failed");
                false
            }
        }
    }

    /// Unsubscribes from a push topic; returns whether the transport accepted it.
    pub async fn unsubscribe_from_topic(&self, topic: &str) -> bool {
        if self.inner.state.get() < LifecycleState::Initialized {
            return false;
        }
        match self.inner.services.push.unsubscribe_from_topic(topic).await {
            Ok(()) => true,
            Err(error) => {
                warn!(topic, %error, "topic unsubscription failed");
                false
            }
        }
    }

    /// Removes a shown notification.
    pub async fn cancel(&self, id: NotificationId) {
        if self.inner.state.get() < LifecycleState::Initialized {
            return;
        }
        if let Err(error) = self.inner.services.renderer.cancel(id).await {
            warn!(%id, %error, "failed to cancel notification");
        }
    }

    /// Removes every shown notification.
    pub async fn cancel_all(&self) {
        if self.inner.state.get() < LifecycleState::Initialized {
            return;
        }
        if let Err(error) = self.inner.services.renderer.cancel_all().await {
            warn!(%error, "failed to cancel notifications");
        }
    }

    /// Returns to [`LifecycleState::Uninitialized`], dropping caches, callbacks, and listeners.
    #[cfg(any(test, feature = "test-support"))]
    pub fn reset(&self) {
        let inner = &self.inner;
        for handle in inner.subscriptions.borrow_mut().drain(..) {
            handle.abort();
        }
        inner.state.set(LifecycleState::Uninitialized);
        inner.permission_granted.set(None);
        inner.initialization.borrow_mut().take();
        inner.renderer_ready.set(false);
        inner.token.borrow_mut().take();
        *inner.handlers.borrow_mut() = ListenHandlers::default();
        inner.streams_bound.set(false);
        inner.cold_start_checked.set(false);
        inner.ids.reset();
        inner.categories.clear();
    }
}

impl LifecycleInner {
    fn advance(&self, next: LifecycleState) {
        if self.state.get() < next {
            debug!(from = ?self.state.get(), to = ?next, "notification lifecycle advanced");
            self.state.set(next);
        }
    }

    async fn run_initialization(self: Rc<Self>) -> bool {
        let platform = self.services.platform;
        debug!(platform = platform.as_str(), "initializing notifications");
        let renderer = &self.services.renderer;
        let push = &self.services.push;

        let renderer_ready = match renderer
            .initialize(&self.config.renderer, self.tap_handler())
            .await
        {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "local notification renderer unavailable; continuing push-only");
                false
            }
        };
        self.renderer_ready.set(renderer_ready);

        if renderer_ready && platform.uses_channels() {
            if let Err(error) = renderer.create_channel(&self.config.channel).await {
                warn!(
                    channel = %self.config.channel.id,
                    %error,
                    "failed to create notification channel"
                );
            }
        }

        if let Err(error) = push
            .set_foreground_presentation(self.config.foreground)
            .await
        {
            warn!(%error, "failed to configure foreground presentation");
        }
        if let Err(error) = push.set_background_handler(log_background_message) {
            warn!(%error, "failed to register background message handler");
        }

        let local_granted = match renderer.request_permission().await {
            Ok(answer) => answer.unwrap_or(true),
            Err(error) => {
                warn!(%error, "local notification permission request failed");
                false
            }
        };
        let push_granted = match push.request_permission().await {
            Ok(status) => status.is_granted(),
            Err(error) => {
                warn!(%error, "push permission request failed");
                false
            }
        };

        let granted = local_granted && push_granted;
        self.permission_granted.set(Some(granted));
        self.advance(LifecycleState::Initialized);
        info!(granted, local_granted, push_granted, renderer_ready, "notifications initialized");
        granted
    }

    fn tap_handler(self: &Rc<Self>) -> TapHandler {
        let weak = Rc::downgrade(self);
        Rc::new(move |response: NotificationResponse| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_local_tap(response);
            }
        })
    }

    fn handle_local_tap(&self, response: NotificationResponse) {
        debug!(id = ?response.id, action = ?response.action_id, "local notification tapped");
        let payload = decode_optional_payload(response.payload.as_deref())
            .with_tap_response(response.action_id.as_deref(), response.input.as_deref());
        self.dispatch_tap(&payload);
    }

    fn dispatch_tap(&self, payload: &NotificationPayload) {
        let (on_tap, navigation) = {
            let handlers = self.handlers.borrow();
            (handlers.on_tap.clone(), handlers.navigation.clone())
        };
        if let Some(on_tap) = on_tap {
            on_tap(payload);
        }
        if let Some(navigation) = navigation {
            navigation.handle(payload);
        }
    }

    fn handle_opened_app(&self, message: RemoteMessage) {
        debug!(message_id = ?message.message_id, "push notification tapped");
        self.dispatch_tap(&message.data);
    }

    fn handle_token_refresh(&self, token: String) {
        debug!("push token refreshed");
        *self.token.borrow_mut() = Some(token.clone());
        let callback = self.handlers.borrow().on_token_refresh.clone();
        if let Some(callback) = callback {
            callback(&token);
        }
    }

    async fn handle_foreground_message(&self, message: RemoteMessage) {
        debug!(message_id = ?message.message_id, "foreground push message received");
        let callback = self.handlers.borrow().on_receive.clone();
        if let Some(callback) = callback {
            callback(&message);
        }

        if !self.config.show_foreground_banners {
            return;
        }
        let Some(visible) = message.notification else {
            return;
        };
        let mirrored = OutgoingNotification {
            title: visible.title.unwrap_or_default(),
            body: visible.body.unwrap_or_default(),
            data: Some(message.data).filter(|data| !data.is_empty()),
            actions: Vec::new(),
        };
        self.show(mirrored).await;
    }

    fn bind_streams(self: &Rc<Self>) -> bool {
        let push = &self.services.push;

        let weak = Rc::downgrade(self);
        let mut messages = push.message_stream();
        let foreground = async move {
            while let Some(message) = messages.next().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.handle_foreground_message(message).await;
            }
        };

        let weak = Rc::downgrade(self);
        let mut opened = push.opened_app_stream();
        let background_taps = async move {
            while let Some(message) = opened.next().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.handle_opened_app(message);
            }
        };

        let weak = Rc::downgrade(self);
        let mut tokens = push.token_refresh_stream();
        let token_refresh = async move {
            while let Some(token) = tokens.next().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.handle_token_refresh(token);
            }
        };

        let bound = self.spawn_listener(foreground)
            && self.spawn_listener(background_taps)
            && self.spawn_listener(token_refresh);
        if !bound {
            for handle in self.subscriptions.borrow_mut().drain(..) {
                handle.abort();
            }
        }
        bound
    }

    fn spawn_listener(&self, listener: impl Future<Output = ()> + 'static) -> bool {
        let (handle, registration) = AbortHandle::new_pair();
        let task = Abortable::new(listener, registration).map(|_| ());
        match self.services.spawner.spawn_local(task) {
            Ok(()) => {
                self.subscriptions.borrow_mut().push(handle);
                true
            }
            Err(error) => {
                warn!(%error, "failed to spawn notification listener");
                false
            }
        }
    }

    async fn report_cold_start(&self) {
        match self.services.push.initial_message().await {
            Ok(Some(message)) => {
                info!(message_id = ?message.message_id, "launched from push notification tap");
                self.dispatch_tap(&message.data);
                return;
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "failed to read initial push message"),
        }

        match self.services.renderer.launch_details().await {
            Ok(Some(details)) if details.launched_app => {
                info!("launched from local notification tap");
                let payload = decode_optional_payload(details.payload.as_deref());
                self.dispatch_tap(&payload);
            }
            Ok(_) => {}
            Err(error) => warn!(%error, "failed to read notification launch details"),
        }
    }

    async fn show(&self, request: OutgoingNotification) -> Option<NotificationId> {
        if !self.renderer_ready.get() {
            debug!("local renderer unavailable; notification not shown");
            return None;
        }
        let id = self.ids.next_id();

        let payload = request
            .data
            .as_ref()
            .and_then(|data| match encode_payload(data) {
                Ok(text) => Some(text),
                Err(error) => {
                    warn!(%id, %error, "payload dropped from notification");
                    None
                }
            });

        let action_set = ActionSet::from_labels(&request.actions);
        let actions = action_set
            .as_ref()
            .map(ActionSet::actions)
            .unwrap_or_default();

        let mut category_id = None;
        if let Some(action_set) = action_set
            .as_ref()
            .filter(|_| self.services.platform.requires_action_categories())
        {
            category_id = Some(
                match self
                    .categories
                    .ensure_registered(self.services.renderer.as_ref(), action_set)
                    .await
                {
                    Ok(category) => category,
                    Err(error) => {
                        warn!(%id, %error, "action category registration failed");
                        action_set.category_id(self.categories.prefix())
                    }
                },
            );
        }

        let notification = LocalNotification {
            id,
            title: request.title,
            body: request.body,
            payload,
            actions,
            category_id,
            channel_id: self.config.channel.id.clone(),
        };
        match self.services.renderer.show(&notification).await {
            Ok(()) => debug!(%id, "local notification shown"),
            Err(error) => warn!(%id, %error, "failed to show local notification"),
        }
        Some(id)
    }
}

fn log_background_message(message: &RemoteMessage) {
    debug!(message_id = ?message.message_id, "background push message received");
}
