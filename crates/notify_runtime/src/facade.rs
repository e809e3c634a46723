//! Host-facing entry point composing the lifecycle controller with tap navigation.

use std::rc::Rc;

use notify_host::{HostServices, NotificationId, NotificationPayload};

use crate::{
    config::{ConfigError, NotifyConfig},
    lifecycle::{LifecycleState, ListenHandlers, NotificationLifecycle, OutgoingNotification},
    navigation::{NavigationHandler, NavigationResolver, RouteNavigator},
};

/// Unified push/local notification entry point owned by the host.
///
/// Every tap, whether from a push, a local notification, or a cold start, is handed to the
/// host `on_tap` callback and then to the configured [`NavigationHandler`].
#[derive(Clone)]
pub struct Notifications {
    lifecycle: NotificationLifecycle,
    navigation: Option<Rc<dyn NavigationHandler>>,
}

impl std::fmt::Debug for Notifications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifications")
            .field("lifecycle", &self.lifecycle)
            .field("navigation", &self.navigation.is_some())
            .finish()
    }
}

impl Notifications {
    /// Creates a facade navigating through the built-in route resolver.
    ///
    /// `navigate` receives the resolved route for every tap that resolves to one.
    pub fn new(
        services: HostServices,
        config: NotifyConfig,
        navigate: impl Fn(&str) + 'static,
    ) -> Self {
        let navigator = RouteNavigator::new(
            NavigationResolver::from_config(&config.navigation),
            navigate,
        );
        Self::with_navigation_handler(services, config, navigator)
    }

    /// Creates a facade with a caller-supplied navigation handler.
    pub fn with_navigation_handler(
        services: HostServices,
        config: NotifyConfig,
        handler: impl NavigationHandler + 'static,
    ) -> Self {
        Self {
            lifecycle: NotificationLifecycle::new(services, config),
            navigation: Some(Rc::new(handler)),
        }
    }

    /// Creates a facade that never navigates; taps only reach `on_tap`.
    pub fn without_navigation(services: HostServices, config: NotifyConfig) -> Self {
        Self {
            lifecycle: NotificationLifecycle::new(services, config),
            navigation: None,
        }
    }

    /// Parses JSON config and creates a facade with the built-in route resolver.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the config text is malformed or invalid.
    pub fn from_json_config(
        services: HostServices,
        raw_config: &str,
        navigate: impl Fn(&str) + 'static,
    ) -> Result<Self, ConfigError> {
        let config = NotifyConfig::from_json_str(raw_config)?;
        Ok(Self::new(services, config, navigate))
    }

    /// Underlying lifecycle controller.
    pub fn lifecycle(&self) -> &NotificationLifecycle {
        &self.lifecycle
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Negotiates permissions; see [`NotificationLifecycle::initialize`].
    pub async fn initialize(&self) -> bool {
        self.lifecycle.initialize().await
    }

    /// Installs host callbacks and binds event streams.
    ///
    /// The facade's navigation handler is used unless `handlers` already carries one.
    pub async fn listen(&self, mut handlers: ListenHandlers) {
        if handlers.navigation.is_none() {
            handlers.navigation = self.navigation.clone();
        }
        self.lifecycle.listen(handlers).await;
    }

    /// Shows a local notification with optional payload and action buttons.
    pub async fn send(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
        data: Option<NotificationPayload>,
        actions: &[&str],
    ) -> Option<NotificationId> {
        let mut notification =
            OutgoingNotification::new(title, body).with_actions(actions.iter().copied());
        notification.data = data;
        self.lifecycle.send(notification).await
    }

    /// Shows a prepared local notification.
    pub async fn send_notification(
        &self,
        notification: OutgoingNotification,
    ) -> Option<NotificationId> {
        self.lifecycle.send(notification).await
    }

    /// Returns the push token, fetching and caching it on first use.
    pub async fn token(&self) -> Option<String> {
        self.lifecycle.token().await
    }

    /// Subscribes to a push topic.
    pub async fn subscribe_to_topic(&self, topic: &str) -> bool {
        self.lifecycle.subscribe_to_topic(topic).await
    }

    /// Unsubscribes from a push topic.
    pub async fn unsubscribe_from_topic(&self, topic: &str) -> bool {
        self.lifecycle.unsubscribe_from_topic(topic).await
    }

    /// Removes a shown notification.
    pub async fn cancel(&self, id: NotificationId) {
        self.lifecycle.cancel(id).await;
    }

    /// Removes every shown notification.
    pub async fn cancel_all(&self) {
        self.lifecycle.cancel_all().await;
    }

    /// Returns to a fresh, uninitialized state.
    #[cfg(any(test, feature = "test-support"))]
    pub fn reset(&self) {
        self.lifecycle.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::{executor::LocalPool, task::LocalSpawn};
    use notify_host::{HostPlatform, MemoryLocalRenderer, MemoryPushTransport, RemoteMessage};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn services(
        pool: &LocalPool,
        push: &MemoryPushTransport,
        renderer: &MemoryLocalRenderer,
    ) -> HostServices {
        let spawner: Rc<dyn LocalSpawn> = Rc::new(pool.spawner());
        HostServices::new(
            Rc::new(push.clone()),
            Rc::new(renderer.clone()),
            spawner,
            HostPlatform::Android,
        )
    }

    #[test]
    fn send_builds_actions_from_labels() {
        let mut pool = LocalPool::new();
        let push = MemoryPushTransport::default();
        let renderer = MemoryLocalRenderer::default();
        let notifications = Notifications::without_navigation(
            services(&pool, &push, &renderer),
            NotifyConfig::default(),
        );

        pool.run_until(notifications.initialize());
        let data = NotificationPayload::new().with("route", "/inbox");
        let id =
            pool.run_until(notifications.send("Hi", "there", Some(data), &["Mark as Read"]));

        assert_eq!(id.map(NotificationId::get), Some(1));
        let shown = renderer.shown();
        assert_eq!(shown[0].actions[0].id, "mark_as_read");
        assert_eq!(shown[0].payload.as_deref(), Some(r#"{"route":"/inbox"}"#));
    }

    #[test]
    fn listener_navigation_overrides_facade_navigation() {
        let mut pool = LocalPool::new();
        let push = MemoryPushTransport::default();
        let renderer = MemoryLocalRenderer::default();
        let facade_routes = Rc::new(RefCell::new(Vec::<String>::new()));
        let sink = facade_routes.clone();
        let notifications = Notifications::new(
            services(&pool, &push, &renderer),
            NotifyConfig::default(),
            move |route: &str| sink.borrow_mut().push(route.to_string()),
        );
        let custom = Rc::new(RefCell::new(0));
        let counter = custom.clone();

        pool.run_until(notifications.initialize());
        pool.run_until(notifications.listen(
            ListenHandlers::default()
                .navigation(move |_: &NotificationPayload| *counter.borrow_mut() += 1),
        ));
        let data =
            NotificationPayload::from_serializable(&json!({"route": "/x"})).expect("payload");
        push.emit_opened_app(RemoteMessage::data_only(data));
        pool.run_until_stalled();

        assert_eq!(*custom.borrow(), 1);
        assert!(facade_routes.borrow().is_empty());
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        let pool = LocalPool::new();
        let push = MemoryPushTransport::default();
        let renderer = MemoryLocalRenderer::default();
        let result = Notifications::from_json_config(
            services(&pool, &push, &renderer),
            r#"{"category_prefix": "bad prefix"}"#,
            |_: &str| {},
        );
        assert!(matches!(result, Err(ConfigError::InvalidCategoryPrefix(_))));
    }
}
