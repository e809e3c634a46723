use std::rc::Rc;

use futures::{
    future::LocalFutureObj,
    task::{LocalSpawn, SpawnError},
};
use notify_host::{
    ActionCategory, ChannelSettings, HostPlatform, HostServices, LaunchDetails,
    LocalNotification, LocalNotificationRenderer, NoopLocalRenderer, NoopPushTransport,
    NotificationId, RendererFuture, RendererSettings, TapHandler,
};

use crate::WebLocalRenderer;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Compile-time selected host strategy for `notify_host_web` adapters.
pub enum HostStrategy {
    /// Browser-backed adapters.
    Browser,
    /// Placeholder adapters for desktop webviews without notification support.
    DesktopStub,
}

/// Returns the compile-time selected host strategy for the active build.
pub const fn selected_host_strategy() -> HostStrategy {
    #[cfg(feature = "desktop-host-stub")]
    {
        HostStrategy::DesktopStub
    }

    #[cfg(not(feature = "desktop-host-stub"))]
    {
        HostStrategy::Browser
    }
}

/// Returns the selected host strategy as a stable string token.
pub fn host_strategy_name() -> &'static str {
    match selected_host_strategy() {
        HostStrategy::Browser => "browser",
        HostStrategy::DesktopStub => "desktop-stub",
    }
}

/// Adapter enum that erases the concrete renderer behind [`LocalNotificationRenderer`].
#[derive(Debug, Clone)]
pub enum LocalRendererAdapter {
    /// Web Notifications API renderer.
    Browser(WebLocalRenderer),
    /// No-op fallback used when desktop notifications are intentionally stubbed.
    DesktopStub(NoopLocalRenderer),
}

impl LocalNotificationRenderer for LocalRendererAdapter {
    fn initialize<'a>(
        &'a self,
        settings: &'a RendererSettings,
        on_tap: TapHandler,
    ) -> RendererFuture<'a, Result<(), String>> {
        match self {
            Self::Browser(renderer) => renderer.initialize(settings, on_tap),
            Self::DesktopStub(renderer) => renderer.initialize(settings, on_tap),
        }
    }

    fn request_permission<'a>(&'a self) -> RendererFuture<'a, Result<Option<bool>, String>> {
        match self {
            Self::Browser(renderer) => renderer.request_permission(),
            Self::DesktopStub(renderer) => renderer.request_permission(),
        }
    }

    fn create_channel<'a>(
        &'a self,
        channel: &'a ChannelSettings,
    ) -> RendererFuture<'a, Result<(), String>> {
        match self {
            Self::Browser(renderer) => renderer.create_channel(channel),
            Self::DesktopStub(renderer) => renderer.create_channel(channel),
        }
    }

    fn register_categories<'a>(
        &'a self,
        categories: &'a [ActionCategory],
    ) -> RendererFuture<'a, Result<(), String>> {
        match self {
            Self::Browser(renderer) => renderer.register_categories(categories),
            Self::DesktopStub(renderer) => renderer.register_categories(categories),
        }
    }

    fn show<'a>(
        &'a self,
        notification: &'a LocalNotification,
    ) -> RendererFuture<'a, Result<(), String>> {
        match self {
            Self::Browser(renderer) => renderer.show(notification),
            Self::DesktopStub(renderer) => renderer.show(notification),
        }
    }

    fn cancel<'a>(&'a self, id: NotificationId) -> RendererFuture<'a, Result<(), String>> {
        match self {
            Self::Browser(renderer) => renderer.cancel(id),
            Self::DesktopStub(renderer) => renderer.cancel(id),
        }
    }

    fn cancel_all<'a>(&'a self) -> RendererFuture<'a, Result<(), String>> {
        match self {
            Self::Browser(renderer) => renderer.cancel_all(),
            Self::DesktopStub(renderer) => renderer.cancel_all(),
        }
    }

    fn launch_details<'a>(&'a self) -> RendererFuture<'a, Result<Option<LaunchDetails>, String>> {
        match self {
            Self::Browser(renderer) => renderer.launch_details(),
            Self::DesktopStub(renderer) => renderer.launch_details(),
        }
    }
}

/// Builds the local renderer adapter for the compile-time selected host strategy.
pub fn local_renderer() -> LocalRendererAdapter {
    match selected_host_strategy() {
        HostStrategy::Browser => LocalRendererAdapter::Browser(WebLocalRenderer::default()),
        HostStrategy::DesktopStub => LocalRendererAdapter::DesktopStub(NoopLocalRenderer),
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Spawner running listener tasks on the browser microtask queue.
pub struct WebSpawner;

impl LocalSpawn for WebSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(future);
            return Ok(());
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            drop(future);
            Err(SpawnError::shutdown())
        }
    }
}

/// Builds browser host services.
///
/// Push delivery is not wired in the browser, so the push side reports denied permission and
/// never emits events; local notifications still work.
pub fn build_host_services() -> HostServices {
    HostServices::new(
        Rc::new(NoopPushTransport),
        Rc::new(local_renderer()),
        Rc::new(WebSpawner),
        HostPlatform::Web,
    )
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use futures::task::LocalSpawnExt;

    use super::*;

    #[test]
    fn default_build_selects_browser_renderer() {
        assert_eq!(selected_host_strategy(), HostStrategy::Browser);
        assert_eq!(host_strategy_name(), "browser");
        assert!(matches!(local_renderer(), LocalRendererAdapter::Browser(_)));
    }

    #[test]
    fn browser_services_target_the_web_platform() {
        let services = build_host_services();
        assert_eq!(services.platform, HostPlatform::Web);
        assert!(!services.platform.requires_action_categories());
    }

    #[test]
    fn spawner_refuses_work_off_the_browser() {
        assert!(WebSpawner.spawn_local(async {}).is_err());
    }
}
