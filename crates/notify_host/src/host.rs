//! Host platform posture and the collaborator bundle injected into the notification runtime.

use std::rc::Rc;

use futures::task::LocalSpawn;

use crate::{LocalNotificationRenderer, NoopLocalRenderer, NoopPushTransport, PushTransport};

/// Platform family the host is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    /// Android devices.
    Android,
    /// iOS and iPadOS devices.
    Ios,
    /// macOS desktops.
    MacOs,
    /// Browser runtime.
    Web,
    /// Other desktop hosts (Linux, Windows).
    Desktop,
}

impl HostPlatform {
    /// Returns a stable string token for diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::MacOs => "macos",
            Self::Web => "web",
            Self::Desktop => "desktop",
        }
    }

    /// Whether interactive notifications must reference a pre-registered action category.
    pub const fn requires_action_categories(self) -> bool {
        matches!(self, Self::Ios | Self::MacOs)
    }

    /// Whether notifications are posted into declared channels.
    pub const fn uses_channels(self) -> bool {
        matches!(self, Self::Android)
    }
}

/// Collaborators and scheduler handed to the notification runtime.
///
/// Concrete adapters are selected by the host before this bundle crosses into
/// `notify_runtime`, so the runtime never imports platform-specific types.
#[derive(Clone)]
pub struct HostServices {
    /// Cloud push-messaging client.
    pub push: Rc<dyn PushTransport>,
    /// On-device notification renderer.
    pub renderer: Rc<dyn LocalNotificationRenderer>,
    /// Single-threaded spawner that drives event-stream listeners.
    pub spawner: Rc<dyn LocalSpawn>,
    /// Platform posture.
    pub platform: HostPlatform,
}

impl HostServices {
    /// Bundles the given collaborators.
    pub fn new(
        push: Rc<dyn PushTransport>,
        renderer: Rc<dyn LocalNotificationRenderer>,
        spawner: Rc<dyn LocalSpawn>,
        platform: HostPlatform,
    ) -> Self {
        Self {
            push,
            renderer,
            spawner,
            platform,
        }
    }

    /// Bundle of no-op collaborators for unsupported targets.
    pub fn noop(spawner: Rc<dyn LocalSpawn>, platform: HostPlatform) -> Self {
        Self::new(
            Rc::new(NoopPushTransport),
            Rc::new(NoopLocalRenderer),
            spawner,
            platform,
        )
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}
