//! Unified push/local notification lifecycle and tap navigation.
//!
//! `notify_runtime` coordinates a push transport and an on-device renderer (both supplied by
//! the host through [`notify_host::HostServices`]) behind one lifecycle:
//!
//! - [`Notifications::initialize`] negotiates permissions once per process.
//! - [`Notifications::listen`] binds push event streams once and reports a cold-start tap once.
//! - [`Notifications::send`] renders a local notification with optional payload and actions.
//!
//! Taps from either source reach the host `on_tap` callback and a [`NavigationHandler`]; the
//! built-in [`RouteNavigator`] resolves `route`, then `type`, then a configured fallback.
//!
//! Collaborator failures never escape: they are logged through `tracing` and the operation
//! degrades. The crate installs no subscriber.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod categories;
pub mod config;
pub mod facade;
pub mod lifecycle;
pub mod navigation;

pub use categories::{ActionCategoryRegistry, ActionSet, DEFAULT_CATEGORY_PREFIX};
pub use config::{ConfigError, NavigationConfig, NotifyConfig};
pub use facade::Notifications;
pub use lifecycle::{
    LifecycleState, ListenHandlers, NotificationLifecycle, OutgoingNotification,
    ReceiveCallback, TapCallback, TokenCallback,
};
pub use navigation::{
    NavigateCallback, NavigationHandler, NavigationResolver, RouteNavigator, TypeRouteTable,
};
