//! Typed host contracts and shared models for notification delivery.
//!
//! This crate is the API boundary between the notification runtime and the platform services it
//! coordinates. It exposes the payload model and codec, the push-transport and local-renderer
//! service traits, display identifiers, and the host bundle. Browser adapters live in
//! `notify_host_web`; the lifecycle and routing logic lives in `notify_runtime`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod host;
pub mod ids;
pub mod payload;
pub mod push;
pub mod renderer;

pub use host::{HostPlatform, HostServices};
pub use ids::{NotificationId, NotificationIdAllocator};
pub use payload::{
    decode_optional_payload, decode_payload, encode_payload, normalize_action_id,
    NotificationPayload, PayloadError, ACTION_KEY, INPUT_KEY, ROUTE_KEY, TYPE_KEY,
};
pub use push::{
    BackgroundHandler, ForegroundPresentation, MemoryPushTransport, NoopPushTransport,
    PushAuthorization, PushFuture, PushTransport, RemoteMessage, RemoteNotification,
};
pub use renderer::{
    ActionCategory, ChannelImportance, ChannelSettings, LaunchDetails, LocalNotification,
    LocalNotificationRenderer, MemoryLocalRenderer, NoopLocalRenderer, NotificationAction,
    NotificationResponse, RendererFuture, RendererSettings, TapHandler,
};
