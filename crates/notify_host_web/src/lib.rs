//! Browser (`wasm32`) implementations of [`notify_host`] service contracts.
//!
//! Provides the Web Notifications API renderer, a microtask-queue spawner, and the
//! compile-time selected [`notify_host::HostServices`] bundle for browser hosts. Non-wasm
//! builds compile to inert adapters so the workspace tests on any target.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

/// Compile-time host-strategy selection and the browser host-services factory.
pub mod adapters;
pub mod notifications;

pub use adapters::{
    build_host_services, host_strategy_name, local_renderer, selected_host_strategy,
    HostStrategy, LocalRendererAdapter, WebSpawner,
};
pub use notifications::WebLocalRenderer;
