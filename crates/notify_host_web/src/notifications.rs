//! Local notification renderer backed by the Web Notifications API.
//!
//! Browser notifications have no channels, action categories, or reply input, so those
//! calls succeed without effect. Clicking a shown notification reports a body tap carrying
//! the payload attached at show time. A notification is held only until it is clicked,
//! closed, or cancelled. Outside `wasm32` notifications are tracked but never rendered.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use notify_host::{
    ActionCategory, ChannelSettings, LaunchDetails, LocalNotification, LocalNotificationRenderer,
    NotificationId, NotificationResponse, RendererFuture, RendererSettings, TapHandler,
};

struct ShownNotification {
    payload: Option<String>,
    #[cfg(target_arch = "wasm32")]
    notification: web_sys::Notification,
    #[cfg(target_arch = "wasm32")]
    _listeners: [wasm_bindgen::closure::Closure<dyn FnMut()>; 2],
}

impl ShownNotification {
    // Listeners are detached first so a late `close` event cannot release a newer entry.
    fn dismiss(self) {
        #[cfg(target_arch = "wasm32")]
        {
            self.notification.set_onclick(None);
            self.notification.set_onclose(None);
            self.notification.close();
        }
    }
}

#[derive(Default)]
struct RendererState {
    tap_handler: RefCell<Option<TapHandler>>,
    icon: RefCell<Option<String>>,
    shown: RefCell<BTreeMap<NotificationId, ShownNotification>>,
}

impl RendererState {
    /// Forgets `id`, returning the payload it was shown with.
    fn release(&self, id: NotificationId) -> Option<Option<String>> {
        let entry = self.shown.borrow_mut().remove(&id)?;
        let payload = entry.payload.clone();

        #[cfg(target_arch = "wasm32")]
        {
            // The entry owns the listener that may be running right now.
            wasm_bindgen_futures::spawn_local(async move { entry.dismiss() });
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            entry.dismiss();
        }
        Some(payload)
    }

    fn click(&self, id: NotificationId) -> bool {
        let Some(payload) = self.release(id) else {
            return false;
        };
        let handler = self.tap_handler.borrow().clone();
        if let Some(handler) = handler {
            handler(NotificationResponse {
                id: Some(id),
                action_id: None,
                input: None,
                payload,
            });
        }
        true
    }
}

#[derive(Clone, Default)]
/// Browser renderer showing one `Notification` per local notification.
pub struct WebLocalRenderer {
    state: Rc<RendererState>,
}

impl std::fmt::Debug for WebLocalRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebLocalRenderer")
            .field("initialized", &self.is_initialized())
            .field("icon", &self.state.icon.borrow())
            .field("visible", &self.visible())
            .finish_non_exhaustive()
    }
}

impl WebLocalRenderer {
    /// Whether `initialize` installed a tap handler.
    pub fn is_initialized(&self) -> bool {
        self.state.tap_handler.borrow().is_some()
    }

    /// Icon URL applied to shown notifications, if any.
    pub fn icon(&self) -> Option<String> {
        self.state.icon.borrow().clone()
    }

    /// Notifications shown and not yet clicked, closed, or cancelled.
    pub fn visible(&self) -> Vec<NotificationId> {
        self.state.shown.borrow().keys().copied().collect()
    }

    /// Reports a body tap for a shown notification and releases it.
    ///
    /// This is what the browser `click` listener runs. Returns `false` when `id` is no
    /// longer held.
    pub fn handle_click(&self, id: NotificationId) -> bool {
        self.state.click(id)
    }

    /// Releases a notification the user dismissed; what the browser `close` listener runs.
    pub fn handle_close(&self, id: NotificationId) -> bool {
        self.state.release(id).is_some()
    }

    #[cfg(target_arch = "wasm32")]
    fn render(&self, notification: &LocalNotification) -> Result<ShownNotification, String> {
        use wasm_bindgen::{closure::Closure, JsCast, JsValue};

        let options = web_sys::NotificationOptions::new();
        options.set_body(&notification.body);
        options.set_tag(&notification.id.to_string());
        if let Some(icon) = self.state.icon.borrow().as_deref() {
            options.set_icon(icon);
        }
        if let Some(payload) = notification.payload.as_deref() {
            options.set_data(&JsValue::from_str(payload));
        }
        let shown = web_sys::Notification::new_with_options(&notification.title, &options)
            .map_err(|err: JsValue| format!("notification dispatch failed: {err:?}"))?;

        let id = notification.id;
        let state = Rc::downgrade(&self.state);
        let on_click = Closure::<dyn FnMut()>::new(move || {
            if let Some(state) = state.upgrade() {
                state.click(id);
            }
        });
        let state = Rc::downgrade(&self.state);
        let on_close = Closure::<dyn FnMut()>::new(move || {
            if let Some(state) = state.upgrade() {
                state.release(id);
            }
        });
        shown.set_onclick(Some(on_click.as_ref().unchecked_ref()));
        shown.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(ShownNotification {
            payload: notification.payload.clone(),
            notification: shown,
            _listeners: [on_click, on_close],
        })
    }
}

// Platform resource names such as `@mipmap/ic_launcher` are not loadable URLs.
fn browser_icon(settings: &RendererSettings) -> Option<String> {
    let icon = settings.icon.trim();
    if icon.is_empty() || icon.starts_with('@') {
        None
    } else {
        Some(icon.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
fn notifications_supported() -> bool {
    use wasm_bindgen::JsValue;

    web_sys::window()
        .map(|window| {
            js_sys::Reflect::has(&window, &JsValue::from_str("Notification")).unwrap_or(false)
        })
        .unwrap_or(false)
}

impl LocalNotificationRenderer for WebLocalRenderer {
    fn initialize<'a>(
        &'a self,
        settings: &'a RendererSettings,
        on_tap: TapHandler,
    ) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async move {
            #[cfg(target_arch = "wasm32")]
            {
                if !notifications_supported() {
                    return Err("Notification API unavailable in this browser".to_string());
                }
            }
            *self.state.icon.borrow_mut() = browser_icon(settings);
            *self.state.tap_handler.borrow_mut() = Some(on_tap);
            Ok(())
        })
    }

    fn request_permission<'a>(&'a self) -> RendererFuture<'a, Result<Option<bool>, String>> {
        Box::pin(async move {
            #[cfg(target_arch = "wasm32")]
            {
                use wasm_bindgen::JsValue;
                use wasm_bindgen_futures::JsFuture;

                let promise: js_sys::Promise = web_sys::Notification::request_permission()
                    .map_err(|err: JsValue| format!("permission request failed: {err:?}"))?;
                let answer = JsFuture::from(promise)
                    .await
                    .map_err(|err| format!("permission request rejected: {err:?}"))?;
                return Ok(match answer.as_string().as_deref() {
                    Some("granted") => Some(true),
                    Some("denied") | Some("default") => Some(false),
                    _ => None,
                });
            }

            #[cfg(not(target_arch = "wasm32"))]
            {
                Ok(None)
            }
        })
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
        notification: &'a LocalNotification,
    ) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async move {
            #[cfg(target_arch = "wasm32")]
            let entry = self.render(notification)?;

            #[cfg(not(target_arch = "wasm32"))]
            let entry = {
                tracing::debug!(
                    id = %notification.id,
                    "browser notifications unavailable on this target"
                );
                ShownNotification {
                    payload: notification.payload.clone(),
                }
            };

            let replaced = self.state.shown.borrow_mut().insert(notification.id, entry);
            if let Some(previous) = replaced {
                previous.dismiss();
            }
            Ok(())
        })
    }

    fn cancel<'a>(&'a self, id: NotificationId) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.state.release(id);
            Ok(())
        })
    }

    fn cancel_all<'a>(&'a self) -> RendererFuture<'a, Result<(), String>> {
        Box::pin(async move {
            for id in self.visible() {
                self.state.release(id);
            }
            Ok(())
        })
    }

    fn launch_details<'a>(&'a self) -> RendererFuture<'a, Result<Option<LaunchDetails>, String>> {
        Box::pin(async { Ok(None) })
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn initialize_keeps_handler_and_only_url_icons() {
        let renderer = WebLocalRenderer::default();
        assert!(!renderer.is_initialized());

        block_on(renderer.initialize(
            &RendererSettings::default(),
            Rc::new(|_: NotificationResponse| {}),
        ))
        .expect("initialize");
        assert!(renderer.is_initialized());
        assert_eq!(renderer.icon(), None);

        let settings = RendererSettings {
            icon: "/icons/bell.png".to_string(),
            ..RendererSettings::default()
        };
        block_on(renderer.initialize(&settings, Rc::new(|_: NotificationResponse| {})))
            .expect("initialize");
        assert_eq!(renderer.icon().as_deref(), Some("/icons/bell.png"));
    }

    #[test]
    fn non_browser_target_reports_no_permission_signal_and_no_launch() {
        let renderer = WebLocalRenderer::default();
        assert_eq!(block_on(renderer.request_permission()), Ok(None));
        assert_eq!(block_on(renderer.launch_details()), Ok(None));
    }

    fn local(id: i32, payload: Option<&str>) -> LocalNotification {
        LocalNotification {
            id: NotificationId::new(id).expect("non-zero id"),
            title: "Title".to_string(),
            body: "Body".to_string(),
            payload: payload.map(str::to_string),
            actions: Vec::new(),
            category_id: None,
            channel_id: "default_channel".to_string(),
        }
    }

    #[test]
    fn clicked_and_closed_notifications_are_released() {
        let renderer = WebLocalRenderer::default();
        let taps = Rc::new(RefCell::new(Vec::<NotificationResponse>::new()));
        let sink = taps.clone();
        block_on(renderer.initialize(
            &RendererSettings::default(),
            Rc::new(move |response: NotificationResponse| sink.borrow_mut().push(response)),
        ))
        .expect("initialize");

        let first = local(1, Some(r#"{"route":"/inbox"}"#));
        let second = local(2, None);
        block_on(renderer.show(&first)).expect("show");
        block_on(renderer.show(&second)).expect("show");
        assert_eq!(renderer.visible(), vec![first.id, second.id]);

        assert!(renderer.handle_click(first.id));
        assert!(!renderer.handle_click(first.id));
        assert_eq!(renderer.visible(), vec![second.id]);
        assert_eq!(
            taps.borrow().clone(),
            vec![NotificationResponse {
                id: Some(first.id),
                action_id: None,
                input: None,
                payload: first.payload.clone(),
            }]
        );

        assert!(renderer.handle_close(second.id));
        assert!(!renderer.handle_close(second.id));
        assert!(renderer.visible().is_empty());
        assert_eq!(taps.borrow().len(), 1);
    }

    #[test]
    fn cancel_and_replacement_keep_one_entry_per_id() {
        let renderer = WebLocalRenderer::default();
        block_on(renderer.show(&local(1, Some("old")))).expect("show");
        block_on(renderer.show(&local(1, Some("new")))).expect("show");
        block_on(renderer.show(&local(2, None))).expect("show");
        assert_eq!(renderer.visible().len(), 2);

        block_on(renderer.cancel(NotificationId::new(2).expect("id"))).expect("cancel");
        assert_eq!(renderer.visible().len(), 1);

        block_on(renderer.cancel_all()).expect("cancel all");
        assert!(renderer.visible().is_empty());
        assert!(!renderer.handle_click(NotificationId::new(1).expect("id")));
    }
}
