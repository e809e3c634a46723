//! Action sets and the lazily-populated action-category registry.

use std::cell::RefCell;

use futures::lock::Mutex;
use notify_host::{
    normalize_action_id, ActionCategory, LocalNotificationRenderer, NotificationAction,
};
use sha2::{Digest, Sha256};

/// Prefix applied to derived category identifiers unless configured otherwise.
pub const DEFAULT_CATEGORY_PREFIX: &str = "actions_";

// ASCII unit separator; labels are single-line text.
const LABEL_SEPARATOR: &str = "\u{1f}";

/// Ordered, trimmed, non-empty action labels attached to one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSet {
    labels: Vec<String>,
}

impl ActionSet {
    /// Builds a set from raw labels, trimming each and dropping blanks.
    ///
    /// Returns `None` when no label survives.
    pub fn from_labels<I, S>(labels: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        if labels.is_empty() {
            None
        } else {
            Some(Self { labels })
        }
    }

    /// Trimmed labels in display order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Actions with normalized identifiers, in display order.
    pub fn actions(&self) -> Vec<NotificationAction> {
        self.labels
            .iter()
            .map(|label| NotificationAction {
                id: normalize_action_id(label),
                label: label.clone(),
            })
            .collect()
    }

    /// Deterministic, order-sensitive category identifier for this label sequence.
    pub fn category_id(&self, prefix: &str) -> String {
        let digest = Sha256::digest(self.labels.join(LABEL_SEPARATOR).as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        format!("{prefix}{}", to_base36(u64::from_be_bytes(head)))
    }

    /// Category declaration for this set.
    pub fn category(&self, prefix: &str) -> ActionCategory {
        ActionCategory {
            id: self.category_id(prefix),
            actions: self.actions(),
        }
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::with_capacity(13);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Registry of categories already declared to the renderer.
///
/// Platforms that need categories replace the whole set on every registration, so a new
/// category is registered together with every category known so far. A failed registration
/// leaves the registry unchanged and the next send retries it.
///
/// Registrations run one at a time: each declared set contains every category whose
/// registration finished before it, so overlapping sends cannot drop one another's category.
pub struct ActionCategoryRegistry {
    prefix: String,
    registered: RefCell<Vec<ActionCategory>>,
    registering: Mutex<()>,
}

impl std::fmt::Debug for ActionCategoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionCategoryRegistry")
            .field("prefix", &self.prefix)
            .field("registered", &self.registered.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for ActionCategoryRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORY_PREFIX)
    }
}

impl ActionCategoryRegistry {
    /// Creates an empty registry deriving ids with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            registered: RefCell::new(Vec::new()),
            registering: Mutex::new(()),
        }
    }

    /// Identifier prefix in use.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `category_id` has been registered successfully.
    pub fn is_registered(&self, category_id: &str) -> bool {
        self.registered
            .borrow()
            .iter()
            .any(|category| category.id == category_id)
    }

    /// Categories registered so far, in registration order.
    pub fn categories(&self) -> Vec<ActionCategory> {
        self.registered.borrow().clone()
    }

    /// Makes sure the category for `actions` is registered and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns the renderer error when registration fails.
    pub async fn ensure_registered(
        &self,
        renderer: &dyn LocalNotificationRenderer,
        actions: &ActionSet,
    ) -> Result<String, String> {
        let category = actions.category(&self.prefix);
        if self.is_registered(&category.id) {
            return Ok(category.id);
        }

        let _turn = self.registering.lock().await;
        // An overlapping call may have registered the same category while this one waited.
        if self.is_registered(&category.id) {
            return Ok(category.id);
        }

        let mut declared = self.categories();
        declared.push(category.clone());
        renderer.register_categories(&declared).await?;

        self.registered.borrow_mut().push(category.clone());
        Ok(category.id)
    }

    /// Forgets every registered category.
    pub fn clear(&self) {
        self.registered.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        future::Future,
        pin::Pin,
        task::{Context, Poll},
    };

    use futures::{executor::block_on, future::join};
    use notify_host::{
        ChannelSettings, LaunchDetails, LocalNotification, MemoryLocalRenderer, NotificationId,
        RendererFuture, RendererSettings, TapHandler,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    /// Suspends once before completing, like a platform call crossing an await point.
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                return Poll::Ready(());
            }
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    /// Memory renderer whose category registration suspends before recording.
    struct SuspendingRenderer(MemoryLocalRenderer);

    impl LocalNotificationRenderer for SuspendingRenderer {
        fn initialize<'a>(
            &'a self,
            settings: &'a RendererSettings,
            on_tap: TapHandler,
        ) -> RendererFuture<'a, Result<(), String>> {
            self.0.initialize(settings, on_tap)
        }

        fn request_permission<'a>(&'a self) -> RendererFuture<'a, Result<Option<bool>, String>> {
            self.0.request_permission()
        }

        fn create_channel<'a>(
            &'a self,
            channel: &'a ChannelSettings,
        ) -> RendererFuture<'a, Result<(), String>> {
            self.0.create_channel(channel)
        }

        fn register_categories<'a>(
            &'a self,
            categories: &'a [ActionCategory],
        ) -> RendererFuture<'a, Result<(), String>> {
            Box::pin(async move {
                YieldOnce(false).await;
                self.0.register_categories(categories).await
            })
        }

        fn show<'a>(
            &'a self,
            notification: &'a LocalNotification,
        ) -> RendererFuture<'a, Result<(), String>> {
            self.0.show(notification)
        }

        fn cancel<'a>(&'a self, id: NotificationId) -> RendererFuture<'a, Result<(), String>> {
            self.0.cancel(id)
        }

        fn cancel_all<'a>(&'a self) -> RendererFuture<'a, Result<(), String>> {
            self.0.cancel_all()
        }

        fn launch_details<'a>(
            &'a self,
        ) -> RendererFuture<'a, Result<Option<LaunchDetails>, String>> {
            self.0.launch_details()
        }
    }

    fn set(labels: &[&str]) -> ActionSet {
        ActionSet::from_labels(labels).expect("non-empty labels")
    }

    #[test]
    fn action_set_trims_and_drops_blank_labels() {
        let actions = set(&["  Reply ", "", "   ", "Mark as Read"]);
        assert_eq!(
            actions.labels().to_vec(),
            vec!["Reply".to_string(), "Mark as Read".to_string()]
        );
        assert_eq!(ActionSet::from_labels(["", " "]), None);
        assert_eq!(ActionSet::from_labels(Vec::<String>::new()), None);
    }

    #[test]
    fn actions_carry_normalized_ids() {
        let ids: Vec<String> = set(&["Mark as Read", "Reply"])
            .actions()
            .into_iter()
            .map(|action| action.id)
            .collect();
        assert_eq!(ids, vec!["mark_as_read".to_string(), "reply".to_string()]);
    }

    #[test]
    fn category_id_is_stable_prefixed_and_alphanumeric() {
        let first = set(&["Accept", "Decline"]).category_id(DEFAULT_CATEGORY_PREFIX);
        let again = set(&[" Accept", "Decline "]).category_id(DEFAULT_CATEGORY_PREFIX);
        assert_eq!(first, again);

        let suffix = first
            .strip_prefix(DEFAULT_CATEGORY_PREFIX)
            .expect("prefixed id");
        assert!(!suffix.is_empty());
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn category_id_changes_with_order_wording_and_membership() {
        let base = set(&["Accept", "Decline"]).category_id("p_");
        assert_ne!(base, set(&["Decline", "Accept"]).category_id("p_"));
        assert_ne!(base, set(&["Accept", "Reject"]).category_id("p_"));
        assert_ne!(base, set(&["Accept"]).category_id("p_"));
        assert_ne!(base, set(&["Accept", "Decline", "Later"]).category_id("p_"));
    }

    #[test]
    fn base36_renders_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u64::MAX), "3w5e11264sgsf");
    }

    #[test]
    fn registry_registers_new_categories_cumulatively_and_once() {
        let renderer = MemoryLocalRenderer::default();
        let registry = ActionCategoryRegistry::default();
        let yes_no = set(&["Yes", "No"]);
        let reply = set(&["Reply"]);

        let first = block_on(registry.ensure_registered(&renderer, &yes_no)).expect("register");
        let repeat = block_on(registry.ensure_registered(&renderer, &yes_no)).expect("reuse");
        let second = block_on(registry.ensure_registered(&renderer, &reply)).expect("register");

        assert_eq!(first, repeat);
        let registrations = renderer.category_registrations();
        assert_eq!(registrations.len(), 2);
        assert_eq!(registrations[0].len(), 1);
        let latest: Vec<&str> = registrations[1].iter().map(|c| c.id.as_str()).collect();
        assert_eq!(latest, vec![first.as_str(), second.as_str()]);
    }

    #[test]
    fn registry_retries_after_failed_registration() {
        let renderer = MemoryLocalRenderer::default();
        let registry = ActionCategoryRegistry::default();
        let actions = set(&["Snooze"]);

        renderer.set_category_error(Some("categories unsupported".to_string()));
        let err = block_on(registry.ensure_registered(&renderer, &actions)).expect_err("fails");
        assert_eq!(err, "categories unsupported");
        assert!(registry.categories().is_empty());

        renderer.set_category_error(None);
        let id = block_on(registry.ensure_registered(&renderer, &actions)).expect("register");
        assert!(registry.is_registered(&id));
        assert_eq!(renderer.category_registrations().len(), 1);
    }

    #[test]
    fn overlapping_registrations_keep_every_category() {
        let renderer = SuspendingRenderer(MemoryLocalRenderer::default());
        let registry = ActionCategoryRegistry::default();
        let yes_no = set(&["Yes", "No"]);
        let reply = set(&["Reply"]);

        let (first, second) = block_on(join(
            registry.ensure_registered(&renderer, &yes_no),
            registry.ensure_registered(&renderer, &reply),
        ));
        let first = first.expect("register");
        let second = second.expect("register");

        let registrations = renderer.0.category_registrations();
        let latest: Vec<&str> = registrations
            .last()
            .expect("registration")
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(latest, vec![first.as_str(), second.as_str()]);
        let known: Vec<String> = registry.categories().into_iter().map(|c| c.id).collect();
        assert_eq!(known, vec![first, second]);
    }

    #[test]
    fn overlapping_registrations_of_one_set_register_it_once() {
        let renderer = SuspendingRenderer(MemoryLocalRenderer::default());
        let registry = ActionCategoryRegistry::default();
        let yes_no = set(&["Yes", "No"]);

        let (first, second) = block_on(join(
            registry.ensure_registered(&renderer, &yes_no),
            registry.ensure_registered(&renderer, &yes_no),
        ));

        assert_eq!(first, second);
        assert_eq!(renderer.0.category_registrations().len(), 1);
        assert_eq!(registry.categories().len(), 1);
    }
}
