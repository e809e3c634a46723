//! Tap navigation: the route/type/fallback resolver and pluggable navigation handlers.

use std::{collections::BTreeMap, rc::Rc};

use notify_host::NotificationPayload;
use tracing::debug;

use crate::config::NavigationConfig;

/// Mapping from payload `type` values to routes.
pub type TypeRouteTable = BTreeMap<String, String>;

/// Host callback performing the actual navigation to a resolved route.
pub type NavigateCallback = Rc<dyn Fn(&str)>;

/// Pure payload → route resolution with a fixed priority order.
///
/// 1. a string `route` key wins outright;
/// 2. otherwise a string `type` key found in the type table maps to its route;
/// 3. otherwise a non-empty payload falls back to the configured fallback route;
/// 4. otherwise nothing happens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationResolver {
    type_routes: TypeRouteTable,
    fallback_route: Option<String>,
}

impl NavigationResolver {
    /// Creates a resolver; an empty fallback route counts as no fallback.
    pub fn new(type_routes: TypeRouteTable, fallback_route: Option<String>) -> Self {
        Self {
            type_routes,
            fallback_route: fallback_route.filter(|route| !route.is_empty()),
        }
    }

    /// Creates a resolver from navigation config.
    pub fn from_config(config: &NavigationConfig) -> Self {
        Self::new(config.type_routes.clone(), config.fallback_route.clone())
    }

    /// Type table in use.
    pub fn type_routes(&self) -> &TypeRouteTable {
        &self.type_routes
    }

    /// Fallback route in use.
    pub fn fallback_route(&self) -> Option<&str> {
        self.fallback_route.as_deref()
    }

    /// Resolves the navigation target for `payload`, if any.
    pub fn resolve<'a>(&'a self, payload: &'a NotificationPayload) -> Option<&'a str> {
        if let Some(route) = payload.route() {
            return Some(route);
        }
        if let Some(route) = payload
            .notification_type()
            .and_then(|kind| self.type_routes.get(kind))
        {
            return Some(route.as_str());
        }
        match self.fallback_route.as_deref() {
            Some(fallback) if !payload.is_empty() => Some(fallback),
            _ => None,
        }
    }
}

/// Navigation capability invoked for every tapped notification.
///
/// Implementations produce zero or one navigation side effect per payload.
pub trait NavigationHandler {
    /// Handles a tapped notification payload.
    fn handle(&self, payload: &NotificationPayload);
}

impl<F> NavigationHandler for F
where
    F: Fn(&NotificationPayload),
{
    fn handle(&self, payload: &NotificationPayload) {
        self(payload)
    }
}

/// Built-in handler: resolves with a [`NavigationResolver`] and forwards the route.
#[derive(Clone)]
pub struct RouteNavigator {
    resolver: NavigationResolver,
    navigate: NavigateCallback,
}

impl RouteNavigator {
    /// Pairs a resolver with the host navigate callback.
    pub fn new(resolver: NavigationResolver, navigate: impl Fn(&str) + 'static) -> Self {
        Self {
            resolver,
            navigate: Rc::new(navigate),
        }
    }

    /// Resolver in use.
    pub fn resolver(&self) -> &NavigationResolver {
        &self.resolver
    }
}

impl std::fmt::Debug for RouteNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteNavigator")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl NavigationHandler for RouteNavigator {
    fn handle(&self, payload: &NotificationPayload) {
        match self.resolver.resolve(payload) {
            Some(route) => {
                debug!(route, "navigating from notification tap");
                (self.navigate)(route);
            }
            None => debug!("notification tap resolved to no navigation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn payload(value: serde_json::Value) -> NotificationPayload {
        NotificationPayload::from_serializable(&value).expect("object payload")
    }

    fn resolver(fallback: Option<&str>) -> NavigationResolver {
        let mut table = TypeRouteTable::new();
        table.insert("alert".to_string(), "/alerts".to_string());
        table.insert("chat".to_string(), "/chat".to_string());
        NavigationResolver::new(table, fallback.map(str::to_string))
    }

    #[test]
    fn string_route_wins_over_type_and_fallback() {
        let r = resolver(Some("/home"));
        assert_eq!(r.resolve(&payload(json!({"route": "/inbox"}))), Some("/inbox"));
        assert_eq!(
            r.resolve(&payload(json!({"route": "/inbox", "type": "alert"}))),
            Some("/inbox")
        );
    }

    #[test]
    fn mapped_type_resolves_when_route_absent_or_not_a_string() {
        let r = resolver(Some("/home"));
        assert_eq!(r.resolve(&payload(json!({"type": "alert"}))), Some("/alerts"));
        assert_eq!(
            r.resolve(&payload(json!({"route": 42, "type": "chat"}))),
            Some("/chat")
        );
    }

    #[test]
    fn fallback_applies_to_any_non_empty_unmatched_payload() {
        let r = resolver(Some("/home"));
        assert_eq!(r.resolve(&payload(json!({"userId": "123"}))), Some("/home"));
        assert_eq!(r.resolve(&payload(json!({"type": "unknown"}))), Some("/home"));
        assert_eq!(r.resolve(&payload(json!({"type": 5}))), Some("/home"));
        assert_eq!(r.resolve(&payload(json!({"route": null}))), Some("/home"));
    }

    #[test]
    fn empty_payload_never_navigates() {
        for fallback in [None, Some(""), Some("/home")] {
            assert_eq!(resolver(fallback).resolve(&NotificationPayload::new()), None);
        }
    }

    #[test]
    fn unmatched_payload_without_fallback_does_nothing() {
        assert_eq!(resolver(None).resolve(&payload(json!({"userId": "1"}))), None);
        assert_eq!(resolver(Some("")).resolve(&payload(json!({"userId": "1"}))), None);
        assert_eq!(resolver(Some("")).fallback_route(), None);
    }

    #[test]
    fn from_config_uses_table_and_fallback() {
        let mut config = NavigationConfig::default();
        config
            .type_routes
            .insert("promo".to_string(), "/deals".to_string());
        config.fallback_route = Some("/start".to_string());

        let r = NavigationResolver::from_config(&config);
        assert_eq!(r.resolve(&payload(json!({"type": "promo"}))), Some("/deals"));
        assert_eq!(r.resolve(&payload(json!({"x": 1}))), Some("/start"));
    }

    #[test]
    fn route_navigator_forwards_resolved_route_once() {
        let seen = Rc::new(RefCell::new(Vec::<String>::new()));
        let sink = seen.clone();
        let navigator = RouteNavigator::new(resolver(Some("/home")), move |route: &str| {
            sink.borrow_mut().push(route.to_string())
        });

        navigator.handle(&payload(json!({"type": "alert"})));
        navigator.handle(&NotificationPayload::new());
        navigator.handle(&payload(json!({"other": true})));

        assert_eq!(
            seen.borrow().clone(),
            vec!["/alerts".to_string(), "/home".to_string()]
        );
    }

    #[test]
    fn closures_act_as_navigation_handlers() {
        let count = Rc::new(RefCell::new(0));
        let counter = count.clone();
        let handler: Rc<dyn NavigationHandler> =
            Rc::new(move |_: &NotificationPayload| *counter.borrow_mut() += 1);
        handler.handle(&NotificationPayload::new());
        assert_eq!(*count.borrow(), 1);
    }
}
