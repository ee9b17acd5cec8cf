//! Hook point names, lifecycle phases, and the event payload handed to listeners.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use emporium_core::error::AppError;

/// Lifecycle phase raised by the HTTP kernel for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    /// The request has been routed and is about to be handled.
    Request,
    /// A controller has been selected.
    Controller,
    /// A response is ready to be sent.
    Response,
    /// Handling raised an exception.
    Exception,
    /// The response has been sent.
    Terminate,
}

impl HookPhase {
    /// All phases, in the order the kernel raises them on a successful request.
    pub const ALL: [HookPhase; 5] = [
        Self::Request,
        Self::Controller,
        Self::Response,
        Self::Exception,
        Self::Terminate,
    ];

    /// Returns the suffix used in hook point names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Controller => "controller",
            Self::Response => "response",
            Self::Exception => "exception",
            Self::Terminate => "terminate",
        }
    }

    /// Entry phases fire general hooks first; exit phases fire route hooks first.
    pub fn is_entry(&self) -> bool {
        matches!(self, Self::Request | Self::Controller)
    }

    /// Returns the hook points fired for this phase, in firing order.
    ///
    /// Does not include the `before-render` hook point, which the cascade
    /// fires separately ahead of the response phase.
    pub fn cascade(&self, route: &RouteMatch) -> Vec<HookPoint> {
        let global = HookPoint::Global(*self);
        let scoped = HookPoint::Scoped(route.scope, *self);
        let routed = HookPoint::Route(route.id.clone(), *self);

        if self.is_entry() {
            vec![global, scoped, routed]
        } else {
            vec![routed, scoped, global]
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HookPhase {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(Self::Request),
            "controller" => Ok(Self::Controller),
            "response" => Ok(Self::Response),
            "exception" => Ok(Self::Exception),
            "terminate" => Ok(Self::Terminate),
            other => Err(AppError::validation(format!("Unknown hook phase '{other}'"))),
        }
    }
}

/// Application area a route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Back-office routes.
    Admin,
    /// Storefront routes.
    Front,
}

impl Scope {
    /// Returns the scope segment used in hook point names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Front => "front",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "front" => Ok(Self::Front),
            other => Err(AppError::validation(format!("Unknown scope '{other}'"))),
        }
    }
}

/// A route matched by the kernel, with its scope fixed at route-table build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteMatch {
    /// Route identifier.
    pub id: String,
    /// Area the route belongs to.
    pub scope: Scope,
}

impl RouteMatch {
    /// Creates a route match.
    pub fn new(id: impl Into<String>, scope: Scope) -> Self {
        Self {
            id: id.into(),
            scope,
        }
    }
}

/// A named dispatch target of the request lifecycle.
///
/// The rendered names are the contract plugins bind against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// `global.{phase}`
    Global(HookPhase),
    /// `{admin|front}.{phase}`
    Scoped(Scope, HookPhase),
    /// `route.{route}.{phase}`
    Route(String, HookPhase),
    /// `route.{route}.before-render`
    BeforeRender(String),
}

impl HookPoint {
    /// Returns the hook point name listeners are registered under.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global(phase) => write!(f, "global.{phase}"),
            Self::Scoped(scope, phase) => write!(f, "{scope}.{phase}"),
            Self::Route(route, phase) => write!(f, "route.{route}.{phase}"),
            Self::BeforeRender(route) => write!(f, "route.{route}.before-render"),
        }
    }
}

/// Payload passed to listeners; the same value travels through a whole cascade,
/// so modifications made by one listener are visible to later ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookEvent {
    /// Name of the hook point currently being dispatched.
    pub name: String,
    /// Phase of the cascade this event belongs to, if any.
    pub phase: Option<HookPhase>,
    /// Matched route identifier, if any.
    pub route: Option<String>,
    /// Arbitrary data keyed by string.
    pub data: HashMap<String, serde_json::Value>,
    /// Set by a listener to skip the remaining listeners of the current hook point.
    #[serde(skip)]
    propagation_stopped: bool,
}

impl HookEvent {
    /// Creates an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a typed data value.
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Sets a data value in place.
    pub fn set(&mut self, key: &str, value: serde_json::Value) {
        self.data.insert(key.to_string(), value);
    }

    /// Gets a data value by key.
    pub fn get_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a string data value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Gets an i64 data value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }

    /// Gets a bool data value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }

    /// Skips the remaining listeners of the hook point being dispatched.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Whether a listener stopped propagation on the current hook point.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub(crate) fn begin(&mut self, name: &str) {
        self.name = name.to_string();
        self.propagation_stopped = false;
    }
}

/// Whether a kernel event belongs to the top-level request or a nested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// The top-level request of a processing session.
    #[default]
    Main,
    /// An internal sub-request (fragment rendering, forwards).
    Sub,
}

/// A lifecycle event raised by the HTTP kernel.
#[derive(Debug, Clone, Default)]
pub struct KernelEvent {
    /// The matched route, `None` before routing succeeded.
    pub route: Option<RouteMatch>,
    /// Main request or sub-request.
    pub request_type: RequestType,
    /// Payload shared by every hook point of the cascade.
    pub event: HookEvent,
}

impl KernelEvent {
    /// Creates an event for the main request on a matched route.
    pub fn main(route: RouteMatch) -> Self {
        Self {
            route: Some(route),
            request_type: RequestType::Main,
            event: HookEvent::new(),
        }
    }

    /// Creates an event for a request that has not been routed.
    pub fn unrouted() -> Self {
        Self::default()
    }

    /// Marks the event as belonging to a sub-request.
    pub fn as_sub_request(mut self) -> Self {
        self.request_type = RequestType::Sub;
        self
    }

    /// Replaces the payload.
    pub fn with_event(mut self, event: HookEvent) -> Self {
        self.event = event;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(points: &[HookPoint]) -> Vec<String> {
        points.iter().map(HookPoint::name).collect()
    }

    #[test]
    fn test_entry_phase_runs_general_to_specific() {
        let route = RouteMatch::new("r", Scope::Front);
        assert_eq!(
            names(&HookPhase::Request.cascade(&route)),
            vec!["global.request", "front.request", "route.r.request"]
        );
        assert_eq!(
            names(&HookPhase::Controller.cascade(&route)),
            vec!["global.controller", "front.controller", "route.r.controller"]
        );
    }

    #[test]
    fn test_exit_phase_runs_specific_to_general() {
        let route = RouteMatch::new("r", Scope::Admin);
        assert_eq!(
            names(&HookPhase::Response.cascade(&route)),
            vec!["route.r.response", "admin.response", "global.response"]
        );
        assert_eq!(
            names(&HookPhase::Exception.cascade(&route)),
            vec!["route.r.exception", "admin.exception", "global.exception"]
        );
        assert_eq!(
            names(&HookPhase::Terminate.cascade(&route)),
            vec!["route.r.terminate", "admin.terminate", "global.terminate"]
        );
    }

    #[test]
    fn test_before_render_name() {
        let point = HookPoint::BeforeRender("product_detail".to_string());
        assert_eq!(point.name(), "route.product_detail.before-render");
    }

    #[test]
    fn test_phase_and_scope_parse() {
        assert_eq!("terminate".parse::<HookPhase>().unwrap(), HookPhase::Terminate);
        assert_eq!("admin".parse::<Scope>().unwrap(), Scope::Admin);
        assert!("render".parse::<HookPhase>().is_err());
        assert!("backend".parse::<Scope>().is_err());
    }

    #[test]
    fn test_begin_resets_propagation() {
        let mut event = HookEvent::new();
        event.stop_propagation();
        assert!(event.is_propagation_stopped());

        event.begin("global.request");
        assert_eq!(event.name, "global.request");
        assert!(!event.is_propagation_stopped());
    }
}
