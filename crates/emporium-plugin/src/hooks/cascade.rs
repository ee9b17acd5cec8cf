//! Kernel bridge: turns lifecycle phases into ordered hook point dispatches.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use emporium_core::result::AppResult;

use super::definitions::{HookPhase, HookPoint, KernelEvent, RequestType, RouteMatch, Scope};
use super::dispatcher::{DispatchResult, HookDispatcher};

/// Route identifiers and the scope each one was declared with.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Scope>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a route with an explicit scope.
    pub fn insert(&mut self, id: impl Into<String>, scope: Scope) -> &mut Self {
        self.routes.insert(id.into(), scope);
        self
    }

    /// Builds a table from route ids that only carry their area in their name.
    ///
    /// Ids starting with `admin_prefix` are declared `Admin`, the rest `Front`.
    /// The classification happens once here, never at dispatch time.
    pub fn with_prefix_rule<I, S>(admin_prefix: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for id in ids {
            let id = id.into();
            let scope = if id.starts_with(admin_prefix) {
                Scope::Admin
            } else {
                Scope::Front
            };
            table.insert(id, scope);
        }
        table
    }

    /// Returns the declared scope of a route.
    pub fn scope_of(&self, id: &str) -> Option<Scope> {
        self.routes.get(id).copied()
    }

    /// Resolves a matched route id; undeclared routes belong to the storefront.
    pub fn resolve(&self, id: &str) -> RouteMatch {
        let scope = self.scope_of(id).unwrap_or_else(|| {
            debug!(route = %id, "Route not declared in route table, using front scope");
            Scope::Front
        });
        RouteMatch::new(id, scope)
    }

    /// Number of declared routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is declared.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Fires the hook point cascade of each lifecycle phase.
#[derive(Debug, Clone)]
pub struct HookCascade {
    dispatcher: Arc<HookDispatcher>,
}

impl HookCascade {
    /// Creates a cascade over a dispatcher.
    pub fn new(dispatcher: Arc<HookDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Returns every hook point `handle` would fire for `phase` on `route`, in order.
    pub fn plan(phase: HookPhase, route: &RouteMatch) -> Vec<HookPoint> {
        let mut points = Vec::with_capacity(4);
        if phase == HookPhase::Response {
            points.push(HookPoint::BeforeRender(route.id.clone()));
        }
        points.extend(phase.cascade(route));
        points
    }

    /// Handles one lifecycle phase of a request.
    ///
    /// Sub-requests and unrouted requests fire nothing. The first listener
    /// error aborts the cascade and is returned.
    pub async fn handle(
        &self,
        phase: HookPhase,
        kernel: &mut KernelEvent,
    ) -> AppResult<Vec<DispatchResult>> {
        if kernel.request_type != RequestType::Main {
            return Ok(Vec::new());
        }

        let Some(route) = kernel.route.clone() else {
            return Ok(Vec::new());
        };

        debug!(phase = %phase, route = %route.id, scope = %route.scope, "Kernel phase");

        kernel.event.phase = Some(phase);
        kernel.event.route = Some(route.id.clone());

        let mut results = Vec::with_capacity(4);
        for point in Self::plan(phase, &route) {
            let result = self
                .dispatcher
                .dispatch(&point.name(), &mut kernel.event)
                .await?;
            results.push(result);
        }

        Ok(results)
    }

    /// Handles the request phase.
    pub async fn on_request(&self, kernel: &mut KernelEvent) -> AppResult<Vec<DispatchResult>> {
        self.handle(HookPhase::Request, kernel).await
    }

    /// Handles the controller phase.
    pub async fn on_controller(
        &self,
        kernel: &mut KernelEvent,
    ) -> AppResult<Vec<DispatchResult>> {
        self.handle(HookPhase::Controller, kernel).await
    }

    /// Handles the response phase, including the preceding `before-render` hook point.
    pub async fn on_response(&self, kernel: &mut KernelEvent) -> AppResult<Vec<DispatchResult>> {
        self.handle(HookPhase::Response, kernel).await
    }

    /// Handles the exception phase.
    pub async fn on_exception(
        &self,
        kernel: &mut KernelEvent,
    ) -> AppResult<Vec<DispatchResult>> {
        self.handle(HookPhase::Exception, kernel).await
    }

    /// Handles the terminate phase.
    pub async fn on_terminate(
        &self,
        kernel: &mut KernelEvent,
    ) -> AppResult<Vec<DispatchResult>> {
        self.handle(HookPhase::Terminate, kernel).await
    }
}
