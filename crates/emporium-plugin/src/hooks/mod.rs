//! Hook system: registry, dispatcher, hook point definitions, and the kernel cascade.

pub mod cascade;
pub mod definitions;
pub mod dispatcher;
pub mod registry;

pub use cascade::{HookCascade, RouteTable};
pub use definitions::{
    HookEvent, HookPhase, HookPoint, KernelEvent, RequestType, RouteMatch, Scope,
};
pub use dispatcher::{DispatchResult, HookDispatcher};
pub use registry::{HookListener, HookRegistry, ListenerInfo};
