//! # Resource abstractions and specifications.
//!
//! This module provides the core resource-related types:
//! - [`Resource`] - trait for implementing a start/stop lifecycle
//! - [`ResourceFn`] - closure-backed resource implementation
//! - [`ResourceRef`] - shared reference to a resource (`Arc<dyn Resource>`)
//! - [`ResourceSpec`] - registration config bundling a resource with its stop timeout
//! - [`ResourceState`] - lifecycle state of a registered resource

mod resource;
mod resource_fn;
mod spec;
mod state;

pub use resource::{Instance, Resource, ResourceRef};
pub use resource_fn::ResourceFn;
pub use spec::ResourceSpec;
pub use state::ResourceState;
