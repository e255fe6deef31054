//! Services layer for the identity engine.
//!
//! Business logic for record creation (recipe adapters), account linking,
//! and identity resolution.

pub mod deadline;
pub mod error;
mod link_graph;
mod recipe;
mod resolver;

pub use deadline::Deadline;
pub use error::ServiceError;
pub use link_graph::LinkGraph;
pub use recipe::{
    EmailPasswordProvider, IdentityProvider, PasswordlessProvider, SignInUp, ThirdPartyProvider,
};
pub use resolver::IdentityResolver;
