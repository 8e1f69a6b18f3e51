//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Capability model
//! - [`Request`] / [`Response`] describe a message without naming its wire protocol
//! - [`Caller`] is the adapter a route uses to reach one backend
//! - [`RouterBlueprint`] is the resolved configuration a dispatcher is built from

mod blueprint;
mod caller;
mod error;
mod metadata;
mod protocol;
mod request;
mod response;

pub use blueprint::*;
pub use caller::Caller;
pub use error::*;
pub use metadata::{Metadata, BACKEND_KEY};
pub use protocol::Protocol;
pub use request::Request;
pub use response::Response;
