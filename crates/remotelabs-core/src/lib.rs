//! Core types for the RemoteLabs virtual-lab platform.
//!
//! These are the entities as the client observes them through the REST API,
//! plus the request bodies both sides of the wire agree on. This crate is
//! deliberately free of HTTP dependencies; the client and the reference
//! backend both build on it.

pub mod error;
pub mod instance;
pub mod role;
pub mod server;
pub mod subject;
pub mod template;
pub mod user;
pub mod wire;

pub use error::{Error, Result};
