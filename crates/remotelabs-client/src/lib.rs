//! Client library for the RemoteLabs virtual-lab API.
//!
//! Layers, leaf to root:
//!
//! - [`endpoints`] renders every path template against a base URL.
//! - [`client::ApiClient`] issues one request per API operation.
//! - [`session::SessionService`] tracks who is logged in and persists the
//!   session id through a [`persist::SessionPersistence`] backend.
//! - [`resources`] hold fetched list state per backend collection.
//! - [`actions`] perform single mutating operations and notify the outcome.
//! - [`creation::SubjectCreation`] is the multi-step subject workflow with
//!   rollback.
//! - [`monitor::ServerMonitor`] polls fleet health and keeps sample history.
//!
//! Every fallible operation returns [`Result`] with the one [`Error`] type.

pub mod actions;
pub mod client;
pub mod creation;
pub mod endpoints;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod persist;
pub mod resource;
pub mod resources;
pub mod session;

pub use client::{ApiClient, ApiConfig};
pub use error::{Error, Precondition, Result};

#[cfg(test)]
mod tests;
