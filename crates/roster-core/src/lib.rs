//! Core types and trait definitions for the Roster contact client.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The gateway, the credential store and the controller all depend on it.

pub mod api;
pub mod contact;
pub mod credential;
pub mod error;
pub mod query;
pub mod store;
pub mod token;

pub use error::{AuthError, Error, FieldErrors, Result};
