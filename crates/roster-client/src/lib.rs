//! Session and synchronisation core for the Roster contact client.
//!
//! - [`gateway::Gateway`] talks HTTP and attaches the bearer credential.
//! - [`session::SessionManager`] keeps that credential alive, refreshing it
//!   ahead of expiry and dropping it the moment it stops being valid.
//! - [`sync::ViewSync`] owns the visible contact collection and decides which
//!   fetches to start and which results to keep.
//! - [`roster::Roster`] wires the three together and drives the timers.

pub mod config;
pub mod gateway;
pub mod roster;
pub mod session;
pub mod sync;
mod wire;

#[cfg(test)]
mod testing;

pub use config::ClientConfig;
pub use gateway::Gateway;
pub use roster::{Command, Roster};
pub use session::{ExpiryWarning, LogoutReason, SessionManager, SessionPolicy, SessionState, TickOutcome};
pub use sync::{Applied, FetchMode, FetchRequest, FetchTag, ViewSync};
