//! Session management for checkroom.
//!
//! This crate is the synchronous core of the server. Nothing in it does
//! I/O or spawns tasks; time comes in as an explicit `now: Instant`.
//!
//! 1. **Session store** ([`SessionStore`]): every live game, by id
//! 2. **Turn authority** ([`authority`]): who may act on a session
//! 3. **Rules adapter** ([`Session::apply_move`]): drives the board and
//!    keeps `turn`, activity and result in step with it
//! 4. **Reconnection broker** ([`ReconnectionBroker`]): slot handover to
//!    a new connection
//! 5. **Connection registry** ([`ConnectionRegistry`]): connection →
//!    sessions, for the disconnect path
//! 6. **Reaper** ([`Reaper`]): idle eviction
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)        ← turns intents into calls on this crate
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Rules engine (below)  ← legal moves, check, mate, draw
//! ```

pub mod authority;
mod broker;
mod error;
mod reaper;
mod registry;
mod session;
mod store;

pub use broker::{ReconnectClaim, ReconnectMode, Reconnection, ReconnectionBroker};
pub use error::SessionError;
pub use reaper::Reaper;
pub use registry::ConnectionRegistry;
pub use session::{PlayerInfo, Session};
pub use store::SessionStore;
