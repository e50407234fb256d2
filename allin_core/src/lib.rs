//! # AllIn poker core
//!
//! Everything one Texas Hold'em table needs, independent of any transport:
//! cards and the deck, hand evaluation, side pots, the betting engine, the
//! table manager, per-viewer views and the client/server messages.
//!
//! All state changes go through [`Table`]. It does no I/O and no locking, so
//! a server wraps each table in its own lock.

mod card;
mod error;
mod hand;
mod logic;
mod message;
mod pot;
mod state;
mod table;
mod view;

pub use card::*;

pub use error::*;

pub use hand::*;

pub use message::*;

pub use pot::*;

pub use state::*;

pub use table::*;

pub use view::*;
