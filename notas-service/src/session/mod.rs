//! Login flow and per-client interaction state.

mod handler;
mod state;
mod store;

pub use handler::{Interaction, InteractionHandler};
pub use store::SessionStore;
