//! Discord HTTP interactions adapter
//!
//! Discord POSTs signed interaction payloads to `/interactions`; replies go
//! out through the REST API. No gateway connection is made.

pub mod interaction;
pub mod rest;
pub mod server;
pub mod surface;

pub use interaction::Interaction;
pub use rest::{DiscordRest, DISCORD_API_BASE};
pub use server::{router, serve, AppState};
pub use surface::InteractionSurface;
