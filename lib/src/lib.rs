pub mod clock;
pub mod controller;
pub mod ledger;
pub mod report;
pub mod rules;

mod api;
mod config;
mod event;
mod game_state;
mod host;
mod message;

pub use api::*;
pub use config::*;
pub use controller::{FinishReason, GameController, GameSettings, Step};
pub use event::*;
pub use game_state::*;
pub use host::*;
pub use message::*;
