//! JSON request/response types for the web API.
//!
//! All types live in the `hoopclock` lib so host clients can share them.

pub use hoopclock::{ActionResponse, GameAction, PostSettingsResponse, StatusResponse};
