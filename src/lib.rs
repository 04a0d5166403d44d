#![doc = "The `taskdeck` library crate."]
#![doc = ""]
#![doc = "Server side: identity and session tokens (`auth`), the task query engine and"]
#![doc = "mutation gateway (`tasks`), the payment ledger (`payments`), storage backends (`store`), routing and error mapping."]
#![doc = "Client side: `client` holds the session manager and the typed HTTP client that"]
#![doc = "front ends use to talk to the API."]
#![doc = ""]
#![doc = "The binary in `main.rs` wires these together into an actix-web server."]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod payments;
pub mod routes;
pub mod state;
pub mod store;
pub mod tasks;

pub use crate::error::AppError;
pub use crate::state::AppState;
