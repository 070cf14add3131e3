pub mod auth;
pub mod contact;
pub mod error;
pub mod mail;
pub mod middleware;
pub mod password;
pub mod reset;
pub mod routes;
pub mod tokens;

pub use auth::{AppState, AppStateInner};
pub use routes::router;
