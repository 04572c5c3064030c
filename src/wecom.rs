//! Supports sending structured messages through a WeCom application.
//!
//! [api::WeComClient] is the entrypoint. It dispatches named operations
//! against the remote API, refreshing the application's access token as
//! needed (see [auth]).
//!
//! See [message::Message].

pub mod api;
pub mod auth;
pub mod error;
pub mod message;
