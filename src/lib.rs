//! A thin client for the WeCom ("WeChat Work") messaging API.
//!
//! The client obtains an access token for an application, caches it until it
//! expires, and sends structured messages to users, departments or tags.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let account = wxwork::config::Config::load_default()?.into_account();
//! let mut client = wxwork::WeComClient::new(account);
//!
//! client.send_text_to_users("hello", &["alice", "bob"]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! See [wecom::message::Message] for the supported message shapes.

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

pub mod config;
mod de;
pub mod wecom;

pub use wecom::{
    api::{WeComClient, API_BASE},
    auth::{AccessToken, Account},
    error::WeComError,
    message::{Message, SendReceipt},
};
