//! HTTP collaborators for the aggregation core
//!
//! [`Transport`] fetches the public advisory and pricing feeds;
//! [`ConsoleClient`] talks to the authenticated Spot console API.

pub mod console;
pub mod transport;

pub use console::{ConsoleClient, MarketScore, MarketScoreApi};
pub use transport::Transport;
