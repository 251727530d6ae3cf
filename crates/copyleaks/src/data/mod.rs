//! Immutable configuration and types.

mod config;
mod exchange;
mod payload;
mod progress;
mod scan_options;
mod token;

pub use config::{
    ApiConfig, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_HOST, DEFAULT_USER_AGENT, DEFAULT_VERSION,
};
pub use exchange::{HttpMethod, RequestParts, ResponseHead};
pub use payload::Payload;
pub use progress::Progress;
pub use scan_options::ScanOptions;
pub use token::{AccessToken, MemoryTokenStore, TokenStore, TOKEN_TIMESTAMP_FORMAT};
