//! Low-level client for the site's public profile surfaces: page and API
//! requests with browser-like headers, proxy routing and raw wire types.

mod client;
mod errors;
pub mod types;
pub mod user_agent;
pub use self::client::{Client, RequestKind, RequestOptions, DEFAULT_BASE_URL, WEB_APP_ID};
pub use self::errors::Error;
