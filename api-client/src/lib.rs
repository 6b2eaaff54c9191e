//! Client for the labs session API.

mod client;
mod error;
mod session;

pub use client::ApiClient;
pub use error::ApiError;
pub use session::Credentials;
pub use session::Session;
pub use session::SessionService;

pub use reqwest::StatusCode;
