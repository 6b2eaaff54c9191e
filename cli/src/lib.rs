pub mod auth_cmd;
pub mod progress;
