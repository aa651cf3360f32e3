//! Minimal credential-issuance service: account registration, login
//! verification and signed session tokens, plus a best-effort welcome
//! email on signup.

pub mod app;
pub mod auth;
pub mod config;
pub mod notify;
pub mod state;

pub use app::build_app;
pub use config::AppConfig;
pub use state::AppState;
