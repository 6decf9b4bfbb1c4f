//! rsk is a risk-management record keeper: causes, risks, effects and plans
//! are linked into cause→risk→effect→plan chains, ranked by
//! `probability × impact`, and due plans are promoted into tasks.

pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod schedule;

/// Crate version, served at `GET /version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
