//! 网盘分享链接 → 秒传 JSON（189 网盘 / 夸克网盘）

pub mod config;
pub mod error;
pub mod http;
pub mod rapid;
pub mod state;
pub mod web;

pub use config::Config;
pub use error::ShareError;
pub use state::AppState;

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
