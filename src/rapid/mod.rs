//! 网盘分享 → 秒传 JSON

pub mod cloud189;
pub mod decode;
pub mod manifest;
pub mod parser;
pub mod provider;
pub mod quark;
pub mod quark_checksum;
pub mod sign;
pub mod types;
pub mod walker;

pub use manifest::assemble;
pub use parser::parse_share_url;
pub use provider::resolve_share;
pub use types::{FileRecord, Manifest, ManifestStats, ProviderId, ShareReference};
