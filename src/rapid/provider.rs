//! 统一入口：按网盘类型分发

use tracing::info;

use super::types::{Manifest, ProviderId};
use super::{cloud189, quark};
use crate::error::ShareError;
use crate::AppState;

impl ProviderId {
    /// 解析分享链接并生成秒传 JSON
    ///
    /// `credential` 目前只有夸克使用（Cookie）。
    pub async fn resolve_share(
        self,
        state: &AppState,
        share_url: &str,
        password: &str,
        credential: Option<&str>,
    ) -> Result<Manifest, ShareError> {
        let manifest = match self {
            ProviderId::Cloud189 => cloud189::resolve_share(state, share_url, password).await?,
            ProviderId::Quark => quark::resolve_share(state, share_url, password, credential).await?,
        };

        let stats = manifest.stats();
        info!(
            "✅ [{}] 共 {} 个文件, 总大小 {} 字节, 含 MD5 {} 个",
            self, manifest.total_files_count, manifest.total_size, stats.with_md5
        );
        Ok(manifest)
    }

    /// 秒传 JSON 缺少 MD5 时给调用方的提示
    ///
    /// 189 的列表接口直接返回 MD5，只有夸克需要额外请求，Cookie 失效时会整体拿不到。
    pub fn checksum_warning(self, manifest: &Manifest) -> Option<String> {
        match self {
            ProviderId::Cloud189 => None,
            ProviderId::Quark => manifest.checksum_warning(),
        }
    }
}

/// 根据链接域名自动选择网盘
pub async fn resolve_share(
    state: &AppState,
    share_url: &str,
    password: &str,
    credential: Option<&str>,
) -> Result<Manifest, ShareError> {
    let provider = ProviderId::detect(share_url).ok_or_else(|| ShareError::InvalidLink {
        provider: "网盘",
        url: share_url.to_string(),
    })?;
    provider.resolve_share(state, share_url, password, credential).await
}
