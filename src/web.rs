//! Web 服务器模块

use anyhow::{anyhow, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

use crate::error::ShareError;
use crate::rapid::{Manifest, ManifestStats, ProviderId};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RapidRequest {
    #[serde(default)]
    pub share_url: String,
    #[serde(default)]
    pub share_password: String,
    #[serde(default)]
    pub cookie: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RapidResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rapid_transfer_json: Option<Manifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ManifestStats>,
}

impl RapidResponse {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            rapid_transfer_json: None,
            error: Some(message),
            warning: None,
            stats: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
}

/// 健康检查端点
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION,
    })
}

pub async fn rapid_189_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RapidRequest>,
) -> (StatusCode, Json<RapidResponse>) {
    handle_rapid(&state, ProviderId::Cloud189, req).await
}

pub async fn rapid_quark_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RapidRequest>,
) -> (StatusCode, Json<RapidResponse>) {
    handle_rapid(&state, ProviderId::Quark, req).await
}

async fn handle_rapid(
    state: &AppState,
    provider: ProviderId,
    req: RapidRequest,
) -> (StatusCode, Json<RapidResponse>) {
    info!("📥 收到 {} 秒传请求: {}", provider, req.share_url);

    if let Err(e) = validate_share_url(provider, &req.share_url) {
        warn!("❌ 分享链接验证失败: {}", e);
        return (
            StatusCode::BAD_REQUEST,
            Json(RapidResponse::failure(e.to_string())),
        );
    }

    match provider
        .resolve_share(state, &req.share_url, &req.share_password, req.cookie.as_deref())
        .await
    {
        Ok(manifest) => {
            let warning = provider.checksum_warning(&manifest);
            let stats = manifest.stats();
            (
                StatusCode::OK,
                Json(RapidResponse {
                    success: true,
                    rapid_transfer_json: Some(manifest),
                    error: None,
                    warning,
                    stats: Some(stats),
                }),
            )
        }
        Err(e) => {
            error!("❌ {} 解析失败: {}", provider, e);
            (status_for(&e), Json(RapidResponse::failure(e.to_string())))
        }
    }
}

fn status_for(err: &ShareError) -> StatusCode {
    match err {
        ShareError::InvalidLink { .. } | ShareError::MissingCredential(_) => StatusCode::BAD_REQUEST,
        ShareError::AccessCodeRequired(_) => StatusCode::FORBIDDEN,
        ShareError::ShareNotFoundOrExpired(_) => StatusCode::NOT_FOUND,
        ShareError::MalformedResponse { .. }
        | ShareError::UpstreamProtocol { .. }
        | ShareError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}

/// 验证分享链接格式
pub fn validate_share_url(provider: ProviderId, url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("缺少分享链接"));
    }

    let parsed = Url::parse(url.trim()).map_err(|_| anyhow!("无效的 URL 格式"))?;

    if !parsed.host_str().map_or(false, |h| provider.owns_host(h)) {
        return Err(anyhow!("必须是{}分享链接", provider));
    }

    Ok(())
}

/// 创建 Web 路由
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/189/rapid", post(rapid_189_handler))
        .route("/api/quark/rapid", post(rapid_quark_handler))
        .with_state(state)
}
