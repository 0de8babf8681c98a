//! 夸克网盘 MD5 批量获取
//!
//! 分享列表接口不返回 MD5，需要调用下载接口按批次获取。
//! 任何失败（Cookie 过期、非 JSON 响应、网络错误）都只会让该批文件的 MD5 为空。

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::decode::decode_json;
use super::quark::QuarkContext;
use crate::config::Config;
use crate::error::{body_prefix, ShareError};
use crate::http::HttpRequest;
use crate::AppState;

const DOWNLOAD_API: &str = "https://pc-api.uc.cn/1/clouddrive/file/download";

/// MD5 的字节长度
const DIGEST_LEN: usize = 16;

/// 需要获取 MD5 的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub fid: String,
    pub token: String,
}

/// 按批次获取 MD5，返回 fid → MD5（小写十六进制，失败为空字符串）
///
/// 每批之间等待 `checksum_batch_delay_ms`，第一批之前不等待。
pub async fn recover(state: &AppState, ctx: &QuarkContext, refs: &[FileRef]) -> HashMap<String, String> {
    let batch_size = state.config.walk.checksum_batch_size.max(1);
    let delay = Duration::from_millis(state.config.walk.checksum_batch_delay_ms);
    let mut checksums = HashMap::with_capacity(refs.len());

    for (i, batch) in refs.chunks(batch_size).enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }

        let found = match fetch_batch(state, ctx, batch).await {
            Ok(found) => found,
            Err(e) => {
                warn!("⚠️ [夸克] 第 {} 批 MD5 获取失败（Cookie 可能过期）: {}", i + 1, e);
                HashMap::new()
            }
        };

        for file in batch {
            let md5 = found.get(&file.fid).cloned().unwrap_or_default();
            checksums.insert(file.fid.clone(), md5);
        }
    }

    let recovered = checksums.values().filter(|v| !v.is_empty()).count();
    info!("🔑 [夸克] MD5 获取完成: {}/{}", recovered, refs.len());
    checksums
}

async fn fetch_batch(
    state: &AppState,
    ctx: &QuarkContext,
    batch: &[FileRef],
) -> Result<HashMap<String, String>, ShareError> {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let url = format!(
        "{}?pr=ucpro&fr=pc&uc_param_str=&__dt={}&__t={}",
        DOWNLOAD_API,
        (now_ms.rem_euclid(4) + 1) * 60 * 1000,
        now_ms
    );

    let fids: Vec<&str> = batch.iter().map(|f| f.fid.as_str()).collect();
    let tokens: Vec<&str> = batch.iter().map(|f| f.token.as_str()).collect();
    let body = json!({
        "fids": fids,
        "pwd_id": ctx.share_id,
        "stoken": ctx.stoken,
        "fids_token": tokens,
    });

    let req = HttpRequest::post(url)
        .json_body(&body)
        .header("Cookie", ctx.cookie.as_str())
        .header("User-Agent", Config::quark_client_ua())
        .header("Referer", "https://pan.quark.cn/")
        .header("Origin", "https://pan.quark.cn")
        .header("Accept", "application/json, text/plain, */*");

    let resp = state.transport.send(req).await?;
    debug!(
        "📨 [夸克] MD5 接口状态: {}, 响应: {}",
        resp.status,
        body_prefix(&resp.body, 100)
    );

    if !resp.is_success() {
        return Err(ShareError::upstream(
            format!("HTTP {}", resp.status),
            body_prefix(&resp.body, 100),
        ));
    }

    let data = decode_json(&resp.body)?;
    let code = data.get("code").and_then(Value::as_i64);
    if code != Some(0) {
        let message = data.get("message").and_then(Value::as_str).unwrap_or("未知");
        return Err(ShareError::upstream(
            code.map(|c| c.to_string()).unwrap_or_else(|| "null".into()),
            message,
        ));
    }

    let items = match data.get("data") {
        Some(Value::Array(items)) => items.clone(),
        Some(item @ Value::Object(_)) => vec![item.clone()],
        _ => return Err(ShareError::upstream(0, "响应缺少 data")),
    };

    let mut found = HashMap::new();
    for (idx, item) in items.iter().enumerate() {
        // 优先按返回的 fid 对应，没有时按顺序对应
        let fid = item
            .get("fid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| batch.get(idx).map(|f| f.fid.clone()));
        let Some(fid) = fid else { continue };

        let raw = item
            .get("md5")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| item.get("hash").and_then(Value::as_str))
            .unwrap_or("");
        let md5 = normalize_checksum(raw);
        if md5.is_empty() && !raw.is_empty() {
            debug!("⚠️ [夸克] fid={} MD5 格式无效: {}", fid, raw);
        }
        found.insert(fid, md5);
    }

    Ok(found)
}

/// MD5 统一为小写十六进制
///
/// 接口可能直接返回 32 位十六进制，也可能返回 Base64 编码的 16 字节摘要；
/// 解码后长度不是 16 字节的一律视为无效。
pub fn normalize_checksum(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    if raw.len() == DIGEST_LEN * 2 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return raw.to_ascii_lowercase();
    }

    match STANDARD.decode(raw) {
        Ok(bytes) if bytes.len() == DIGEST_LEN => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
        _ => String::new(),
    }
}
