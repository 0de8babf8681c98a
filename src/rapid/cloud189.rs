//! 189 网盘（天翼云盘）分享解析
//!
//! 流程：提取分享码 → （有访问码时）checkAccessCode → 签名调用
//! getShareInfoByCodeV2 → listShareDir 递归遍历。189 的列表接口直接返回 MD5。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::decode::{code_string, decode, id_field, is_success_code};
use super::manifest::assemble;
use super::parser::parse_share_url;
use super::sign::{sign, CLOUD189_APP_KEY};
use super::types::{
    lenient_u64, string_or_number, DirectoryPage, FileItem, FolderItem, Manifest, ProviderId,
    ProviderMeta, ShareReference,
};
use super::walker::{walk, ListingSource};
use crate::config::Config;
use crate::error::{body_prefix, ShareError};
use crate::http::{HttpRequest, HttpResponse};
use crate::AppState;

const API_BASE: &str = "https://cloud.189.cn/api/open/share";
const REFERER: &str = "https://cloud.189.cn/web/main/";

/// 分享需要访问码
const RES_CODE_NEED_ACCESS_CODE: i64 = 40401;

/// 一次解析过程中的分享上下文
#[derive(Debug, Clone)]
pub struct Cloud189Context {
    pub share_id: String,
    pub share_code: String,
    pub root_file_id: String,
    pub share_mode: String,
    pub access_code: String,
}

/// 解析 189 分享链接，生成秒传 JSON
pub async fn resolve_share(
    state: &AppState,
    share_url: &str,
    password: &str,
) -> Result<Manifest, ShareError> {
    let share = parse_share_url(ProviderId::Cloud189, share_url)?;
    let access_code = share.effective_access_code(password);
    info!("📥 [189] 解析分享: code={}", share.share_code);

    let ctx = open_share(state, &share, &access_code).await?;
    info!(
        "📦 [189] 分享信息: shareId={}, fileId={}, shareMode={}",
        ctx.share_id, ctx.root_file_id, ctx.share_mode
    );

    let lister = Cloud189Lister { state, ctx: &ctx };
    let files = walk(&lister, &ctx.root_file_id, state.config.walk.page_size).await?;

    Ok(assemble(ProviderMeta::default(), files))
}

/// 握手：获取 shareId / 根目录 fileId / shareMode
pub async fn open_share(
    state: &AppState,
    share: &ShareReference,
    access_code: &str,
) -> Result<Cloud189Context, ShareError> {
    let mut share_id = share.share_code.clone();

    if !access_code.is_empty() {
        info!("🔐 [189] 验证访问码...");
        if let Some(id) = check_access_code(state, &share.share_code, access_code).await {
            debug!("✅ [189] checkAccessCode 返回 shareId={}", id);
            share_id = id;
        }
    }

    let info = get_share_info(state, &share.share_code, access_code).await?;

    let res_code = info.get("res_code").cloned().unwrap_or(Value::Null);
    if !is_success_code(&res_code) {
        let message = info
            .get("res_message")
            .and_then(Value::as_str)
            .unwrap_or("未知错误");
        return Err(classify_error(&res_code, message, access_code));
    }

    if let Some(id) = id_field(&info, "shareId") {
        if id != share.share_code {
            debug!("🔄 [189] getShareInfoByCodeV2 更新 shareId={}", id);
            share_id = id;
        }
    }

    let root_file_id = match id_field(&info, "fileId") {
        Some(id) => id,
        None => {
            let need_access_code = id_field(&info, "needAccessCode").as_deref() == Some("1");
            if need_access_code && access_code.is_empty() {
                return Err(ShareError::AccessCodeRequired("请输入提取码".into()));
            }
            return Err(ShareError::ShareNotFoundOrExpired(
                "获取189分享信息失败，可能是分享链接无效或已过期".into(),
            ));
        }
    };

    let share_mode = id_field(&info, "shareMode").unwrap_or_else(|| "0".to_string());

    Ok(Cloud189Context {
        share_id,
        share_code: share.share_code.clone(),
        root_file_id,
        share_mode,
        access_code: access_code.to_string(),
    })
}

/// 访问码校验：成功时返回真实 shareId，失败只记录日志
async fn check_access_code(state: &AppState, share_code: &str, access_code: &str) -> Option<String> {
    let url = format!(
        "{}/checkAccessCode.action?shareCode={}&accessCode={}",
        API_BASE,
        urlencoding::encode(share_code),
        urlencoding::encode(access_code)
    );

    let resp = match state.transport.send(json_get(url)).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!("⚠️ [189] checkAccessCode 请求失败，继续使用分享码: {}", e);
            return None;
        }
    };
    debug!("🔑 [189] checkAccessCode 响应: {}", body_prefix(&resp.body, 200));

    match decode(&resp.body) {
        Ok(data) => id_field(&data, "shareId"),
        Err(_) => {
            warn!("⚠️ [189] checkAccessCode 解析失败，继续使用分享码");
            None
        }
    }
}

/// 带签名的分享信息接口
async fn get_share_info(state: &AppState, share_code: &str, access_code: &str) -> Result<Value, ShareError> {
    let timestamp = chrono::Utc::now().timestamp_millis().to_string();
    let signature = sign(&[
        ("shareCode", share_code),
        ("accessCode", access_code),
        ("Timestamp", timestamp.as_str()),
        ("AppKey", CLOUD189_APP_KEY),
    ]);

    // 签名覆盖 Timestamp / AppKey，但它们只放在请求头里
    let url = format!(
        "{}/getShareInfoByCodeV2.action?shareCode={}&accessCode={}",
        API_BASE,
        urlencoding::encode(share_code),
        urlencoding::encode(access_code)
    );
    debug!("📡 [189] 请求分享信息: {}", url);

    let req = json_get(url)
        .header("Sign-Type", "1")
        .header("Signature", signature)
        .header("Timestamp", timestamp)
        .header("AppKey", CLOUD189_APP_KEY);

    let resp = state.transport.send(req).await?;
    debug!(
        "📨 [189] 响应状态: {}, 内容: {}",
        resp.status,
        body_prefix(&resp.body, 500)
    );

    decode(&resp.body)
}

/// 把 res_code 映射为错误类型
fn classify_error(res_code: &Value, message: &str, access_code: &str) -> ShareError {
    let code = code_string(res_code);

    if res_code.as_i64() == Some(RES_CODE_NEED_ACCESS_CODE) || code.contains("AccessCode") {
        let hint = if access_code.is_empty() {
            "该分享需要提取码，请输入提取码"
        } else {
            "提取码错误"
        };
        return ShareError::AccessCodeRequired(hint.to_string());
    }

    if code.contains("NotFound") || code.contains("Expired") || code.contains("Cancel") || code.contains("AuditNotPass") {
        return ShareError::ShareNotFoundOrExpired(format!("{} ({})", message, code));
    }

    ShareError::upstream(code, message)
}

#[derive(Debug, Deserialize)]
struct ListShareDirResponse {
    #[serde(default, rename = "fileListAO")]
    file_list_ao: Option<FileListAO>,
}

#[derive(Debug, Default, Deserialize)]
struct FileListAO {
    #[serde(default, rename = "fileList")]
    file_list: Vec<RawFile>,
    #[serde(default, rename = "folderList")]
    folder_list: Vec<RawFolder>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    size: u64,
    #[serde(default)]
    md5: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFolder {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    name: String,
}

struct Cloud189Lister<'a> {
    state: &'a AppState,
    ctx: &'a Cloud189Context,
}

#[async_trait]
impl ListingSource for Cloud189Lister<'_> {
    async fn list_page(
        &self,
        folder_id: &str,
        page: u32,
        page_size: usize,
    ) -> Result<DirectoryPage, ShareError> {
        let ctx = self.ctx;
        let page_num = page.to_string();
        let page_size = page_size.to_string();
        let params = [
            ("pageNum", page_num.as_str()),
            ("pageSize", page_size.as_str()),
            ("fileId", folder_id),
            ("shareDirFileId", folder_id),
            ("isFolder", "true"),
            ("shareId", ctx.share_id.as_str()),
            ("shareMode", ctx.share_mode.as_str()),
            ("iconOption", "5"),
            ("orderBy", "lastOpTime"),
            ("descending", "true"),
            ("accessCode", ctx.access_code.as_str()),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}/listShareDir.action?{}", API_BASE, query);

        let mut req = json_get(url);
        // 访问码以 share_<分享码> Cookie 的形式随列表请求提交
        if !ctx.share_code.is_empty() && !ctx.access_code.is_empty() {
            req = req.header("Cookie", format!("share_{}={}", ctx.share_code, ctx.access_code));
        }

        let resp = self.state.transport.send(req).await?;
        debug!(
            "📨 [189] listShareDir 响应状态: {}, 内容: {}",
            resp.status,
            body_prefix(&resp.body, 200)
        );

        parse_list_response(&resp, &ctx.access_code)
    }
}

fn parse_list_response(resp: &HttpResponse, access_code: &str) -> Result<DirectoryPage, ShareError> {
    if !resp.is_success() {
        // 错误状态码下的响应体通常仍带 res_code
        if let Ok(data) = decode(&resp.body) {
            if let Some(code) = data.get("res_code").filter(|c| !is_success_code(c)) {
                let message = data.get("res_message").and_then(Value::as_str).unwrap_or("");
                return Err(classify_error(code, message, access_code));
            }
        }
        return Err(ShareError::upstream(
            format!("HTTP {}", resp.status),
            body_prefix(&resp.body, 200),
        ));
    }

    let data = decode(&resp.body)?;
    let res_code = data.get("res_code").cloned().unwrap_or(Value::Null);
    if !is_success_code(&res_code) {
        let message = data
            .get("res_message")
            .and_then(Value::as_str)
            .unwrap_or("未知");
        return Err(classify_error(&res_code, message, access_code));
    }

    let parsed: ListShareDirResponse =
        serde_json::from_value(data).map_err(|_| ShareError::malformed(&resp.body))?;
    let listing = parsed.file_list_ao.unwrap_or_default();

    Ok(DirectoryPage {
        files: listing
            .file_list
            .into_iter()
            .map(|f| FileItem {
                id: f.id,
                name: f.name,
                size: f.size,
                checksum: f.md5.map(|m| m.to_lowercase()),
                checksum_token: None,
            })
            .collect(),
        folders: listing
            .folder_list
            .into_iter()
            .map(|f| FolderItem { id: f.id, name: f.name })
            .collect(),
    })
}

fn json_get(url: String) -> HttpRequest {
    HttpRequest::get(url)
        .header("Accept", "application/json;charset=UTF-8")
        .header("User-Agent", Config::browser_ua())
        .header("Referer", REFERER)
}
