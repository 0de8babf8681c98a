//! 夸克网盘分享解析
//!
//! 流程：提取 pwd_id → sharepage/token 换取 stoken → sharepage/detail 递归遍历
//! → 下载接口批量补全 MD5。所有请求都需要调用方提供的 Cookie。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use super::decode::decode_json;
use super::manifest::assemble;
use super::parser::parse_share_url;
use super::quark_checksum::{self, FileRef};
use super::types::{
    lenient_u64, string_or_number, DirectoryPage, FileItem, FolderItem, Manifest, ProviderId,
    ProviderMeta, ShareReference,
};
use super::walker::{walk, ListingSource};
use crate::config::Config;
use crate::error::{body_prefix, ShareError};
use crate::http::{HttpRequest, HttpResponse};
use crate::AppState;

const API_BASE: &str = "https://pc-api.uc.cn/1/clouddrive/share/sharepage";
const REFERER: &str = "https://pan.quark.cn/";

/// 根目录的 pdir_fid
const ROOT_FID: &str = "0";

/// 秒传 JSON 的版本字段（与常用秒传脚本保持一致）
const SCRIPT_VERSION: &str = "3.0.3";
const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone)]
pub struct QuarkContext {
    pub share_id: String,
    pub stoken: String,
    pub cookie: String,
}

/// 解析夸克分享链接，生成秒传 JSON
///
/// `cookie` 为空时使用配置中的 `quark.cookie`。
pub async fn resolve_share(
    state: &AppState,
    share_url: &str,
    password: &str,
    cookie: Option<&str>,
) -> Result<Manifest, ShareError> {
    let share = parse_share_url(ProviderId::Quark, share_url)?;

    let cookie = cookie
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| Some(state.config.quark.cookie.trim().to_string()).filter(|c| !c.is_empty()))
        .ok_or(ShareError::MissingCredential("请输入夸克网盘 Cookie"))?;

    info!("📥 [夸克] 解析分享: pwd_id={}", share.share_code);
    let ctx = open_share(state, &share, &share.effective_access_code(password), cookie).await?;

    let lister = QuarkLister { state, ctx: &ctx };
    let files = walk(&lister, ROOT_FID, state.config.walk.page_size).await?;

    let meta = ProviderMeta {
        script_version: Some(SCRIPT_VERSION.to_string()),
        export_version: Some(EXPORT_VERSION.to_string()),
        uses_base62_etags_in_export: Some(false),
    };
    Ok(assemble(meta, files))
}

/// 换取 stoken
pub async fn open_share(
    state: &AppState,
    share: &ShareReference,
    passcode: &str,
    cookie: String,
) -> Result<QuarkContext, ShareError> {
    let req = HttpRequest::post(format!("{}/token?pr=ucpro&fr=pc", API_BASE))
        .json_body(&json!({
            "pwd_id": share.share_code,
            "passcode": passcode,
        }))
        .header("Cookie", cookie.as_str())
        .header("User-Agent", Config::browser_ua())
        .header("Referer", REFERER);

    let resp = state.transport.send(req).await?;
    debug!("🔑 [夸克] token 响应: {}", body_prefix(&resp.body, 200));

    let data = decode_json(&resp.body)?;
    check_code(&data)?;

    let stoken = data
        .pointer("/data/stoken")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ShareError::upstream(0, "token 响应缺少 stoken"))?
        .to_string();
    info!("✅ [夸克] 获取 stoken 成功");

    Ok(QuarkContext {
        share_id: share.share_code.clone(),
        stoken,
        cookie,
    })
}

/// code != 0 时按提示信息归类
fn check_code(data: &Value) -> Result<(), ShareError> {
    let code = data.get("code").and_then(Value::as_i64);
    if code == Some(0) {
        return Ok(());
    }

    let message = data
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("未知错误")
        .to_string();
    let lower = message.to_lowercase();

    if message.contains("提取码") || message.contains("密码") || lower.contains("passcode") {
        return Err(ShareError::AccessCodeRequired(message));
    }
    if ["不存在", "过期", "失效", "取消", "删除", "违规"]
        .iter()
        .any(|k| message.contains(k))
        || lower.contains("expired")
        || lower.contains("not found")
    {
        return Err(ShareError::ShareNotFoundOrExpired(message));
    }

    Err(ShareError::upstream(
        code.map(|c| c.to_string()).unwrap_or_else(|| "null".into()),
        message,
    ))
}

#[derive(Debug, Deserialize)]
struct DetailItem {
    #[serde(deserialize_with = "string_or_number")]
    fid: String,
    #[serde(default)]
    file_name: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    size: u64,
    #[serde(default)]
    dir: bool,
    #[serde(default)]
    share_fid_token: Option<String>,
    #[serde(default)]
    md5: Option<String>,
}

struct QuarkLister<'a> {
    state: &'a AppState,
    ctx: &'a QuarkContext,
}

#[async_trait]
impl ListingSource for QuarkLister<'_> {
    async fn list_page(
        &self,
        folder_id: &str,
        page: u32,
        page_size: usize,
    ) -> Result<DirectoryPage, ShareError> {
        let url = format!(
            "{}/detail?pwd_id={}&stoken={}&pdir_fid={}&_page={}&_size={}&pr=ucpro&fr=pc",
            API_BASE,
            urlencoding::encode(&self.ctx.share_id),
            urlencoding::encode(&self.ctx.stoken),
            urlencoding::encode(folder_id),
            page,
            page_size
        );

        let req = HttpRequest::get(url)
            .header("Cookie", self.ctx.cookie.as_str())
            .header("User-Agent", Config::browser_ua())
            .header("Referer", REFERER);

        let resp = self.state.transport.send(req).await?;
        debug!(
            "📨 [夸克] detail 响应状态: {}, 内容: {}",
            resp.status,
            body_prefix(&resp.body, 200)
        );

        parse_detail_response(&resp)
    }

    async fn recover_checksums(&self, files: &[FileItem]) -> HashMap<String, String> {
        let refs: Vec<FileRef> = files
            .iter()
            .map(|f| FileRef {
                fid: f.id.clone(),
                token: f.checksum_token.clone().unwrap_or_default(),
            })
            .collect();
        quark_checksum::recover(self.state, self.ctx, &refs).await
    }
}

fn parse_detail_response(resp: &HttpResponse) -> Result<DirectoryPage, ShareError> {
    let decoded = decode_json(&resp.body);
    if !resp.is_success() {
        if let Ok(data) = &decoded {
            check_code(data)?;
        }
        return Err(ShareError::upstream(
            format!("HTTP {}", resp.status),
            body_prefix(&resp.body, 200),
        ));
    }
    let data = decoded?;
    check_code(&data)?;

    let items: Vec<DetailItem> = match data.pointer("/data/list") {
        Some(list) => serde_json::from_value(list.clone()).map_err(|_| ShareError::malformed(&resp.body))?,
        None => Vec::new(),
    };

    let mut listing = DirectoryPage::default();
    for item in items {
        if item.dir {
            listing.folders.push(FolderItem {
                id: item.fid,
                name: item.file_name,
            });
        } else {
            listing.files.push(FileItem {
                id: item.fid,
                name: item.file_name,
                size: item.size,
                checksum: item.md5.filter(|m| !m.is_empty()),
                checksum_token: item.share_fid_token,
            });
        }
    }
    Ok(listing)
}
