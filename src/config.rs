//! 配置文件加载

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub quark: QuarkConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

/// 目录遍历与 MD5 批量获取参数
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalkConfig {
    /// 列表接口每页条数（189 / 夸克协议均为 100）
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_checksum_batch_size")]
    pub checksum_batch_size: usize,
    /// 批次之间的间隔，避免触发夸克接口频控
    #[serde(default = "default_checksum_batch_delay_ms")]
    pub checksum_batch_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuarkConfig {
    /// 请求未携带 Cookie 时使用的默认夸克 Cookie
    #[serde(default = "default_quark_cookie")]
    pub cookie: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            checksum_batch_size: default_checksum_batch_size(),
            checksum_batch_delay_ms: default_checksum_batch_delay_ms(),
        }
    }
}

impl Default for QuarkConfig {
    fn default() -> Self {
        Self {
            cookie: default_quark_cookie(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> usize {
    100
}

fn default_checksum_batch_size() -> usize {
    10
}

fn default_checksum_batch_delay_ms() -> u64 {
    500
}

fn default_quark_cookie() -> String {
    std::env::var("QUARK_COOKIE").unwrap_or_default()
}

fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(5200)
}

impl Config {
    /// 读取配置文件；文件不存在时使用默认值（支持环境变量覆盖）
    pub fn load(path: &str) -> Result<Self> {
        let config: Config = if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.walk.page_size == 0 {
            return Err(anyhow!("walk.page_size 必须大于 0"));
        }
        if self.walk.checksum_batch_size == 0 {
            return Err(anyhow!("walk.checksum_batch_size 必须大于 0"));
        }
        Ok(())
    }

    pub fn browser_ua() -> &'static str {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
    }

    /// 夸克客户端 UA，下载接口只认桌面客户端
    pub fn quark_client_ua() -> &'static str {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) quark-cloud-drive/3.14.2 Chrome/112.0.5615.165 Electron/24.1.3.8 Safari/537.36 Channel/pckk_other_ch"
    }
}
