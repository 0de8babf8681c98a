//! 应用状态（配置 + HTTP 传输）

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::http::{HttpTransport, ReqwestTransport};

pub struct AppState {
    pub config: Config,
    pub transport: Arc<dyn HttpTransport>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.http.timeout_secs)?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
        })
    }

    /// 使用自定义传输层（测试或嵌入其他 HTTP 栈时使用）
    pub fn with_transport(config: Config, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }
}
