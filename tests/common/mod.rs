//! 测试用的内存 HTTP 传输层

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use rapid_manifest::error::ShareError;
use rapid_manifest::http::{HttpRequest, HttpResponse, HttpTransport};
use rapid_manifest::{AppState, Config};

pub type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, ShareError> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub request: HttpRequest,
    pub at: Instant,
}

/// 按请求内容返回预设响应，并记录所有请求
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, ShareError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, needle: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.request.url.contains(needle))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ShareError> {
        self.requests.lock().unwrap().push(Recorded {
            request: request.clone(),
            at: Instant::now(),
        });
        (self.handler)(&request)
    }
}

pub fn state_with(transport: Arc<MockTransport>) -> AppState {
    let mut config = Config::default();
    config.quark.cookie = String::new();
    AppState::with_transport(config, transport)
}

pub fn respond(status: u16, body: impl Into<String>) -> Result<HttpResponse, ShareError> {
    Ok(HttpResponse {
        status,
        headers: Vec::new(),
        body: body.into(),
    })
}

pub fn respond_json(body: Value) -> Result<HttpResponse, ShareError> {
    respond(200, body.to_string())
}

/// 取 URL 中的查询参数（已解码）
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub fn body_json(request: &HttpRequest) -> Value {
    serde_json::from_str(request.body.as_deref().unwrap_or("null")).unwrap()
}
