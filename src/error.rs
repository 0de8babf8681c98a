//! 错误类型

use thiserror::Error;

/// 解析分享链接过程中可能出现的错误
///
/// 在收集到第一个文件之前出现的错误会直接返回给调用方；
/// 递归遍历子目录时的错误只记录日志，不会出现在这里。
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("无效的{provider}分享链接: {url}")]
    InvalidLink { provider: &'static str, url: String },

    #[error("该分享需要提取码，或提取码错误: {0}")]
    AccessCodeRequired(String),

    #[error("分享不存在或已过期: {0}")]
    ShareNotFoundOrExpired(String),

    #[error("响应格式错误: {snippet}")]
    MalformedResponse { snippet: String },

    #[error("缺少凭据: {0}")]
    MissingCredential(&'static str),

    #[error("上游接口返回异常: code={code}, message={message}")]
    UpstreamProtocol { code: String, message: String },

    #[error("网络请求失败: {0}")]
    Transport(String),
}

impl ShareError {
    /// 截取响应体前 200 个字符用于诊断
    pub fn malformed(body: &str) -> Self {
        ShareError::MalformedResponse {
            snippet: body_prefix(body, 200).to_string(),
        }
    }

    pub fn upstream(code: impl ToString, message: impl Into<String>) -> Self {
        ShareError::UpstreamProtocol {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// 按字符截断（避免切在 UTF-8 多字节字符中间）
pub fn body_prefix(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
