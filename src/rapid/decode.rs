//! 响应解析
//!
//! 189 的接口偶尔返回 XML 格式的错误/状态文档，正常情况下返回 JSON；
//! JSON 中的文件 id 可能超过 16 位，需要先转成字符串再解析。

use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;
use tracing::debug;

use crate::error::ShareError;

/// 需要保持为字符串的 id 字段
const ID_KEYS: &[&str] = &["id", "fileId", "parentId", "shareId"];

/// 达到该位数的整数按字符串处理
const LARGE_INT_DIGITS: usize = 15;

/// XML 文档中需要提取的字段
const XML_TAGS: &[&str] = &[
    "res_code",
    "res_message",
    "shareId",
    "fileId",
    "shareMode",
    "isFolder",
    "needAccessCode",
    "fileName",
];

/// 解析响应体（XML 或 JSON）
pub fn decode(raw: &str) -> Result<Value, ShareError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('<') {
        debug!("📄 检测到 XML 响应");
        // 没有 res_code 的标记文档（登录页、网关错误页）不是状态文档
        return parse_xml_status(trimmed).ok_or_else(|| ShareError::malformed(raw));
    }

    decode_json(raw)
}

/// 只按 JSON 解析（夸克接口不会返回 XML，HTML 错误页应视为格式错误）
pub fn decode_json(raw: &str) -> Result<Value, ShareError> {
    let fixed = quote_large_ids(raw.trim());
    serde_json::from_str(&fixed).map_err(|e| {
        debug!("❌ JSON 解析失败: {}", e);
        ShareError::malformed(raw)
    })
}

/// 把 `"fileId":424803211905070152` 改写为 `"fileId":"424803211905070152"`
///
/// 只处理 [`ID_KEYS`] 中的字段，且位数不少于 15 位；已加引号的值不会再匹配。
pub fn quote_large_ids(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(&format!(
            r#""({})"\s*:\s*(\d{{{},}})(\s*[,}}\]])"#,
            ID_KEYS.join("|"),
            LARGE_INT_DIGITS
        ))
        .unwrap()
    });

    re.replace_all(text, r#""${1}":"${2}"${3}"#).into_owned()
}

/// 简易 XML 解析：只按标签名取值，缺少 res_code 时返回 None
fn parse_xml_status(xml: &str) -> Option<Value> {
    static TAG_RES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    let tag_res = TAG_RES.get_or_init(|| {
        XML_TAGS
            .iter()
            .map(|tag| {
                let re = Regex::new(&format!(r"(?is)<{0}>(.*?)</{0}>", regex::escape(tag))).unwrap();
                (*tag, re)
            })
            .collect()
    });

    let mut values: Map<String, Value> = Map::new();
    for (tag, re) in tag_res {
        if let Some(m) = re.captures(xml).and_then(|c| c.get(1)) {
            values.insert(tag.to_string(), Value::String(m.as_str().trim().to_string()));
        }
    }

    if !values.contains_key("res_code") {
        return None;
    }

    let text = |key: &str, default: &str| -> Value {
        match values.get(key).and_then(Value::as_str) {
            Some(s) if !s.is_empty() => json!(s),
            _ => json!(default),
        }
    };

    // 数字状态码按数字返回；189 有时返回 "ShareNotFound" 之类的字符串码，原样保留
    let res_code = match values.get("res_code").and_then(Value::as_str) {
        None | Some("") => json!(0),
        Some(s) => s.parse::<i64>().map(|n| json!(n)).unwrap_or_else(|_| json!(s)),
    };

    let is_folder = values
        .get("isFolder")
        .and_then(Value::as_str)
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    Some(json!({
        "res_code": res_code,
        "res_message": text("res_message", ""),
        "shareId": text("shareId", ""),
        "fileId": text("fileId", ""),
        "shareMode": text("shareMode", "0"),
        "isFolder": is_folder,
        "needAccessCode": text("needAccessCode", "0"),
        "fileName": text("fileName", ""),
    }))
}

/// 状态码是否表示成功（数字 0 或字符串 "0"）
pub fn is_success_code(code: &Value) -> bool {
    match code {
        Value::Number(n) => n.as_i64() == Some(0),
        Value::String(s) => s == "0",
        _ => false,
    }
}

/// 读取 id 类字段，兼容字符串与数字
pub fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 状态码转字符串（用于日志与错误信息）
pub fn code_string(code: &Value) -> String {
    match code {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
