//! 分享链接解析

use regex::Regex;
use std::sync::OnceLock;

use super::types::{ProviderId, ShareReference};
use crate::error::ShareError;

/// 从分享链接中提取分享码
///
/// 支持：
/// - 189：`https://cloud.189.cn/t/xxxx`、`https://cloud.189.cn/web/share?code=xxxx`
/// - 夸克：`https://pan.quark.cn/s/xxxx`
///
/// 按顺序尝试各个格式，取第一个匹配的结果。
pub fn parse_share_url(provider: ProviderId, share_url: &str) -> Result<ShareReference, ShareError> {
    let url = share_url.trim();

    let share_code = patterns(provider)
        .iter()
        .find_map(|re| re.captures(url).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
        .filter(|code| is_valid_code(code))
        .ok_or_else(|| ShareError::InvalidLink {
            provider: provider.name(),
            url: url.to_string(),
        })?;

    Ok(ShareReference {
        provider,
        share_code,
        access_code: extract_access_code(provider, url),
    })
}

fn patterns(provider: ProviderId) -> &'static [Regex] {
    static CLOUD189: OnceLock<Vec<Regex>> = OnceLock::new();
    static QUARK: OnceLock<Vec<Regex>> = OnceLock::new();

    match provider {
        ProviderId::Cloud189 => CLOUD189
            .get_or_init(|| {
                vec![
                    Regex::new(r"/t/([a-zA-Z0-9]+)").unwrap(),
                    Regex::new(r"[?&]code=([a-zA-Z0-9]+)").unwrap(),
                ]
            })
            .as_slice(),
        ProviderId::Quark => QUARK
            .get_or_init(|| vec![Regex::new(r"/s/([a-zA-Z0-9]+)").unwrap()])
            .as_slice(),
    }
}

fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// 链接里附带的提取码
///
/// - 夸克网页复制的链接：`...?pwd=xxxx`
/// - 189 分享弹窗复制的文本：`https://cloud.189.cn/t/xxxx（访问码：abcd）`
fn extract_access_code(provider: ProviderId, url: &str) -> Option<String> {
    static QUARK_PWD: OnceLock<Regex> = OnceLock::new();
    static CLOUD189_CODE: OnceLock<Regex> = OnceLock::new();

    let re = match provider {
        ProviderId::Quark => {
            QUARK_PWD.get_or_init(|| Regex::new(r"[?&](?:pwd|passcode)=([a-zA-Z0-9]+)").unwrap())
        }
        ProviderId::Cloud189 => CLOUD189_CODE
            .get_or_init(|| Regex::new(r"访问码\s*[:：]\s*([a-zA-Z0-9]+)").unwrap()),
    };

    re.captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_189_path_form() {
        let share = parse_share_url(ProviderId::Cloud189, "https://cloud.189.cn/t/AbC123xyz").unwrap();
        assert_eq!(share.share_code, "AbC123xyz");
        assert_eq!(share.access_code, None);
    }

    #[test]
    fn test_parse_189_query_form() {
        let share = parse_share_url(
            ProviderId::Cloud189,
            "https://cloud.189.cn/web/share?code=Qr7nYz&from=web",
        )
        .unwrap();
        assert_eq!(share.share_code, "Qr7nYz");
    }

    #[test]
    fn test_parse_189_path_wins_over_query() {
        let share = parse_share_url(
            ProviderId::Cloud189,
            "https://cloud.189.cn/t/PathCode?code=QueryCode",
        )
        .unwrap();
        assert_eq!(share.share_code, "PathCode");
    }

    #[test]
    fn test_parse_189_embedded_access_code() {
        let share = parse_share_url(
            ProviderId::Cloud189,
            "https://cloud.189.cn/t/ZnUNfa（访问码：x1y2）",
        )
        .unwrap();
        assert_eq!(share.share_code, "ZnUNfa");
        assert_eq!(share.access_code.as_deref(), Some("x1y2"));
    }

    #[test]
    fn test_parse_quark() {
        let share = parse_share_url(ProviderId::Quark, "https://pan.quark.cn/s/1a2b3c4d5e?pwd=ab12").unwrap();
        assert_eq!(share.share_code, "1a2b3c4d5e");
        assert_eq!(share.access_code.as_deref(), Some("ab12"));
    }

    #[test]
    fn test_parse_stops_at_non_alphanumeric() {
        let share = parse_share_url(ProviderId::Quark, "https://pan.quark.cn/s/abc-def#/list").unwrap();
        assert_eq!(share.share_code, "abc");
    }

    #[test]
    fn test_parse_invalid() {
        let cases = [
            (ProviderId::Cloud189, ""),
            (ProviderId::Cloud189, "https://cloud.189.cn/web/main/"),
            (ProviderId::Cloud189, "https://cloud.189.cn/t/"),
            (ProviderId::Quark, "https://pan.quark.cn/list#/"),
            (ProviderId::Quark, "https://pan.quark.cn/s/-"),
            (ProviderId::Quark, "not-a-url"),
        ];

        for (provider, url) in cases {
            assert!(
                matches!(parse_share_url(provider, url), Err(ShareError::InvalidLink { .. })),
                "Should be invalid for {}: {}",
                provider,
                url
            );
        }
    }
}
