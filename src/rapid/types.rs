//! 数据类型

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// 支持的网盘
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Cloud189,
    Quark,
}

impl ProviderId {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderId::Cloud189 => "189网盘",
            ProviderId::Quark => "夸克网盘",
        }
    }

    /// 分享链接所属的根域名
    pub fn domain(&self) -> &'static str {
        match self {
            ProviderId::Cloud189 => "189.cn",
            ProviderId::Quark => "quark.cn",
        }
    }

    /// 主机名是否属于该网盘（根域名本身或其子域名）
    pub fn owns_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        let domain = self.domain();
        host == domain
            || host
                .strip_suffix(domain)
                .map_or(false, |prefix| prefix.ends_with('.'))
    }

    /// 根据链接主机名判断网盘类型（查询参数、路径里的域名不参与判断）
    pub fn detect(url: &str) -> Option<Self> {
        let url = url.trim();
        let parsed = Url::parse(url)
            .or_else(|_| Url::parse(&format!("https://{}", url)))
            .ok()?;
        let host = parsed.host_str()?;
        [ProviderId::Cloud189, ProviderId::Quark]
            .into_iter()
            .find(|p| p.owns_host(host))
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "189" | "cloud189" | "ctyun" => Ok(ProviderId::Cloud189),
            "quark" | "kuake" => Ok(ProviderId::Quark),
            other => Err(format!("不支持的网盘类型: {}", other)),
        }
    }
}

/// 从分享链接中解析出的分享标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReference {
    pub provider: ProviderId,
    pub share_code: String,
    /// 链接中自带的提取码（如 `?pwd=xxxx`）
    pub access_code: Option<String>,
}

impl ShareReference {
    /// 显式传入的密码优先，其次使用链接中的提取码
    pub fn effective_access_code(&self, password: &str) -> String {
        if !password.is_empty() {
            return password.to_string();
        }
        self.access_code.clone().unwrap_or_default()
    }
}

/// 列表接口返回的文件条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    pub id: String,
    pub name: String,
    pub size: u64,
    /// 列表接口直接给出的 MD5（189 有，夸克通常没有）
    pub checksum: Option<String>,
    /// 单独获取 MD5 时需要的文件令牌（夸克 share_fid_token）
    pub checksum_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderItem {
    pub id: String,
    pub name: String,
}

/// 列表接口的一页
#[derive(Debug, Clone, Default)]
pub struct DirectoryPage {
    pub files: Vec<FileItem>,
    pub folders: Vec<FolderItem>,
}

impl DirectoryPage {
    pub fn item_count(&self) -> usize {
        self.files.len() + self.folders.len()
    }
}

/// 秒传 JSON 中的单个文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    #[serde(rename = "etag")]
    pub checksum: String,
    pub size: u64,
}

/// 各网盘附加的元数据字段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses_base62_etags_in_export: Option<bool>,
}

/// 秒传 JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(flatten)]
    pub meta: ProviderMeta,
    pub common_path: String,
    pub files: Vec<FileRecord>,
    pub total_files_count: usize,
    pub total_size: u64,
}

/// 秒传 JSON 的 MD5 覆盖情况
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestStats {
    pub total: usize,
    pub with_md5: usize,
    pub without_md5: usize,
}

/// 反序列化：接口中的 id / size 可能是字符串，也可能是数字
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Num(n) => n.to_string(),
    })
}

/// 反序列化：文件大小可能是字符串或数字，缺失按 0 处理
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrU64 {
        Str(String),
        Num(u64),
        Null(Option<()>),
    }

    match StringOrU64::deserialize(deserializer)? {
        StringOrU64::Str(s) if s.trim().is_empty() => Ok(0),
        StringOrU64::Str(s) => s.trim().parse().map_err(Error::custom),
        StringOrU64::Num(n) => Ok(n),
        StringOrU64::Null(_) => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("189".parse::<ProviderId>(), Ok(ProviderId::Cloud189));
        assert_eq!("Quark".parse::<ProviderId>(), Ok(ProviderId::Quark));
        assert!("baidu".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_provider_detect() {
        assert_eq!(
            ProviderId::detect("https://cloud.189.cn/t/abc"),
            Some(ProviderId::Cloud189)
        );
        assert_eq!(
            ProviderId::detect("https://pan.quark.cn/s/abc"),
            Some(ProviderId::Quark)
        );
        assert_eq!(ProviderId::detect("https://example.com/s/abc"), None);

        // 只看主机名
        assert_eq!(
            ProviderId::detect("https://pan.quark.cn/s/abc123?from=cloud.189.cn"),
            Some(ProviderId::Quark)
        );
        assert_eq!(ProviderId::detect("https://example.com/?u=pan.quark.cn"), None);
        assert_eq!(ProviderId::detect("https://evil189.cn/t/abc"), None);
        assert_eq!(
            ProviderId::detect("h5.cloud.189.cn/share.html?code=abc"),
            Some(ProviderId::Cloud189)
        );
        assert_eq!(ProviderId::detect("not a url"), None);
    }

    #[test]
    fn test_owns_host() {
        assert!(ProviderId::Cloud189.owns_host("189.cn"));
        assert!(ProviderId::Cloud189.owns_host("cloud.189.cn"));
        assert!(ProviderId::Quark.owns_host("PAN.QUARK.CN"));
        assert!(!ProviderId::Cloud189.owns_host("evil189.cn"));
        assert!(!ProviderId::Quark.owns_host("notquark.cn"));
        assert!(!ProviderId::Quark.owns_host("quark.cn.example.com"));
    }

    #[test]
    fn test_effective_access_code_prefers_password() {
        let share = ShareReference {
            provider: ProviderId::Quark,
            share_code: "abc".into(),
            access_code: Some("url1".into()),
        };
        assert_eq!(share.effective_access_code("pass"), "pass");
        assert_eq!(share.effective_access_code(""), "url1");
    }

    #[test]
    fn test_manifest_serializes_rapid_transfer_shape() {
        let manifest = Manifest {
            meta: ProviderMeta::default(),
            common_path: String::new(),
            files: vec![FileRecord {
                path: "a.txt".into(),
                checksum: "d41d8cd98f00b204e9800998ecf8427e".into(),
                size: 0,
            }],
            total_files_count: 1,
            total_size: 0,
        };

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["commonPath"], "");
        assert_eq!(json["totalFilesCount"], 1);
        assert_eq!(json["files"][0]["etag"], "d41d8cd98f00b204e9800998ecf8427e");
        assert!(json.get("scriptVersion").is_none());
    }

    #[test]
    fn test_string_or_number_ids() {
        #[derive(Deserialize)]
        struct Item {
            #[serde(deserialize_with = "string_or_number")]
            id: String,
            #[serde(default, deserialize_with = "lenient_u64")]
            size: u64,
        }

        let a: Item = serde_json::from_str(r#"{"id":123,"size":"42"}"#).unwrap();
        assert_eq!(a.id, "123");
        assert_eq!(a.size, 42);

        let b: Item = serde_json::from_str(r#"{"id":"424803211905070152"}"#).unwrap();
        assert_eq!(b.id, "424803211905070152");
        assert_eq!(b.size, 0);
    }
}
