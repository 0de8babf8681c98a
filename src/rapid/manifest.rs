//! 秒传 JSON 组装

use super::types::{FileRecord, Manifest, ManifestStats, ProviderMeta};

/// 汇总文件列表，生成秒传 JSON
pub fn assemble(meta: ProviderMeta, files: Vec<FileRecord>) -> Manifest {
    let total_size = files.iter().map(|f| f.size).sum();
    Manifest {
        meta,
        common_path: String::new(),
        total_files_count: files.len(),
        total_size,
        files,
    }
}

impl Manifest {
    pub fn stats(&self) -> ManifestStats {
        let with_md5 = self.files.iter().filter(|f| !f.checksum.is_empty()).count();
        ManifestStats {
            total: self.files.len(),
            with_md5,
            without_md5: self.files.len() - with_md5,
        }
    }

    /// 没有任何文件拿到 MD5 时给出提示（空分享同样提示）
    pub fn checksum_warning(&self) -> Option<String> {
        if self.files.iter().any(|f| !f.checksum.is_empty()) {
            return None;
        }
        Some("⚠️ 未能获取任何文件的 MD5，Cookie 可能已失效或当前网络环境受限，生成的秒传 JSON 无法直接使用".to_string())
    }
}
