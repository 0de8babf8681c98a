//! 分享目录递归遍历
//!
//! 各网盘只需实现 [`ListingSource`]（按页获取列表、可选的 MD5 补全），
//! 分页、递归、路径拼接在这里统一处理。

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::types::{DirectoryPage, FileItem, FileRecord};
use crate::error::ShareError;

#[async_trait]
pub trait ListingSource: Send + Sync {
    /// 获取某个目录的第 `page` 页（从 1 开始）
    async fn list_page(
        &self,
        folder_id: &str,
        page: u32,
        page_size: usize,
    ) -> Result<DirectoryPage, ShareError>;

    /// 为列表中缺少 MD5 的文件补全 MD5，返回 文件 id → MD5
    ///
    /// 失败的文件不出现在结果中或映射为空字符串，不能中断遍历。
    async fn recover_checksums(&self, _files: &[FileItem]) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// 从根目录开始深度优先遍历，返回所有文件
///
/// 只有根目录第一页失败时返回错误；其余目录/页失败时停止该目录的分页，
/// 已收集的文件保留，继续处理其他目录。
pub async fn walk<S>(source: &S, root_folder_id: &str, page_size: usize) -> Result<Vec<FileRecord>, ShareError>
where
    S: ListingSource + ?Sized,
{
    let files = walk_folder(source, root_folder_id.to_string(), String::new(), page_size, true).await?;
    info!("📁 遍历完成: 共 {} 个文件", files.len());
    Ok(files)
}

fn walk_folder<'a, S>(
    source: &'a S,
    folder_id: String,
    path: String,
    page_size: usize,
    is_root: bool,
) -> BoxFuture<'a, Result<Vec<FileRecord>, ShareError>>
where
    S: ListingSource + ?Sized,
{
    async move {
        let mut files = Vec::new();
        let mut page: u32 = 1;

        loop {
            debug!("📡 列表: folder={}, page={}, path=\"{}\"", folder_id, page, path);

            let listing = match source.list_page(&folder_id, page, page_size).await {
                Ok(listing) => listing,
                Err(e) if is_root && page == 1 => return Err(e),
                Err(e) => {
                    warn!("⚠️ 目录 \"{}\" 第 {} 页获取失败，停止该目录: {}", path, page, e);
                    break;
                }
            };

            let item_count = listing.item_count();
            debug!(
                "📋 找到: {} 个文件, {} 个文件夹",
                listing.files.len(),
                listing.folders.len()
            );

            let missing: Vec<FileItem> = listing
                .files
                .iter()
                .filter(|f| f.checksum.as_deref().map_or(true, str::is_empty))
                .cloned()
                .collect();
            let recovered = if missing.is_empty() {
                HashMap::new()
            } else {
                source.recover_checksums(&missing).await
            };

            for file in listing.files {
                let checksum = file
                    .checksum
                    .filter(|c| !c.is_empty())
                    .or_else(|| recovered.get(&file.id).cloned())
                    .unwrap_or_default()
                    .to_lowercase();
                files.push(FileRecord {
                    path: join_path(&path, &file.name),
                    checksum,
                    size: file.size,
                });
            }

            for folder in listing.folders {
                let folder_path = join_path(&path, &folder.name);
                debug!("📂 进入子文件夹: \"{}\", id={}", folder_path, folder.id);
                let sub_files = walk_folder(source, folder.id, folder_path, page_size, false).await?;
                files.extend(sub_files);
            }

            // 本页为空或不足一页即视为最后一页
            if item_count == 0 || item_count < page_size {
                break;
            }
            page += 1;
        }

        Ok(files)
    }
    .boxed()
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}
