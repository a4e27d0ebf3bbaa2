pub mod manifest;
pub mod packager;

use crate::sku::GroupKey;

/// 1グループ分の組み立て済みPDF
#[derive(Debug, Clone)]
pub struct OutputDocument {
    pub key: GroupKey,
    /// 出力ファイル名（拡張子付き）
    pub file_name: String,
    /// 元PDFでのページ番号（0-indexed）
    pub pages: Vec<u32>,
    pub bytes: Vec<u8>,
}
