// Phase 6: 実行結果マニフェスト（manifest.json）
//
// Records which source pages went into which output file, with a SHA-256
// digest of every written PDF so repeated runs can be compared.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::OutputDocument;
use crate::sku::GroupKey;

/// マニフェストのファイル名
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub input: String,
    pub page_count: u32,
    pub documents: Vec<ManifestEntry>,
    pub failed_groups: Vec<FailedGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    /// SKU。未識別バケットはNone。
    pub sku: Option<String>,
    pub file_name: String,
    pub pages: Vec<u32>,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedGroup {
    pub sku: Option<String>,
    pub pages: Vec<u32>,
    pub error: String,
}

impl Manifest {
    pub fn new(input: impl Into<String>, page_count: u32) -> Self {
        Manifest {
            input: input.into(),
            page_count,
            documents: Vec::new(),
            failed_groups: Vec::new(),
        }
    }

    pub fn record_document(&mut self, doc: &OutputDocument) {
        self.documents.push(ManifestEntry {
            sku: key_sku(&doc.key),
            file_name: doc.file_name.clone(),
            pages: doc.pages.clone(),
            sha256: sha256_hex(&doc.bytes),
        });
    }

    pub fn record_failure(&mut self, key: &GroupKey, pages: &[u32], error: impl ToString) {
        self.failed_groups.push(FailedGroup {
            sku: key_sku(key),
            pages: pages.to_vec(),
            error: error.to_string(),
        });
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn key_sku(key: &GroupKey) -> Option<String> {
    match key {
        GroupKey::Sku(sku) => Some(sku.to_string()),
        GroupKey::Unidentified => None,
    }
}

/// バイト列のSHA-256を小文字16進数で返す。
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
