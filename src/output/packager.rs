// Phase 6: 出力: グループごとのPDFファイル、またはZIPアーカイブ

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::OutputDocument;
use super::manifest::{MANIFEST_FILE_NAME, Manifest};
use crate::config::job::OutputFormat;
use crate::sku::GroupKey;

/// ファイル名に使えない文字を `_` に置き換える。
pub fn sanitize_file_stem(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// グループキーの並びに対して重複しない出力ファイル名を割り当てる。
///
/// 大文字小文字だけが異なる名前も衝突とみなし、2件目以降に `-2`, `-3`... を付ける。
pub fn assign_file_names<'a>(
    keys: impl IntoIterator<Item = &'a GroupKey>,
    unidentified_name: &str,
) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();

    keys.into_iter()
        .map(|key| {
            let stem = match key {
                GroupKey::Sku(sku) => sanitize_file_stem(sku.as_str()),
                GroupKey::Unidentified => sanitize_file_stem(unidentified_name),
            };
            let mut name = format!("{stem}.pdf");
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{stem}-{n}.pdf");
                n += 1;
            }
            name
        })
        .collect()
}

/// 出力形式に応じて書き出し、作成したファイルのパスを返す。
pub fn package(
    format: OutputFormat,
    output: &Path,
    docs: &[OutputDocument],
    manifest: Option<&Manifest>,
) -> crate::error::Result<Vec<PathBuf>> {
    match format {
        OutputFormat::Directory => write_directory(output, docs, manifest),
        OutputFormat::Zip => {
            write_zip(output, docs, manifest)?;
            Ok(vec![output.to_path_buf()])
        }
    }
}

/// `dir` 以下にグループごとのPDF（と任意でmanifest.json）を書き出す。
pub fn write_directory(
    dir: &Path,
    docs: &[OutputDocument],
    manifest: Option<&Manifest>,
) -> crate::error::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(docs.len() + 1);
    for doc in docs {
        let path = dir.join(&doc.file_name);
        fs::write(&path, &doc.bytes)?;
        written.push(path);
    }

    if let Some(manifest) = manifest {
        let path = dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, manifest.to_json()?)?;
        written.push(path);
    }

    Ok(written)
}

/// 全グループのPDFを1つのZIPアーカイブにまとめる。
///
/// タイムスタンプを固定しているので、同じ入力からは同じアーカイブが得られる。
pub fn write_zip(
    path: &Path,
    docs: &[OutputDocument],
    manifest: Option<&Manifest>,
) -> crate::error::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for doc in docs {
        zip.start_file(doc.file_name.as_str(), options)?;
        zip.write_all(&doc.bytes)?;
    }

    if let Some(manifest) = manifest {
        zip.start_file(MANIFEST_FILE_NAME, options)?;
        zip.write_all(manifest.to_json()?.as_bytes())?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(())
}
