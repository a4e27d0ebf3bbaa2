use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, ObjectId};

use crate::pdf::region::Region;
use crate::pdf::text_layout::{PageOrigin, Word, extract_page_chars, group_words, region_text};
use crate::sku::grouping::PageTextSource;

/// MediaBoxの4隅（PDFネイティブ座標、下端基準）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageBox {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

pub struct PdfReader {
    doc: Document,
    /// ページ番号(1-indexed) → ObjectId。ページツリーの走査は開いた時の1回だけ。
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfReader {
    /// PDFファイルを開いてPdfReaderを作成する。
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let doc = Document::load(path)?;
        Ok(Self::from_document(doc))
    }

    /// メモリ上のPDFバイト列からPdfReaderを作成する。
    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(bytes)?;
        Ok(Self::from_document(doc))
    }

    fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages();
        Self { doc, pages }
    }

    /// 内部のlopdf Documentへの参照を返す。
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// 指定ページ辞書からMediaBoxを取得する（Parent経由の継承も考慮）。
    fn get_media_box(&self, dict: &lopdf::Dictionary) -> crate::error::Result<lopdf::Object> {
        // まず現在の辞書からMediaBoxを探す
        if let Ok(obj) = dict.get(b"MediaBox") {
            return Ok(obj.clone());
        }

        // 見つからなければParentをたどって継承を確認する
        if let Ok(lopdf::Object::Reference(parent_id)) = dict.get(b"Parent") {
            let parent_dict = self.doc.get_dictionary(*parent_id)?;
            return self.get_media_box(parent_dict);
        }

        Err(crate::error::SkuSplitError::source_unreadable(
            "MediaBox not found",
        ))
    }

    /// 指定ページ(1-indexed)のMediaBoxを正規化して返す（x0 <= x1, y0 <= y1）。
    pub fn page_box(&self, page_num: u32) -> crate::error::Result<PageBox> {
        self.page_box_of(self.get_page_id(page_num)?)
    }

    fn page_box_of(&self, page_id: ObjectId) -> crate::error::Result<PageBox> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        // MediaBoxを取得（継承も考慮）
        let media_box = self.get_media_box(page_dict)?;
        let media_box = match media_box {
            lopdf::Object::Reference(id) => self.doc.get_object(id)?.clone(),
            other => other,
        };

        let media_box_array = media_box.as_array()?;
        if media_box_array.len() < 4 {
            return Err(crate::error::SkuSplitError::source_unreadable(
                "Invalid MediaBox",
            ));
        }

        // MediaBoxの値は整数または実数の可能性がある
        let to_f64 = |obj: &lopdf::Object| -> crate::error::Result<f64> {
            match obj {
                lopdf::Object::Integer(i) => Ok(*i as f64),
                lopdf::Object::Real(f) => Ok(*f as f64),
                _ => Err(crate::error::SkuSplitError::source_unreadable(
                    "Invalid MediaBox value",
                )),
            }
        };

        let ax = to_f64(&media_box_array[0])?;
        let ay = to_f64(&media_box_array[1])?;
        let bx = to_f64(&media_box_array[2])?;
        let by = to_f64(&media_box_array[3])?;

        Ok(PageBox {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        })
    }

    /// 指定ページ(1-indexed)の単語を描画順で返す。
    /// 座標はMediaBox左上を原点とする上端基準。
    pub fn page_words(&self, page_num: u32) -> crate::error::Result<Vec<Word>> {
        let page_id = self.get_page_id(page_num)?;
        let page_box = self.page_box_of(page_id)?;
        let origin = PageOrigin {
            left: page_box.x0,
            top: page_box.y1,
        };
        let chars = extract_page_chars(&self.doc, page_id, origin)?;
        Ok(group_words(&chars))
    }

    /// ページ番号(1-indexed)からObjectIdを取得する。
    fn get_page_id(&self, page_num: u32) -> crate::error::Result<ObjectId> {
        self.pages.get(&page_num).copied().ok_or_else(|| {
            crate::error::SkuSplitError::source_unreadable(format!("page {} not found", page_num))
        })
    }
}

impl PageTextSource for PdfReader {
    fn page_count(&self) -> u32 {
        PdfReader::page_count(self)
    }

    fn region_text(&self, page_index: u32, region: &Region) -> crate::error::Result<String> {
        let words = self.page_words(page_index + 1)?;
        Ok(region_text(&words, region))
    }
}
