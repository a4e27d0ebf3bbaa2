use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};

use crate::error::SkuSplitError;

/// 幅情報が無い場合の既定グリフ幅（1/1000テキスト空間単位）
const DEFAULT_SIMPLE_WIDTH: f64 = 500.0;
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// フォントエンコーディング
#[derive(Debug, Clone)]
pub enum FontEncoding {
    /// 1バイト=1文字コードの単純フォント。Differencesはグリフ名で保持する。
    WinAnsi { differences: HashMap<u8, String> },
    /// 2バイト=1文字コードのType0フォント
    IdentityH,
}

/// 1文字コード分のデコード結果
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGlyph {
    /// Unicode文字列。デコードできない場合はNone。
    pub text: Option<String>,
    /// 1/1000テキスト空間単位の送り幅
    pub width: f64,
    /// 1バイトのコード32（Twが適用される）
    pub is_word_space: bool,
}

/// テキスト抽出用に解析したフォント
#[derive(Debug, Clone)]
pub struct PageFont {
    encoding: FontEncoding,
    to_unicode: Option<HashMap<u16, String>>,
    widths: HashMap<u16, f64>,
    default_width: f64,
    descent: f64,
}

impl PageFont {
    /// フォントリソースが見つからない場合の代替フォント。
    pub fn fallback() -> Self {
        PageFont {
            encoding: FontEncoding::WinAnsi {
                differences: HashMap::new(),
            },
            to_unicode: None,
            widths: HashMap::new(),
            default_width: DEFAULT_SIMPLE_WIDTH,
            descent: 0.0,
        }
    }

    /// フォント辞書を解析する。
    pub fn from_dict(doc: &Document, dict: &Dictionary) -> crate::error::Result<Self> {
        let subtype = dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .map_err(|e| SkuSplitError::font(format!("font without Subtype: {e}")))?;

        // 壊れたToUnicodeは無視してエンコーディングにフォールバックする
        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .and_then(|obj| stream_bytes(doc, obj).ok())
            .map(|data| parse_to_unicode_cmap(&data));

        if subtype == b"Type0" {
            Self::from_type0_dict(doc, dict, to_unicode)
        } else {
            Self::from_simple_dict(doc, dict, to_unicode)
        }
    }

    fn from_simple_dict(
        doc: &Document,
        dict: &Dictionary,
        to_unicode: Option<HashMap<u16, String>>,
    ) -> crate::error::Result<Self> {
        let mut differences = HashMap::new();
        if let Ok(enc) = dict.get(b"Encoding")
            && let Ok(enc_dict) = resolve(doc, enc).as_dict()
            && let Ok(diff) = enc_dict.get(b"Differences")
            && let Ok(items) = resolve(doc, diff).as_array()
        {
            // [code /name /name code /name ...]
            let mut code: i64 = 0;
            for item in items {
                match item {
                    Object::Integer(n) => code = *n,
                    Object::Name(name) => {
                        if (0..=255).contains(&code) {
                            differences
                                .insert(code as u8, String::from_utf8_lossy(name).into_owned());
                        }
                        code += 1;
                    }
                    _ => {}
                }
            }
        }

        let descriptor = font_descriptor(doc, dict);
        let default_width = descriptor
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|o| number(resolve(doc, o)))
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_SIMPLE_WIDTH);

        let mut widths = HashMap::new();
        if let Ok(first) = dict.get(b"FirstChar")
            && let Some(first) = number(resolve(doc, first))
            && let Ok(ws) = dict.get(b"Widths")
            && let Ok(ws) = resolve(doc, ws).as_array()
        {
            for (i, w) in ws.iter().enumerate() {
                // 単純フォントのコードは1バイト
                let Some(code) = char_code(first, i).filter(|c| *c <= 0xFF) else {
                    continue;
                };
                if let Some(w) = number(resolve(doc, w)) {
                    widths.insert(code, w);
                }
            }
        }

        Ok(PageFont {
            encoding: FontEncoding::WinAnsi { differences },
            to_unicode,
            widths,
            default_width,
            descent: font_descent(doc, dict, descriptor),
        })
    }

    fn from_type0_dict(
        doc: &Document,
        dict: &Dictionary,
        to_unicode: Option<HashMap<u16, String>>,
    ) -> crate::error::Result<Self> {
        let descendant = dict
            .get(b"DescendantFonts")
            .map(|o| resolve(doc, o))
            .and_then(Object::as_array)
            .ok()
            .and_then(|arr| arr.first())
            .and_then(|o| resolve(doc, o).as_dict().ok())
            .ok_or_else(|| SkuSplitError::font("Type0 font without DescendantFonts"))?;

        let default_width = descendant
            .get(b"DW")
            .ok()
            .and_then(|o| number(resolve(doc, o)))
            .unwrap_or(DEFAULT_CID_WIDTH);

        let mut widths = HashMap::new();
        if let Ok(w) = descendant.get(b"W")
            && let Ok(items) = resolve(doc, w).as_array()
        {
            parse_cid_widths(doc, items, &mut widths);
        }

        let descriptor = font_descriptor(doc, descendant);
        Ok(PageFont {
            encoding: FontEncoding::IdentityH,
            to_unicode,
            widths,
            default_width,
            descent: font_descent(doc, descendant, descriptor),
        })
    }

    /// Descent（em単位、通常は負値）
    pub fn descent(&self) -> f64 {
        self.descent
    }

    /// 文字コードの幅を返す（1/1000テキスト空間単位）
    pub fn glyph_width(&self, code: u16) -> f64 {
        self.widths
            .get(&code)
            .copied()
            .unwrap_or(self.default_width)
    }

    /// 文字列オペランドのバイト列を文字コード単位にデコードする。
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
        match &self.encoding {
            FontEncoding::IdentityH => bytes
                .chunks_exact(2)
                .map(|pair| {
                    let code = ((pair[0] as u16) << 8) | pair[1] as u16;
                    DecodedGlyph {
                        text: self.unicode_for(code),
                        width: self.glyph_width(code),
                        is_word_space: false,
                    }
                })
                .collect(),
            FontEncoding::WinAnsi { .. } => bytes
                .iter()
                .map(|&b| {
                    let code = b as u16;
                    DecodedGlyph {
                        text: self.unicode_for(code),
                        width: self.glyph_width(code),
                        is_word_space: b == b' ',
                    }
                })
                .collect(),
        }
    }

    /// ToUnicode → Differences → WinAnsi の順でUnicodeを解決する。
    fn unicode_for(&self, code: u16) -> Option<String> {
        if let Some(map) = &self.to_unicode
            && let Some(s) = map.get(&code)
        {
            return Some(s.clone());
        }
        match &self.encoding {
            FontEncoding::WinAnsi { differences } => {
                let byte = u8::try_from(code).ok()?;
                if let Some(name) = differences.get(&byte) {
                    return glyph_name_to_unicode(name).map(String::from);
                }
                win_ansi_to_unicode(byte).map(String::from)
            }
            // ToUnicodeが無いCIDフォントは文字を特定できない
            FontEncoding::IdentityH => None,
        }
    }
}

/// `/W` 配列を解析する: `c [w1 w2 ...]` または `c_first c_last w`
fn parse_cid_widths(doc: &Document, items: &[Object], widths: &mut HashMap<u16, f64>) {
    let mut i = 0;
    while i < items.len() {
        let Some(first) = number(resolve(doc, &items[i])) else {
            i += 1;
            continue;
        };
        match items.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(ws)) => {
                for (offset, w) in ws.iter().enumerate() {
                    let Some(cid) = char_code(first, offset) else {
                        break;
                    };
                    if let Some(w) = number(resolve(doc, w)) {
                        widths.insert(cid, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let last = number(last);
                let w = items.get(i + 2).and_then(|o| number(resolve(doc, o)));
                if let (Some(first), Some(last), Some(w)) =
                    (char_code(first, 0), last.and_then(|l| char_code(l, 0)), w)
                {
                    for cid in first..=last {
                        widths.insert(cid, w);
                    }
                }
                i += 3;
            }
            None => break,
        }
    }
}

/// `first + offset` を文字コードに変換する。範囲外・非数はNone。
fn char_code(first: f64, offset: usize) -> Option<u16> {
    if !first.is_finite() || first < 0.0 || first > f64::from(u16::MAX) {
        return None;
    }
    let offset = u16::try_from(offset).ok()?;
    (first as u16).checked_add(offset)
}

fn font_descriptor<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    dict.get(b"FontDescriptor")
        .ok()
        .and_then(|o| resolve(doc, o).as_dict().ok())
}

/// FontDescriptorの/Descent、無ければ標準14フォントの値を使う。
fn font_descent(doc: &Document, dict: &Dictionary, descriptor: Option<&Dictionary>) -> f64 {
    if let Some(d) = descriptor
        && let Ok(obj) = d.get(b"Descent")
        && let Some(v) = number(resolve(doc, obj))
    {
        return v / 1000.0;
    }
    let base = dict
        .get(b"BaseFont")
        .and_then(Object::as_name)
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_default();
    standard_font_descent(&base)
}

fn standard_font_descent(base_font: &str) -> f64 {
    if base_font.starts_with("Helvetica") || base_font.starts_with("Arial") {
        -0.207
    } else if base_font.starts_with("Times") {
        -0.217
    } else if base_font.starts_with("Courier") {
        -0.157
    } else {
        0.0
    }
}

/// 参照であれば解決したオブジェクトを返す。
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    doc.dereference(obj).map(|(_, o)| o).unwrap_or(obj)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// ストリームオブジェクトの内容を（必要なら伸長して）返す。
pub(crate) fn stream_bytes(doc: &Document, obj: &Object) -> crate::error::Result<Vec<u8>> {
    let stream = resolve(doc, obj)
        .as_stream()
        .map_err(|e| SkuSplitError::font(format!("expected stream: {e}")))?;
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|e| SkuSplitError::font(format!("failed to decompress stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// CMapの字句
#[derive(Debug, Clone, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Keyword(String),
}

fn tokenize_cmap(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => {
                tokens.push(CMapToken::Keyword("<<".to_string()));
                i += 2;
            }
            b'>' if data.get(i + 1) == Some(&b'>') => {
                tokens.push(CMapToken::Keyword(">>".to_string()));
                i += 2;
            }
            b'<' => {
                let start = i + 1;
                let end = data[start..]
                    .iter()
                    .position(|&c| c == b'>')
                    .map_or(data.len(), |p| start + p);
                tokens.push(CMapToken::Hex(decode_hex(&data[start..end])));
                i = end + 1;
            }
            b'[' => {
                tokens.push(CMapToken::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::ArrayEnd);
                i += 1;
            }
            b'(' => {
                // リテラル文字列はbf*セクションでは使わないので読み飛ばす
                let mut depth = 0;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            _ if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'(' | b'%')
                {
                    i += 1;
                }
                if i == start {
                    i += 1;
                    continue;
                }
                tokens.push(CMapToken::Keyword(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
        }
    }
    tokens
}

fn decode_hex(hex: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .iter()
        .filter_map(|&c| (c as char).to_digit(16).map(|d| d as u8))
        .collect();
    digits
        .chunks(2)
        .map(|pair| {
            let hi = pair[0];
            // 奇数桁は末尾に0を補う
            let lo = pair.get(1).copied().unwrap_or(0);
            (hi << 4) | lo
        })
        .collect()
}

fn code_from_bytes(bytes: &[u8]) -> Option<u16> {
    match bytes.len() {
        1 => Some(bytes[0] as u16),
        2 => Some(((bytes[0] as u16) << 8) | bytes[1] as u16),
        _ => None,
    }
}

fn utf16be_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| ((pair[0] as u16) << 8) | pair.get(1).copied().unwrap_or(0) as u16)
        .collect()
}

/// ToUnicode CMapの `bfchar` / `bfrange` セクションを解析する。
///
/// 1バイト・2バイトの文字コードのみを対象とする。
pub fn parse_to_unicode_cmap(data: &[u8]) -> HashMap<u16, String> {
    let tokens = tokenize_cmap(data);
    let mut map = HashMap::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            CMapToken::Keyword(k) if k == "beginbfchar" => {
                i += 1;
                while i + 1 < tokens.len() {
                    match (&tokens[i], &tokens[i + 1]) {
                        (CMapToken::Hex(src), CMapToken::Hex(dst)) => {
                            if let Some(code) = code_from_bytes(src) {
                                map.insert(code, String::from_utf16_lossy(&utf16be_units(dst)));
                            }
                            i += 2;
                        }
                        _ => break,
                    }
                }
            }
            CMapToken::Keyword(k) if k == "beginbfrange" => {
                i += 1;
                while i + 2 < tokens.len() {
                    let (CMapToken::Hex(lo), CMapToken::Hex(hi)) = (&tokens[i], &tokens[i + 1])
                    else {
                        break;
                    };
                    let (Some(lo), Some(hi)) = (code_from_bytes(lo), code_from_bytes(hi)) else {
                        i += 3;
                        continue;
                    };
                    match &tokens[i + 2] {
                        CMapToken::Hex(dst) => {
                            let base = utf16be_units(dst);
                            for (offset, code) in (lo..=hi).enumerate() {
                                let mut units = base.clone();
                                if let Some(last) = units.last_mut() {
                                    *last = last.wrapping_add(offset as u16);
                                }
                                map.insert(code, String::from_utf16_lossy(&units));
                            }
                            i += 3;
                        }
                        CMapToken::ArrayStart => {
                            i += 3;
                            let mut code = lo;
                            while let Some(CMapToken::Hex(dst)) = tokens.get(i) {
                                if code <= hi {
                                    map.insert(code, String::from_utf16_lossy(&utf16be_units(dst)));
                                }
                                code = code.saturating_add(1);
                                i += 1;
                            }
                            if tokens.get(i) == Some(&CMapToken::ArrayEnd) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
            }
            _ => i += 1,
        }
    }

    map
}

/// グリフ名→Unicode変換（主要なグリフ名のみ）
fn glyph_name_to_unicode(name: &str) -> Option<char> {
    match name {
        "space" => Some(' '),
        "exclam" => Some('!'),
        "quotedbl" => Some('"'),
        "numbersign" => Some('#'),
        "dollar" => Some('$'),
        "percent" => Some('%'),
        "ampersand" => Some('&'),
        "quotesingle" => Some('\''),
        "parenleft" => Some('('),
        "parenright" => Some(')'),
        "asterisk" => Some('*'),
        "plus" => Some('+'),
        "comma" => Some(','),
        "hyphen" | "minus" => Some('-'),
        "period" => Some('.'),
        "slash" => Some('/'),
        "zero" => Some('0'),
        "one" => Some('1'),
        "two" => Some('2'),
        "three" => Some('3'),
        "four" => Some('4'),
        "five" => Some('5'),
        "six" => Some('6'),
        "seven" => Some('7'),
        "eight" => Some('8'),
        "nine" => Some('9'),
        "colon" => Some(':'),
        "semicolon" => Some(';'),
        "less" => Some('<'),
        "equal" => Some('='),
        "greater" => Some('>'),
        "question" => Some('?'),
        "at" => Some('@'),
        "bracketleft" => Some('['),
        "backslash" => Some('\\'),
        "bracketright" => Some(']'),
        "underscore" => Some('_'),
        "bar" => Some('|'),
        _ if name.len() == 1 => name.chars().next(),
        _ if name.starts_with("uni") && name.len() == 7 => u32::from_str_radix(&name[3..], 16)
            .ok()
            .and_then(char::from_u32),
        _ => None,
    }
}

/// WinAnsi文字コード→Unicode変換
fn win_ansi_to_unicode(code: u8) -> Option<char> {
    // 0x20-0x7E: ASCII直接対応
    if (0x20..=0x7E).contains(&code) {
        return Some(code as char);
    }

    // Windows-1252 の上位バイトマッピング
    match code {
        0x80 => Some('\u{20AC}'),
        0x82 => Some('\u{201A}'),
        0x83 => Some('\u{0192}'),
        0x84 => Some('\u{201E}'),
        0x85 => Some('\u{2026}'),
        0x86 => Some('\u{2020}'),
        0x87 => Some('\u{2021}'),
        0x88 => Some('\u{02C6}'),
        0x89 => Some('\u{2030}'),
        0x8A => Some('\u{0160}'),
        0x8B => Some('\u{2039}'),
        0x8C => Some('\u{0152}'),
        0x8E => Some('\u{017D}'),
        0x91 => Some('\u{2018}'),
        0x92 => Some('\u{2019}'),
        0x93 => Some('\u{201C}'),
        0x94 => Some('\u{201D}'),
        0x95 => Some('\u{2022}'),
        0x96 => Some('\u{2013}'),
        0x97 => Some('\u{2014}'),
        0x98 => Some('\u{02DC}'),
        0x99 => Some('\u{2122}'),
        0x9A => Some('\u{0161}'),
        0x9B => Some('\u{203A}'),
        0x9C => Some('\u{0153}'),
        0x9E => Some('\u{017E}'),
        0x9F => Some('\u{0178}'),
        0xA0..=0xFF => Some(code as char), // Latin-1 Supplement直接対応
        _ => None,
    }
}
