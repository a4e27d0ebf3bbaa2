use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, Stream};

use crate::pdf::content_stream::{Matrix, operand_to_f64};
use crate::pdf::font::{PageFont, resolve};
use crate::pdf::region::Region;

/// 同一単語・同一行とみなす許容誤差（pt）
pub const X_TOLERANCE: f64 = 3.0;
pub const Y_TOLERANCE: f64 = 3.0;

/// Form XObjectの最大ネスト深さ
const MAX_FORM_DEPTH: usize = 8;

/// ページ上の1文字。座標は上端基準（top/bottomは上端からの距離）。
#[derive(Debug, Clone, PartialEq)]
pub struct TextChar {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

/// 空白で区切られた連続文字列
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

/// 上端基準座標への変換に使うMediaBoxの原点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageOrigin {
    /// MediaBox左端
    pub left: f64,
    /// MediaBox上端
    pub top: f64,
}

/// フォントとXObjectのリソーススコープ
struct Resources<'a> {
    fonts: HashMap<Vec<u8>, PageFont>,
    xobjects: HashMap<Vec<u8>, &'a Stream>,
}

impl<'a> Resources<'a> {
    fn empty() -> Self {
        Resources {
            fonts: HashMap::new(),
            xobjects: HashMap::new(),
        }
    }

    /// リソース辞書の内容を追加する。既存の名前は上書きしない。
    fn absorb(&mut self, doc: &'a Document, dict: &'a Dictionary) {
        if let Ok(fonts) = dict.get(b"Font")
            && let Ok(fonts) = resolve(doc, fonts).as_dict()
        {
            for (name, font_ref) in fonts.iter() {
                if self.fonts.contains_key(name) {
                    continue;
                }
                let parsed = resolve(doc, font_ref)
                    .as_dict()
                    .map_err(|e| crate::error::SkuSplitError::font(e.to_string()))
                    .and_then(|font_dict| PageFont::from_dict(doc, font_dict));
                match parsed {
                    Ok(font) => {
                        self.fonts.insert(name.clone(), font);
                    }
                    Err(e) => {
                        tracing::debug!(
                            font = %String::from_utf8_lossy(name),
                            error = %e,
                            "font skipped, falling back to WinAnsi"
                        );
                    }
                }
            }
        }

        if let Ok(xobjects) = dict.get(b"XObject")
            && let Ok(xobjects) = resolve(doc, xobjects).as_dict()
        {
            for (name, value) in xobjects.iter() {
                if let Ok(stream) = resolve(doc, value).as_stream() {
                    self.xobjects.entry(name.clone()).or_insert(stream);
                }
            }
        }
    }
}

/// q/Qで保存・復元されるグラフィックス状態（テキスト関連のみ）
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font_name: Vec<u8>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scaling: f64,
    text_leading: f64,
    text_rise: f64,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        GraphicsState {
            ctm,
            font_name: Vec::new(),
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            text_leading: 0.0,
            text_rise: 0.0,
        }
    }
}

struct TextInterpreter<'a> {
    doc: &'a Document,
    origin: PageOrigin,
    fallback_font: PageFont,
    chars: Vec<TextChar>,
}

impl<'a> TextInterpreter<'a> {
    fn run(
        &mut self,
        content_bytes: &[u8],
        resources: &Resources<'a>,
        base_ctm: Matrix,
        depth: usize,
    ) -> crate::error::Result<()> {
        // 空バイト列の場合、lopdfのパーサがエラーを返す可能性があるため特別扱い
        if content_bytes.is_empty() {
            return Ok(());
        }

        let content = Content::decode(content_bytes)
            .map_err(|e| crate::error::SkuSplitError::content_stream(e.to_string()))?;

        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut gs = GraphicsState::new(base_ctm);
        let mut text_matrix = Matrix::identity();
        let mut line_matrix = Matrix::identity();

        for op in &content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" if operands.len() == 6 => {
                    let m = Matrix::from_operands(operands)?;
                    gs.ctm = m.multiply(&gs.ctm);
                }
                "BT" => {
                    text_matrix = Matrix::identity();
                    line_matrix = Matrix::identity();
                }
                "ET" => {}
                "Tf" if operands.len() == 2 => {
                    if let Ok(name) = operands[0].as_name() {
                        gs.font_name = name.to_vec();
                    }
                    gs.font_size = operand_to_f64(&operands[1])?;
                }
                "Tc" if operands.len() == 1 => gs.char_spacing = operand_to_f64(&operands[0])?,
                "Tw" if operands.len() == 1 => gs.word_spacing = operand_to_f64(&operands[0])?,
                "Tz" if operands.len() == 1 => {
                    gs.horizontal_scaling = operand_to_f64(&operands[0])? / 100.0;
                }
                "TL" if operands.len() == 1 => gs.text_leading = operand_to_f64(&operands[0])?,
                "Ts" if operands.len() == 1 => gs.text_rise = operand_to_f64(&operands[0])?,
                "Tm" if operands.len() == 6 => {
                    text_matrix = Matrix::from_operands(operands)?;
                    line_matrix = text_matrix.clone();
                }
                "Td" | "TD" if operands.len() == 2 => {
                    let tx = operand_to_f64(&operands[0])?;
                    let ty = operand_to_f64(&operands[1])?;
                    if op.operator == "TD" {
                        // tx ty TD = -ty TL tx ty Td
                        gs.text_leading = -ty;
                    }
                    line_matrix = Matrix::translate(tx, ty).multiply(&line_matrix);
                    text_matrix = line_matrix.clone();
                }
                "T*" => {
                    line_matrix = Matrix::translate(0.0, -gs.text_leading).multiply(&line_matrix);
                    text_matrix = line_matrix.clone();
                }
                "Tj" if operands.len() == 1 => {
                    self.show_string(&gs, &mut text_matrix, &operands[0], resources);
                }
                "'" if operands.len() == 1 => {
                    line_matrix = Matrix::translate(0.0, -gs.text_leading).multiply(&line_matrix);
                    text_matrix = line_matrix.clone();
                    self.show_string(&gs, &mut text_matrix, &operands[0], resources);
                }
                "\"" if operands.len() == 3 => {
                    gs.word_spacing = operand_to_f64(&operands[0])?;
                    gs.char_spacing = operand_to_f64(&operands[1])?;
                    line_matrix = Matrix::translate(0.0, -gs.text_leading).multiply(&line_matrix);
                    text_matrix = line_matrix.clone();
                    self.show_string(&gs, &mut text_matrix, &operands[2], resources);
                }
                "TJ" if operands.len() == 1 => {
                    if let Object::Array(items) = &operands[0] {
                        for item in items {
                            match item {
                                Object::String(..) => {
                                    self.show_string(&gs, &mut text_matrix, item, resources);
                                }
                                Object::Integer(_) | Object::Real(_) => {
                                    let adj = operand_to_f64(item)?;
                                    let tx = -adj / 1000.0 * gs.font_size * gs.horizontal_scaling;
                                    text_matrix = Matrix::translate(tx, 0.0).multiply(&text_matrix);
                                }
                                _ => {}
                            }
                        }
                    }
                }
                "Do" if operands.len() == 1 => {
                    if let Ok(name) = operands[0].as_name()
                        && let Some(&stream) = resources.xobjects.get(name)
                    {
                        self.run_form(stream, resources, &gs.ctm, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Form XObjectを自身のリソースとMatrixで解釈する。Image XObjectは無視する。
    fn run_form(
        &mut self,
        stream: &'a Stream,
        parent: &Resources<'a>,
        ctm: &Matrix,
        depth: usize,
    ) -> crate::error::Result<()> {
        let is_form = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .is_ok_and(|s| s == b"Form");
        if !is_form {
            return Ok(());
        }
        if depth >= MAX_FORM_DEPTH {
            tracing::debug!(depth, "form XObject nesting too deep, skipped");
            return Ok(());
        }

        let form_matrix = match stream.dict.get(b"Matrix") {
            Ok(obj) => match resolve(self.doc, obj).as_array() {
                Ok(arr) => Matrix::from_operands(arr)?,
                Err(_) => Matrix::identity(),
            },
            Err(_) => Matrix::identity(),
        };
        let form_ctm = form_matrix.multiply(ctm);

        let content = if stream.dict.has(b"Filter") {
            stream
                .decompressed_content()
                .map_err(|e| crate::error::SkuSplitError::content_stream(e.to_string()))?
        } else {
            stream.content.clone()
        };

        let own_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve(self.doc, obj).as_dict().ok());
        match own_resources {
            Some(dict) => {
                let mut scoped = Resources::empty();
                scoped.absorb(self.doc, dict);
                self.run(&content, &scoped, form_ctm, depth + 1)
            }
            // /Resourcesの無いFormは呼び出し元のリソースを継承する
            None => self.run(&content, parent, form_ctm, depth + 1),
        }
    }

    /// 文字列オペランドを1文字ずつ配置し、テキスト行列を進める。
    fn show_string(
        &mut self,
        gs: &GraphicsState,
        text_matrix: &mut Matrix,
        operand: &Object,
        resources: &Resources<'a>,
    ) {
        let Object::String(bytes, _) = operand else {
            return;
        };
        let font = resources
            .fonts
            .get(&gs.font_name)
            .unwrap_or(&self.fallback_font);
        let descent = font.descent();

        for glyph in font.decode(bytes) {
            let w0 = glyph.width / 1000.0;
            let params = Matrix {
                a: gs.font_size * gs.horizontal_scaling,
                b: 0.0,
                c: 0.0,
                d: gs.font_size,
                e: 0.0,
                f: gs.text_rise,
            };
            let rendering = params.multiply(text_matrix).multiply(&gs.ctm);
            let (ax, ay) = rendering.transform_point(0.0, descent);
            let (bx, by) = rendering.transform_point(w0, descent + 1.0);

            if let Some(text) = glyph.text {
                self.chars.push(TextChar {
                    text,
                    x0: ax.min(bx) - self.origin.left,
                    x1: ax.max(bx) - self.origin.left,
                    top: self.origin.top - ay.max(by),
                    bottom: self.origin.top - ay.min(by),
                });
            }

            let spacing = if glyph.is_word_space {
                gs.char_spacing + gs.word_spacing
            } else {
                gs.char_spacing
            };
            let tx = (w0 * gs.font_size + spacing) * gs.horizontal_scaling;
            *text_matrix = Matrix::translate(tx, 0.0).multiply(text_matrix);
        }
    }
}

/// ページのコンテンツストリームを解釈し、描画順に文字を返す。
pub fn extract_page_chars(
    doc: &Document,
    page_id: lopdf::ObjectId,
    origin: PageOrigin,
) -> crate::error::Result<Vec<TextChar>> {
    let content = doc.get_page_content(page_id)?;

    let (resource_dict, resource_ids) = doc.get_page_resources(page_id)?;
    let mut resources = Resources::empty();
    // ページ直接のResourcesを優先し、継承分は未定義の名前のみ補う
    if let Some(dict) = resource_dict {
        resources.absorb(doc, dict);
    }
    for res_id in resource_ids {
        if let Ok(dict) = doc.get_dictionary(res_id) {
            resources.absorb(doc, dict);
        }
    }

    let mut interpreter = TextInterpreter {
        doc,
        origin,
        fallback_font: PageFont::fallback(),
        chars: Vec::new(),
    };
    interpreter.run(&content, &resources, Matrix::identity(), 0)?;
    Ok(interpreter.chars)
}

/// 描画順の文字列を単語にまとめる。
///
/// 空白文字、3ptを超える水平方向の隙間、後退、行の変化で単語を区切る。
pub fn group_words(chars: &[TextChar]) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();
    let mut current: Option<Word> = None;
    let mut prev: Option<&TextChar> = None;

    for ch in chars {
        if ch.text.chars().all(char::is_whitespace) {
            words.extend(current.take());
            prev = None;
            continue;
        }

        let continues = prev.is_some_and(|p| {
            (ch.top - p.top).abs() <= Y_TOLERANCE
                && ch.x0 >= p.x0
                && ch.x0 - p.x1 <= X_TOLERANCE
        });

        if continues && let Some(word) = current.as_mut() {
            word.text.push_str(&ch.text);
            word.x1 = word.x1.max(ch.x1);
            word.top = word.top.min(ch.top);
            word.bottom = word.bottom.max(ch.bottom);
        } else {
            words.extend(current.take());
            current = Some(Word {
                text: ch.text.clone(),
                x0: ch.x0,
                x1: ch.x1,
                top: ch.top,
                bottom: ch.bottom,
            });
        }
        prev = Some(ch);
    }

    words.extend(current);
    words
}

/// 左上隅が領域内にある単語を読み順（上→下、左→右）で連結する。
pub fn region_text(words: &[Word], region: &Region) -> String {
    let mut selected: Vec<&Word> = words
        .iter()
        .filter(|w| region.contains(w.x0, w.top))
        .collect();
    selected.sort_by(|a, b| a.top.total_cmp(&b.top));

    // topの近い単語を同じ行にまとめ、行内をx0順に並べる
    let mut lines: Vec<Vec<&Word>> = Vec::new();
    for word in selected {
        match lines.last_mut() {
            Some(line) if word.top - line[0].top <= Y_TOLERANCE => line.push(word),
            _ => lines.push(vec![word]),
        }
    }
    for line in &mut lines {
        line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    }

    lines
        .iter()
        .flatten()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(text: &str, x0: f64, top: f64) -> TextChar {
        TextChar {
            text: text.to_string(),
            x0,
            x1: x0 + 5.0,
            top,
            bottom: top + 10.0,
        }
    }

    #[test]
    fn test_group_words_splits_on_space_and_gap() {
        let chars = vec![
            ch("A", 0.0, 0.0),
            ch("B", 5.0, 0.0),
            ch(" ", 10.0, 0.0),
            ch("C", 15.0, 0.0),
            // 隙間 > 3pt
            ch("D", 30.0, 0.0),
        ];
        let words = group_words(&chars);
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["AB", "C", "D"]);
        assert_eq!(words[0].x0, 0.0);
        assert_eq!(words[0].x1, 10.0);
    }

    #[test]
    fn test_group_words_splits_on_line_change_and_backtrack() {
        let chars = vec![
            ch("A", 0.0, 0.0),
            ch("B", 5.0, 20.0),
            ch("C", 1.0, 20.0),
        ];
        let texts: Vec<String> = group_words(&chars).into_iter().map(|w| w.text).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_region_text_orders_lines_then_columns() {
        let word = |text: &str, x0: f64, top: f64| Word {
            text: text.to_string(),
            x0,
            x1: x0 + 10.0,
            top,
            bottom: top + 8.0,
        };
        let words = vec![
            word("second", 40.0, 101.0),
            word("third", 10.0, 120.0),
            word("first", 10.0, 100.0),
            word("outside", 500.0, 100.0),
        ];
        let region = Region::new(0.0, 90.0, 100.0, 130.0);
        assert_eq!(region_text(&words, &region), "first second third");
    }

    #[test]
    fn test_region_text_empty_when_nothing_inside() {
        let region = Region::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(region_text(&[], &region), "");
    }
}
