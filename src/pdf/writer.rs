use std::collections::{BTreeMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};

use crate::error::SkuSplitError;

/// ページツリーの祖先から継承されうるページ属性
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// 元PDFから抜き出したページだけで構成された新しいPDF。
pub struct AssembledPdf {
    doc: Document,
    page_count: usize,
}

impl AssembledPdf {
    /// 内部のlopdf Documentへの参照を返す。
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// PDFドキュメントをバイト列として出力する。
    pub fn into_bytes(mut self) -> crate::error::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| SkuSplitError::assembly(e.to_string()))?;
        Ok(buf)
    }
}

/// 元PDFの指定ページ（0-indexed）だけを、指定順で含む新しいPDFを組み立てる。
///
/// ページオブジェクトは内容を変更せずにコピーする。継承属性はページ辞書に
/// 展開し、選択されなかったページ・旧ページツリー・到達不能になった
/// オブジェクトは削除する。出力は入力に対して決定的。
pub fn assemble(source: &Document, page_indices: &[u32]) -> crate::error::Result<AssembledPdf> {
    if page_indices.is_empty() {
        return Err(SkuSplitError::assembly("no pages to assemble"));
    }

    let pages = source.get_pages();
    let mut selected: Vec<ObjectId> = Vec::with_capacity(page_indices.len());
    let mut seen: HashSet<ObjectId> = HashSet::new();
    for &index in page_indices {
        let page_id = pages.get(&(index + 1)).copied().ok_or_else(|| {
            SkuSplitError::assembly(format!(
                "page index {} out of range (document has {} pages)",
                index,
                pages.len()
            ))
        })?;
        if !seen.insert(page_id) {
            return Err(SkuSplitError::assembly(format!(
                "page index {index} listed more than once"
            )));
        }
        selected.push(page_id);
    }

    let mut doc = source.clone();

    // 継承属性をページ辞書へ展開（旧ページツリーを消す前に行う）
    for &page_id in &selected {
        let inherited = inherited_attributes(source, page_id)?;
        let page_dict = doc
            .get_dictionary_mut(page_id)
            .map_err(|e| SkuSplitError::assembly(e.to_string()))?;
        for (key, value) in inherited {
            if !page_dict.has(&key) {
                page_dict.set(key, value);
            }
        }
    }

    // 旧ページツリーと選択外のページを削除
    let mut removed: HashSet<ObjectId> = page_tree_nodes(source)?.into_iter().collect();
    removed.extend(unselected_pages(&pages, &seen));
    for id in &removed {
        doc.objects.remove(id);
    }
    // リンク注釈の宛先など、削除したオブジェクトを指す参照を残さない
    for object in doc.objects.values_mut() {
        null_dangling_references(object, &removed);
    }

    // 新しいPagesノードとCatalogを作成
    let pages_id = doc.new_object_id();
    for &page_id in &selected {
        doc.get_dictionary_mut(page_id)
            .map_err(|e| SkuSplitError::assembly(e.to_string()))?
            .set("Parent", pages_id);
    }
    let kids: Vec<Object> = selected.iter().map(|&id| id.into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => selected.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });

    // 旧Catalog（しおり・名前付き宛先など）は引き継がない
    doc.trailer = Dictionary::new();
    doc.trailer.set("Root", catalog_id);

    doc.prune_objects();
    doc.renumber_objects();

    Ok(AssembledPdf {
        doc,
        page_count: selected.len(),
    })
}

fn unselected_pages<'a>(
    pages: &'a BTreeMap<u32, ObjectId>,
    selected: &'a HashSet<ObjectId>,
) -> impl Iterator<Item = ObjectId> + 'a {
    pages
        .values()
        .copied()
        .filter(move |id| !selected.contains(id))
}

fn null_dangling_references(object: &mut Object, removed: &HashSet<ObjectId>) {
    if let Object::Reference(id) = *object
        && removed.contains(&id)
    {
        *object = Object::Null;
        return;
    }
    match object {
        Object::Array(items) => {
            for item in items {
                null_dangling_references(item, removed);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                null_dangling_references(value, removed);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                null_dangling_references(value, removed);
            }
        }
        _ => {}
    }
}

/// ページの祖先Pagesノードから、ページ自身に無い継承属性を集める。
fn inherited_attributes(
    doc: &Document,
    page_id: ObjectId,
) -> crate::error::Result<Vec<(Vec<u8>, Object)>> {
    let page_dict = doc.get_dictionary(page_id)?;
    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut parent = page_dict.get(b"Parent").and_then(Object::as_reference).ok();

    while let Some(parent_id) = parent {
        // 循環参照対策
        if !visited.insert(parent_id) {
            break;
        }
        let Ok(parent_dict) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE_KEYS {
            let already = page_dict.has(key) || found.iter().any(|(k, _)| k.as_slice() == key);
            if !already && let Ok(value) = parent_dict.get(key) {
                found.push((key.to_vec(), value.clone()));
            }
        }
        parent = parent_dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(found)
}

/// CatalogからたどれるPagesノード（中間ノードを含む）を列挙する。
fn page_tree_nodes(doc: &Document) -> crate::error::Result<Vec<ObjectId>> {
    let root_id = doc
        .catalog()?
        .get(b"Pages")
        .and_then(Object::as_reference)?;

    let mut nodes = Vec::new();
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut queue = vec![root_id];

    while let Some(node_id) = queue.pop() {
        if !visited.insert(node_id) {
            continue;
        }
        let Ok(node) = doc.get_dictionary(node_id) else {
            continue;
        };
        let is_pages = node
            .get(b"Type")
            .and_then(Object::as_name)
            .is_ok_and(|t| t == b"Pages");
        if !is_pages {
            continue;
        }
        nodes.push(node_id);
        if let Ok(kids) = node.get(b"Kids").and_then(Object::as_array) {
            queue.extend(kids.iter().filter_map(|k| k.as_reference().ok()));
        }
    }

    Ok(nodes)
}
