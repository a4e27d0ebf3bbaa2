// Phase 4: キャリーフォワードによるページのグループ化テスト

use sku_splitter::error::SkuSplitError;
use sku_splitter::pdf::region::Region;
use sku_splitter::sku::classifier::SkuClassifier;
use sku_splitter::sku::grouping::{PageTextSource, group_document, group_pages};
use sku_splitter::sku::{GroupKey, Sku};

// ============================================================
// Helpers
// ============================================================

fn sku(text: &str) -> Option<Sku> {
    SkuClassifier::new(1).classify(text)
}

fn classifications(labels: &[Option<&str>]) -> Vec<Option<Sku>> {
    labels.iter().map(|l| l.and_then(sku)).collect()
}

/// ページごとの領域テキストを固定で返すテスト用ソース
struct FakeLabels {
    pages: Vec<Result<&'static str, &'static str>>,
}

impl PageTextSource for FakeLabels {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn region_text(&self, page_index: u32, _region: &Region) -> sku_splitter::error::Result<String> {
        match self.pages[page_index as usize] {
            Ok(text) => Ok(text.to_string()),
            Err(msg) => Err(SkuSplitError::content_stream(msg)),
        }
    }
}

// ============================================================
// 1. キャリーフォワード
// ============================================================

#[test]
fn test_unlabeled_pages_follow_previous_sku() {
    let groups = group_pages(classifications(&[
        Some("A1"),
        None,
        None,
        Some("B2"),
        None,
    ]));
    assert_eq!(groups.pages_for("A1"), Some(&[0, 1, 2][..]));
    assert_eq!(groups.pages_for("B2"), Some(&[3, 4][..]));
    assert!(groups.unidentified().is_empty());
    assert_eq!(groups.document_count(), 2);
}

#[test]
fn test_leading_pages_without_sku_are_unidentified() {
    let groups = group_pages(classifications(&[None, None, Some("A1"), None]));
    assert_eq!(groups.unidentified(), &[0, 1]);
    assert_eq!(groups.pages_for("A1"), Some(&[2, 3][..]));
    assert_eq!(groups.document_count(), 2);
}

#[test]
fn test_all_pages_unidentified() {
    let groups = group_pages(classifications(&[None, None, None]));
    assert_eq!(groups.sku_count(), 0);
    assert_eq!(groups.unidentified(), &[0, 1, 2]);

    let keys: Vec<GroupKey> = groups.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec![GroupKey::Unidentified]);
}

#[test]
fn test_no_pages_no_groups() {
    let groups = group_pages(Vec::new());
    assert!(groups.is_empty());
    assert_eq!(groups.page_count(), 0);
    assert_eq!(groups.iter().count(), 0);
}

// ============================================================
// 2. 同じSKUの再出現と順序
// ============================================================

#[test]
fn test_repeated_sku_merges_in_page_order() {
    let groups = group_pages(classifications(&[
        Some("A1"),
        Some("B2"),
        None,
        Some("A1"),
        None,
    ]));
    assert_eq!(groups.pages_for("A1"), Some(&[0, 3, 4][..]));
    assert_eq!(groups.pages_for("B2"), Some(&[1, 2][..]));
}

#[test]
fn test_groups_keep_first_seen_order() {
    let groups = group_pages(classifications(&[
        Some("ZZZ"),
        Some("AAA"),
        Some("MMM"),
        Some("AAA"),
    ]));
    let order: Vec<&str> = groups.groups().keys().map(|s| s.as_str()).collect();
    assert_eq!(order, vec!["ZZZ", "AAA", "MMM"]);
}

#[test]
fn test_every_page_assigned_exactly_once() {
    let labels = [
        None,
        Some("A1"),
        None,
        Some("B2"),
        Some("A1"),
        None,
        Some("C3"),
    ];
    let groups = group_pages(classifications(&labels));

    let mut all: Vec<u32> = groups.iter().flat_map(|(_, pages)| pages.to_vec()).collect();
    assert_eq!(groups.page_count(), labels.len());
    all.sort_unstable();
    assert_eq!(all, (0..labels.len() as u32).collect::<Vec<_>>());

    for (_, pages) in groups.iter() {
        assert!(pages.windows(2).all(|w| w[0] < w[1]), "pages ascending");
    }
}

#[test]
fn test_unidentified_bucket_listed_last() {
    let groups = group_pages(classifications(&[None, Some("B2"), Some("A1")]));
    let keys: Vec<String> = groups.iter().map(|(key, _)| key.to_string()).collect();
    assert_eq!(keys, vec!["B2", "A1", "<unidentified>"]);
}

// ============================================================
// 3. group_document: テキスト抽出と判定の組み合わせ
// ============================================================

#[test]
fn test_group_document_applies_min_length() {
    let source = FakeLabels {
        pages: vec![Ok("SKU-1"), Ok("AB"), Ok(""), Ok("SKU-2 extra"), Ok("XY")],
    };
    let groups = group_document(&source, &Region::default(), &SkuClassifier::default());
    assert_eq!(groups.pages_for("SKU-1"), Some(&[0, 1, 2][..]));
    assert_eq!(groups.pages_for("SKU-2"), Some(&[3, 4][..]));
    assert_eq!(groups.pages_for("AB"), None);
}

#[test]
fn test_group_document_extraction_error_counts_as_no_text() {
    let source = FakeLabels {
        pages: vec![Err("broken content"), Ok("SKU-1"), Err("broken content")],
    };
    let groups = group_document(&source, &Region::default(), &SkuClassifier::default());
    assert_eq!(groups.unidentified(), &[0]);
    assert_eq!(groups.pages_for("SKU-1"), Some(&[1, 2][..]));
}
