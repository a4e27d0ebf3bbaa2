use indexmap::IndexMap;

use super::classifier::SkuClassifier;
use super::{GroupKey, Sku};
use crate::pdf::region::Region;

/// Per-page access to the text inside a fixed region.
pub trait PageTextSource {
    fn page_count(&self) -> u32;

    /// Text of the words inside `region` on page `page_index` (0-based),
    /// in reading order. Empty when the region holds no text.
    fn region_text(&self, page_index: u32, region: &Region) -> crate::error::Result<String>;
}

/// Partition of a document's pages by SKU.
///
/// SKU groups keep first-seen order; every page index appears exactly once
/// across the groups and the unidentified list, in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageGroups {
    groups: IndexMap<Sku, Vec<u32>>,
    unidentified: Vec<u32>,
}

impl PageGroups {
    pub fn groups(&self) -> &IndexMap<Sku, Vec<u32>> {
        &self.groups
    }

    pub fn unidentified(&self) -> &[u32] {
        &self.unidentified
    }

    /// Pages of the group keyed by `sku`, if any.
    pub fn pages_for(&self, sku: &str) -> Option<&[u32]> {
        self.groups.get(sku).map(Vec::as_slice)
    }

    pub fn sku_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of output documents: one per SKU plus the unidentified bucket
    /// when it is non-empty.
    pub fn document_count(&self) -> usize {
        self.groups.len() + usize::from(!self.unidentified.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.document_count() == 0
    }

    /// Total pages across all groups.
    pub fn page_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum::<usize>() + self.unidentified.len()
    }

    /// Output documents in order: SKU groups by first appearance, then the
    /// unidentified bucket if non-empty.
    pub fn iter(&self) -> impl Iterator<Item = (GroupKey, &[u32])> {
        let skus = self
            .groups
            .iter()
            .map(|(sku, pages)| (GroupKey::Sku(sku.clone()), pages.as_slice()));
        let rest = (!self.unidentified.is_empty())
            .then(|| (GroupKey::Unidentified, self.unidentified.as_slice()));
        skus.chain(rest)
    }
}

/// Fold state of the single forward pass.
#[derive(Debug, Default)]
struct CarryForward {
    groups: PageGroups,
    last_sku: Option<Sku>,
}

impl CarryForward {
    fn step(mut self, page_index: u32, classification: Option<Sku>) -> Self {
        match classification {
            Some(sku) => {
                self.groups
                    .groups
                    .entry(sku.clone())
                    .or_default()
                    .push(page_index);
                self.last_sku = Some(sku);
            }
            None => match &self.last_sku {
                // page continues the previous item's label
                Some(previous) => self
                    .groups
                    .groups
                    .entry(previous.clone())
                    .or_default()
                    .push(page_index),
                None => self.groups.unidentified.push(page_index),
            },
        }
        self
    }
}

/// Groups pages from their per-page classifications, given in page order.
///
/// A page with a SKU joins that SKU's group and becomes the carry-forward
/// target; a page without one joins the most recent SKU's group, or the
/// unidentified list when no SKU has been seen yet.
pub fn group_pages<I>(classifications: I) -> PageGroups
where
    I: IntoIterator<Item = Option<Sku>>,
{
    classifications
        .into_iter()
        .zip(0u32..)
        .fold(CarryForward::default(), |state, (classification, index)| {
            state.step(index, classification)
        })
        .groups
}

/// Reads every page's region text from `source`, classifies it and groups
/// the pages. A page whose text cannot be extracted counts as having none.
pub fn group_document<S>(source: &S, region: &Region, classifier: &SkuClassifier) -> PageGroups
where
    S: PageTextSource + ?Sized,
{
    let classifications = (0..source.page_count()).map(|page_index| {
        let text = source
            .region_text(page_index, region)
            .unwrap_or_else(|e| {
                tracing::warn!(page = page_index + 1, error = %e, "region text extraction failed");
                String::new()
            });
        let sku = classifier.classify(&text);
        tracing::debug!(page = page_index + 1, text = %text, sku = ?sku, "page classified");
        sku
    });
    group_pages(classifications)
}
