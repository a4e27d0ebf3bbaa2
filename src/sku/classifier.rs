use super::Sku;

/// Shortest first token accepted as a SKU.
pub const DEFAULT_MIN_SKU_LENGTH: usize = 4;

/// Decides whether a page's region text carries a usable SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkuClassifier {
    min_length: usize,
}

impl Default for SkuClassifier {
    fn default() -> Self {
        SkuClassifier {
            min_length: DEFAULT_MIN_SKU_LENGTH,
        }
    }
}

impl SkuClassifier {
    pub fn new(min_length: usize) -> Self {
        SkuClassifier { min_length }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Returns the first whitespace-separated token when it has at least
    /// `min_length` characters. Later tokens are ignored. No text and a
    /// too-short token both yield `None`.
    pub fn classify(&self, region_text: &str) -> Option<Sku> {
        let token = region_text.split_whitespace().next()?;
        (token.chars().count() >= self.min_length).then(|| Sku::new_unchecked(token))
    }
}
