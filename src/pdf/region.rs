use serde::Deserialize;

use crate::error::SkuSplitError;

/// ページ上の固定矩形領域（単位: pt）。
///
/// 座標系は上端基準: `x0`/`x1` はMediaBox左端からの距離、
/// `top`/`bottom` はMediaBox上端から下向きの距離。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Region {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl Default for Region {
    /// 出荷ラベルテンプレートのSKU欄。
    fn default() -> Self {
        Region {
            x0: 17.0,
            top: 327.0,
            x1: 73.0,
            bottom: 342.0,
        }
    }
}

impl Region {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Region {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// 点 `(x, top)` が領域内（境界を含む）にあるか判定する。
    pub fn contains(&self, x: f64, top: f64) -> bool {
        self.x0 <= x && x <= self.x1 && self.top <= top && top <= self.bottom
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        let values = [self.x0, self.top, self.x1, self.bottom];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SkuSplitError::config(format!(
                "Region values must be finite: {self:?}"
            )));
        }
        if self.x0 > self.x1 {
            return Err(SkuSplitError::config(format!(
                "Invalid region: x0 ({}) > x1 ({})",
                self.x0, self.x1
            )));
        }
        if self.top > self.bottom {
            return Err(SkuSplitError::config(format!(
                "Invalid region: top ({}) > bottom ({})",
                self.top, self.bottom
            )));
        }
        Ok(())
    }
}
