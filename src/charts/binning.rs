//! Equal-width binning over an observed `[min, max]` range.
//!
//! Bins are left-closed `[a, b)`, except the last which is closed `[a, b]`,
//! so both extremes of the data land inside the grid.

use serde::Serialize;

use super::DerivationFailure;

/// One bin of an axis, with a printable interval label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualWidthBins {
    lower: f64,
    upper: f64,
    count: usize,
}

impl EqualWidthBins {
    pub fn new(
        field: &'static str,
        lower: f64,
        upper: f64,
        count: usize,
    ) -> Result<Self, DerivationFailure> {
        if count == 0 {
            return Err(DerivationFailure::ZeroBins);
        }
        if !lower.is_finite() || !upper.is_finite() {
            return Err(DerivationFailure::NonFinite { field });
        }
        if upper <= lower {
            return Err(DerivationFailure::DegenerateRange { field, value: lower });
        }
        Ok(EqualWidthBins { lower, upper, count })
    }

    /// Bins spanning exactly the min and max of `values`.
    pub fn spanning(
        field: &'static str,
        values: impl IntoIterator<Item = f64>,
        count: usize,
    ) -> Result<Self, DerivationFailure> {
        let [lower, upper] = value_range(field, values)?;
        Self::new(field, lower, upper, count)
    }

    /// Like [`spanning`](Self::spanning), but a single-valued input is widened
    /// to `[v - 0.5, v + 0.5]` instead of failing.
    pub fn spanning_or_widened(
        field: &'static str,
        values: impl IntoIterator<Item = f64>,
        count: usize,
    ) -> Result<Self, DerivationFailure> {
        let [lower, upper] = value_range(field, values)?;
        if lower == upper {
            return Self::new(field, lower - 0.5, upper + 0.5, count);
        }
        Self::new(field, lower, upper, count)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn width(&self) -> f64 {
        (self.upper - self.lower) / self.count as f64
    }

    /// Edge `i` of `0..=count`. The outer edges are exact.
    pub fn edge(&self, i: usize) -> f64 {
        if i == 0 {
            self.lower
        } else if i >= self.count {
            self.upper
        } else {
            self.lower + self.width() * i as f64
        }
    }

    pub fn edges(&self) -> Vec<f64> {
        (0..=self.count).map(|i| self.edge(i)).collect()
    }

    pub fn bins(&self) -> Vec<Bin> {
        (0..self.count)
            .map(|i| {
                let (lower, upper) = (self.edge(i), self.edge(i + 1));
                let close = if i + 1 == self.count { ']' } else { ')' };
                Bin {
                    lower,
                    upper,
                    label: format!("[{lower:.2}, {upper:.2}{close}"),
                }
            })
            .collect()
    }

    /// Index of the bin holding `value`, or `None` outside the range.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        if !(self.lower..=self.upper).contains(&value) {
            return None;
        }
        let mut idx = (((value - self.lower) / self.width()).floor() as usize).min(self.count - 1);
        // Rounding in the division can land one bin off near an edge.
        if idx > 0 && value < self.edge(idx) {
            idx -= 1;
        } else if idx + 1 < self.count && value >= self.edge(idx + 1) {
            idx += 1;
        }
        Some(idx)
    }
}

/// `[min, max]` of the values; errors on empty or non-finite input.
pub fn value_range(
    field: &'static str,
    values: impl IntoIterator<Item = f64>,
) -> Result<[f64; 2], DerivationFailure> {
    let mut range: Option<[f64; 2]> = None;
    for v in values {
        if !v.is_finite() {
            return Err(DerivationFailure::NonFinite { field });
        }
        range = Some(match range {
            None => [v, v],
            Some([lo, hi]) => [lo.min(v), hi.max(v)],
        });
    }
    range.ok_or(DerivationFailure::Empty { field })
}
