use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::aggregator::PriceMatrix;
use crate::models::{PriceCell, TokenId};

/// Deviations strictly above this many percent are flagged as significant.
pub const SIGNIFICANCE_THRESHOLD_PCT: Decimal = Decimal::ONE;

/// Decimal places used when a deviation is shown.
pub const DISPLAY_DECIMALS: u32 = 2;

/// Result of comparing one source's price against another's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "percent", rename_all = "snake_case")]
pub enum Deviation {
    /// Compared a source with itself.
    Identity,
    /// One side is missing or the baseline is zero.
    Absent,
    Percent(Decimal),
}

impl Deviation {
    pub fn percent(&self) -> Option<Decimal> {
        match self {
            Deviation::Percent(p) => Some(*p),
            _ => None,
        }
    }

    /// Rounded half away from zero to [`DISPLAY_DECIMALS`].
    pub fn rounded(&self) -> Option<Decimal> {
        self.percent().map(round_display)
    }

    pub fn is_significant(&self) -> bool {
        self.percent().is_some_and(is_significant)
    }
}

pub fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Judged on the value as displayed, so `1.004` (shown as `1.00%`) is not
/// significant.
pub fn is_significant(percent: Decimal) -> bool {
    round_display(percent).abs() > SIGNIFICANCE_THRESHOLD_PCT
}

/// Percentage move from `base` to `other`: `(other - base) / base * 100`.
///
/// Two cells from the same source short-circuit to [`Deviation::Identity`]
/// before any arithmetic.
pub fn deviation(base: &PriceCell, other: &PriceCell) -> Deviation {
    let (Some(base), Some(other)) = (base.point(), other.point()) else {
        return Deviation::Absent;
    };

    if base.source == other.source {
        return Deviation::Identity;
    }

    if base.price.is_zero() {
        return Deviation::Absent;
    }

    other
        .price
        .checked_sub(base.price)
        .and_then(|diff| diff.checked_div(base.price))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(Deviation::Percent)
        .unwrap_or(Deviation::Absent)
}

/// Comparisons for one (token, source) row. `comparisons` is aligned with
/// the matrix sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviationRow {
    pub token_id: TokenId,
    pub source: String,
    pub cell: PriceCell,
    pub comparisons: Vec<Deviation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviationGrid {
    pub sources: Vec<String>,
    pub rows: Vec<DeviationRow>,
}

impl DeviationGrid {
    pub fn get(&self, token_id: TokenId, row_source: &str, column_source: &str) -> Option<Deviation> {
        let column = self.sources.iter().position(|s| s == column_source)?;
        self.rows
            .iter()
            .find(|row| row.token_id == token_id && row.source == row_source)
            .map(|row| row.comparisons[column])
    }

    pub fn significant_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.comparisons.iter())
            .filter(|d| d.is_significant())
            .count()
    }
}

/// Every cell compared against every source of the same token. Each row
/// cell's price is measured against the column's price, so a positive value
/// means the row source quotes higher than the column source.
pub fn deviation_grid(matrix: &PriceMatrix) -> DeviationGrid {
    let sources = matrix.sources().to_vec();

    let rows = matrix
        .rows()
        .iter()
        .flat_map(|row| {
            sources.iter().zip(&row.cells).map(move |(row_source, cell)| DeviationRow {
                token_id: row.token_id,
                source: row_source.clone(),
                cell: cell.clone(),
                comparisons: matrix
                    .sources()
                    .iter()
                    .zip(&row.cells)
                    .map(|(column_source, column_cell)| {
                        if column_source == row_source {
                            Deviation::Identity
                        } else {
                            deviation(column_cell, cell)
                        }
                    })
                    .collect(),
            })
        })
        .collect();

    DeviationGrid { sources, rows }
}
