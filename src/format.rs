//! Display strings for the dashboard tables.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use url::Url;

use crate::deviation::{Deviation, round_display};
use crate::models::{NOT_AVAILABLE, PriceCell};

/// Marker printed where a source is compared with itself.
pub const IDENTITY_MARKER: &str = "-";

const PRICE_DECIMALS: u32 = 6;

/// `$1.234568`
pub fn format_price(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    format!("${:.6}", rounded)
}

/// `1.23%`
pub fn format_percent(value: Decimal) -> String {
    format!("{:.2}%", round_display(value))
}

pub fn format_deviation(deviation: &Deviation) -> String {
    match deviation {
        Deviation::Identity => IDENTITY_MARKER.to_string(),
        Deviation::Absent => NOT_AVAILABLE.to_string(),
        Deviation::Percent(p) => format_percent(*p),
    }
}

pub fn format_cell_price(cell: &PriceCell) -> String {
    cell.point()
        .map(|p| format_price(p.price))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_cell_gas(cell: &PriceCell) -> String {
    cell.point()
        .map(|p| format_price(p.gas_fee))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_cell_updated(cell: &PriceCell) -> String {
    format_timestamp(cell.point().and_then(|p| p.observed_at))
}

/// Short column label for a source: its hostname when it is a URL, the raw
/// identifier otherwise.
pub fn source_label(source: &str) -> String {
    Url::parse(source)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| source.to_string())
}

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
