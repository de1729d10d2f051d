use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write;

use crate::aggregator::{PriceMatrix, aggregate_with_reference};
use crate::deviation::{DeviationGrid, deviation_grid};
use crate::format::{
    format_cell_gas, format_cell_price, format_cell_updated, format_deviation, format_percent, format_price, format_timestamp,
    source_label,
};
use crate::models::{ArbitrageOpportunity, PriceObservation, RawOpportunity, Token};
use crate::normalizer::{normalize, tokens_by_id};

/// Everything one refresh cycle produces. Replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub tokens: Vec<Token>,
    pub matrix: PriceMatrix,
    pub deviations: DeviationGrid,
    pub opportunities: Vec<ArbitrageOpportunity>,
    pub refreshed_at: DateTime<Utc>,
}

impl ViewModel {
    pub fn build(
        tokens: Vec<Token>,
        prices: &[PriceObservation],
        opportunities: &[RawOpportunity],
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        let matrix = aggregate_with_reference(prices, &tokens);
        let deviations = deviation_grid(&matrix);
        let opportunities = normalize(opportunities, &tokens_by_id(&tokens));

        Self {
            tokens,
            matrix,
            deviations,
            opportunities,
            refreshed_at,
        }
    }

    /// Plain-text "Live Price Comparison" table: one line per available
    /// (token, source) cell with its deviation against every source.
    pub fn render_price_table(&self) -> String {
        let mut out = String::new();
        if self.matrix.is_empty() {
            out.push_str("No price data available\n");
            return out;
        }

        let _ = write!(
            out,
            "{:<12} {:<28} {:>16} {:>12} {:>10} {:<23}",
            "Token", "RPC", "Price (USDC)", "Gas Fee", "Spread", "Updated At"
        );
        for source in self.matrix.sources() {
            let _ = write!(out, " {:>24}", format!("vs {}", source_label(source)));
        }
        out.push('\n');

        for row in &self.deviations.rows {
            if !row.cell.is_available() {
                continue;
            }
            let token = self.matrix.display_token(row.token_id);
            // fewer than two usable prices shows as no spread
            let spread = self.matrix.price_spread(row.token_id).unwrap_or(Decimal::ZERO);

            let _ = write!(
                out,
                "{:<12} {:<28} {:>16} {:>12} {:>10} {:<23}",
                token.symbol,
                source_label(&row.source),
                format_cell_price(&row.cell),
                format_cell_gas(&row.cell),
                format_percent(spread),
                format_cell_updated(&row.cell)
            );
            for deviation in &row.comparisons {
                let mut text = format_deviation(deviation);
                if deviation.is_significant() {
                    text.push('*');
                }
                let _ = write!(out, " {:>24}", text);
            }
            out.push('\n');
        }
        out
    }

    /// Plain-text "Arbitrage Opportunities" table, already ranked.
    pub fn render_opportunity_table(&self) -> String {
        let mut out = String::new();
        if self.opportunities.is_empty() {
            out.push_str("No arbitrage opportunities\n");
            return out;
        }

        let _ = writeln!(
            out,
            "{:<12} {:>14} {:>14} {:>9} {:<24} {:<24} {:>12} {:<10} {}",
            "Token", "Buy Price", "Sell Price", "Profit %", "Buy RPC", "Sell RPC", "Gas Fee", "Status", "Detected At"
        );
        for opp in &self.opportunities {
            let _ = writeln!(
                out,
                "{:<12} {:>14} {:>14} {:>9} {:<24} {:<24} {:>12} {:<10} {}",
                opp.token.symbol,
                format_price(opp.buy_price),
                format_price(opp.sell_price),
                format_percent(opp.profit),
                opp.buy_source.label(),
                opp.sell_source.label(),
                format_price(opp.gas_fee),
                opp.status.as_str(),
                format_timestamp(opp.created_at)
            );
        }
        out
    }
}
