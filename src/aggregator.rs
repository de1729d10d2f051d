use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::models::{DisplayToken, PriceCell, PriceObservation, PricePoint, Token, TokenId};
use crate::numeric::{parse_non_negative, parse_timestamp};

/// One token row of the matrix. `cells` is aligned with
/// [`PriceMatrix::sources`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRow {
    pub token_id: TokenId,
    pub token: DisplayToken,
    pub cells: Vec<PriceCell>,
}

/// Token × source grid built from a batch of observations.
///
/// Every (token, source) pair in the grid holds either a validated
/// [`PricePoint`] or [`PriceCell::Unavailable`]. Rows and columns keep the
/// order in which they were first seen so repeated builds over the same input
/// render identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriceMatrix {
    sources: Vec<String>,
    rows: Vec<PriceRow>,
    #[serde(skip)]
    row_index: HashMap<TokenId, usize>,
}

impl PriceMatrix {
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn token_ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.rows.iter().map(|row| row.token_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, token_id: TokenId) -> Option<&PriceRow> {
        self.row_index.get(&token_id).map(|&i| &self.rows[i])
    }

    pub fn source_index(&self, source: &str) -> Option<usize> {
        self.sources.iter().position(|s| s == source)
    }

    /// `None` only when the token or source is not part of the grid at all.
    pub fn cell(&self, token_id: TokenId, source: &str) -> Option<&PriceCell> {
        let column = self.source_index(source)?;
        self.row(token_id).map(|row| &row.cells[column])
    }

    pub fn display_token(&self, token_id: TokenId) -> DisplayToken {
        self.row(token_id)
            .map(|row| row.token.clone())
            .unwrap_or_else(|| DisplayToken::fallback(Some(token_id)))
    }

    /// Spread between the cheapest and the most expensive source for a token,
    /// as a percentage of the cheapest. Zero prices are ignored. `None` when
    /// fewer than two sources report a usable price.
    pub fn price_spread(&self, token_id: TokenId) -> Option<Decimal> {
        let prices: Vec<Decimal> = self
            .row(token_id)?
            .cells
            .iter()
            .filter_map(PriceCell::point)
            .map(|p| p.price)
            .filter(|p| *p > Decimal::ZERO)
            .collect();

        if prices.len() < 2 {
            return None;
        }

        let min = prices.iter().copied().min()?;
        let max = prices.iter().copied().max()?;
        (max - min)
            .checked_div(min)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    }

    pub fn unavailable_cells(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .filter(|cell| !cell.is_available())
            .count()
    }
}

/// Build the matrix from observations alone.
pub fn aggregate(observations: &[PriceObservation]) -> PriceMatrix {
    aggregate_with_reference(observations, &[])
}

/// Build the matrix over the union of `reference` tokens and the tokens seen
/// in `observations`.
///
/// Reference tokens come first, in reference order, and name their rows.
/// Tokens only present in live data follow in first-seen order. When the same
/// (token, source) pair is observed more than once the last observation in
/// input order wins, including when that last observation is unusable.
pub fn aggregate_with_reference(observations: &[PriceObservation], reference: &[Token]) -> PriceMatrix {
    let sources = distinct_in_order(observations.iter().map(|o| o.rpc_url.as_str()));

    let latest: HashMap<(TokenId, &str), &PriceObservation> = observations
        .iter()
        .fold(HashMap::new(), |mut acc, obs| {
            acc.insert((obs.token_id, obs.rpc_url.as_str()), obs);
            acc
        });

    let reference_by_id: HashMap<TokenId, &Token> = reference.iter().rev().map(|t| (t.id, t)).collect();

    let token_ids = distinct_in_order(
        reference
            .iter()
            .map(|t| t.id)
            .chain(observations.iter().map(|o| o.token_id)),
    );

    let rows: Vec<PriceRow> = token_ids
        .iter()
        .map(|&token_id| {
            let cells = sources
                .iter()
                .map(|source| match latest.get(&(token_id, *source)) {
                    Some(obs) => validate(obs),
                    None => PriceCell::Unavailable,
                })
                .collect();

            let embedded = observations
                .iter()
                .rev()
                .filter(|o| o.token_id == token_id)
                .find_map(|o| o.token.as_ref());

            PriceRow {
                token_id,
                token: DisplayToken::resolve(Some(token_id), reference_by_id.get(&token_id).copied(), embedded),
                cells,
            }
        })
        .collect();

    let row_index = rows.iter().enumerate().map(|(i, row)| (row.token_id, i)).collect();

    PriceMatrix {
        sources: sources.into_iter().map(str::to_string).collect(),
        rows,
        row_index,
    }
}

/// Turn a raw observation into a cell. Either decimal failing to parse as a
/// non-negative number makes the whole cell unavailable.
fn validate(obs: &PriceObservation) -> PriceCell {
    let price = parse_non_negative(obs.price_usdc.as_ref());
    let gas_fee = parse_non_negative(obs.gas_fee.as_ref());

    match (price, gas_fee) {
        (Some(price), Some(gas_fee)) => PriceCell::Available(PricePoint {
            record_id: obs.id,
            token_id: obs.token_id,
            source: obs.rpc_url.clone(),
            price,
            gas_fee,
            observed_at: parse_timestamp(obs.created_at.as_deref()),
        }),
        _ => PriceCell::Unavailable,
    }
}

fn distinct_in_order<T, I>(items: I) -> Vec<T>
where
    T: Copy + Eq + std::hash::Hash,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(*item)).collect()
}
