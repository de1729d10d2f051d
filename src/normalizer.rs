use std::collections::HashMap;

use crate::models::{
    ArbitrageOpportunity, DisplayToken, OpportunityStatus, RawOpportunity, SourceEndpoint, Token, TokenId,
};
use crate::numeric::{decimal_or_zero, parse_timestamp};

/// Index reference tokens by id. With duplicate ids the first entry wins.
pub fn tokens_by_id(tokens: &[Token]) -> HashMap<TokenId, Token> {
    tokens.iter().rev().map(|t| (t.id, t.clone())).collect()
}

/// Turn raw opportunity records into display rows ranked by profit.
///
/// Nothing is dropped: unknown tokens get a placeholder, unusable numbers
/// count as zero, malformed endpoints become [`SourceEndpoint::NotAvailable`].
/// Equal profits keep their arrival order.
pub fn normalize(raw: &[RawOpportunity], tokens_by_id: &HashMap<TokenId, Token>) -> Vec<ArbitrageOpportunity> {
    let mut opportunities: Vec<ArbitrageOpportunity> =
        raw.iter().map(|record| normalize_one(record, tokens_by_id)).collect();

    // stable
    opportunities.sort_by(|a, b| b.profit.cmp(&a.profit));
    opportunities
}

fn normalize_one(record: &RawOpportunity, tokens_by_id: &HashMap<TokenId, Token>) -> ArbitrageOpportunity {
    let token_id = record.token_id.or_else(|| record.token.as_ref().and_then(|t| t.id));
    let reference = token_id.and_then(|id| tokens_by_id.get(&id));
    let token = DisplayToken::resolve(token_id, reference, record.token.as_ref());

    let mut coerced_fields = Vec::new();
    let mut coerce = |field: &'static str, value: Option<&serde_json::Value>| {
        let (parsed, fell_back) = decimal_or_zero(value);
        if fell_back {
            coerced_fields.push(field);
        }
        parsed
    };

    let buy_price = coerce("buy_price", record.buy_price.as_ref());
    let sell_price = coerce("sell_price", record.sell_price.as_ref());
    let profit = coerce("profit", record.profit.as_ref());
    let gas_fee = coerce("gas_fee", record.gas_fee.as_ref());

    ArbitrageOpportunity {
        id: record.id,
        token_id,
        token,
        buy_price,
        sell_price,
        profit,
        gas_fee,
        buy_source: SourceEndpoint::parse(record.buy_rpc.as_deref()),
        sell_source: SourceEndpoint::parse(record.sell_rpc.as_deref()),
        status: OpportunityStatus::parse(record.status.as_deref()),
        created_at: parse_timestamp(record.created_at.as_deref()),
        coerced_fields,
    }
}
