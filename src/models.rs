use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

pub type TokenId = i64;

/// Placeholder shown wherever a source or value cannot be displayed.
pub const NOT_AVAILABLE: &str = "N/A";

/// Reference token as served by `/tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub contract_address: Option<String>,
}

/// Token payload embedded in price or opportunity records. Older API
/// versions omit it entirely, newer ones may send partial objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedToken {
    #[serde(default)]
    pub id: Option<TokenId>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// What the tables print for a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayToken {
    pub symbol: String,
    pub name: String,
    /// Set only when neither a reference nor an embedded token was found.
    pub fallback: bool,
}

impl DisplayToken {
    pub fn fallback(id: Option<TokenId>) -> Self {
        let symbol = match id {
            Some(id) => format!("Token {}", id),
            None => "Unknown".to_string(),
        };
        Self {
            symbol,
            name: "Unknown".to_string(),
            fallback: true,
        }
    }

    /// Resolution order: reference token, embedded payload, fallback.
    pub fn resolve(
        id: Option<TokenId>,
        reference: Option<&Token>,
        embedded: Option<&EmbeddedToken>,
    ) -> Self {
        if let Some(token) = reference {
            return Self::from(token);
        }

        let embedded_symbol = embedded
            .and_then(|t| t.symbol.as_deref())
            .filter(|s| !s.trim().is_empty());

        match embedded_symbol {
            Some(symbol) => Self {
                symbol: symbol.to_string(),
                name: embedded
                    .and_then(|t| t.name.as_deref())
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or("Unknown")
                    .to_string(),
                fallback: false,
            },
            None => Self::fallback(id),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

impl From<&Token> for DisplayToken {
    fn from(token: &Token) -> Self {
        Self {
            symbol: token.symbol.clone(),
            name: token.name.clone(),
            fallback: false,
        }
    }
}

/// A price reading as served by `/price_records`. Decimal fields stay as raw
/// JSON until aggregation decides whether they are usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    #[serde(default)]
    pub id: Option<i64>,
    pub token_id: TokenId,
    #[serde(default)]
    pub token: Option<EmbeddedToken>,
    #[serde(default)]
    pub price_usdc: Option<Value>,
    #[serde(default)]
    pub gas_fee: Option<Value>,
    pub rpc_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A validated observation: both decimals parsed and non-negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricePoint {
    pub record_id: Option<i64>,
    pub token_id: TokenId,
    pub source: String,
    pub price: Decimal,
    pub gas_fee: Decimal,
    pub observed_at: Option<DateTime<Utc>>,
}

/// One cell of the price matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "point", rename_all = "snake_case")]
pub enum PriceCell {
    Available(PricePoint),
    Unavailable,
}

impl PriceCell {
    pub fn point(&self) -> Option<&PricePoint> {
        match self {
            PriceCell::Available(point) => Some(point),
            PriceCell::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, PriceCell::Available(_))
    }
}

/// An opportunity record as served by `/arbitrage_opportunities`. Every field
/// is optional; the normalizer decides what to do with gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOpportunity {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub token_id: Option<TokenId>,
    #[serde(default)]
    pub token: Option<EmbeddedToken>,
    #[serde(default)]
    pub buy_price: Option<Value>,
    #[serde(default)]
    pub sell_price: Option<Value>,
    #[serde(default)]
    pub profit: Option<Value>,
    #[serde(default)]
    pub gas_fee: Option<Value>,
    #[serde(default)]
    pub buy_rpc: Option<String>,
    #[serde(default)]
    pub sell_rpc: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Buy/sell endpoint of an opportunity after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SourceEndpoint {
    Endpoint { url: String, host: String },
    NotAvailable,
}

impl SourceEndpoint {
    /// Accepts only absolute URLs that carry a host.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return SourceEndpoint::NotAvailable;
        };

        match Url::parse(raw) {
            Ok(url) => match url.host_str() {
                Some(host) if !host.is_empty() => SourceEndpoint::Endpoint {
                    url: url.to_string(),
                    host: host.to_string(),
                },
                _ => SourceEndpoint::NotAvailable,
            },
            Err(_) => SourceEndpoint::NotAvailable,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SourceEndpoint::Endpoint { host, .. } => host,
            SourceEndpoint::NotAvailable => NOT_AVAILABLE,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SourceEndpoint::Endpoint { .. })
    }
}

/// Opportunity status. The API's set is open; anything other than the two
/// known values is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum OpportunityStatus {
    Detected,
    Executed,
    Other(String),
}

/// Presentation bucket for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Info,
    Success,
    Neutral,
}

impl OpportunityStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("detected") => OpportunityStatus::Detected,
            Some(s) if s.eq_ignore_ascii_case("executed") => OpportunityStatus::Executed,
            Some(s) if !s.is_empty() => OpportunityStatus::Other(s.to_string()),
            _ => OpportunityStatus::Other("unknown".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OpportunityStatus::Detected => "detected",
            OpportunityStatus::Executed => "executed",
            OpportunityStatus::Other(s) => s,
        }
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            OpportunityStatus::Detected => StatusTone::Info,
            OpportunityStatus::Executed => StatusTone::Success,
            OpportunityStatus::Other(_) => StatusTone::Neutral,
        }
    }
}

impl From<OpportunityStatus> for String {
    fn from(status: OpportunityStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Display-ready arbitrage opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbitrageOpportunity {
    pub id: Option<i64>,
    pub token_id: Option<TokenId>,
    pub token: DisplayToken,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    /// Profit percentage; zero when the record's value was unusable.
    pub profit: Decimal,
    pub gas_fee: Decimal,
    pub buy_source: SourceEndpoint,
    pub sell_source: SourceEndpoint,
    pub status: OpportunityStatus,
    pub created_at: Option<DateTime<Utc>>,
    /// Numeric fields that were missing or unparsable and got coerced to zero.
    pub coerced_fields: Vec<&'static str>,
}

impl ArbitrageOpportunity {
    pub fn is_complete(&self) -> bool {
        self.coerced_fields.is_empty()
            && self.buy_source.is_available()
            && self.sell_source.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_token_resolution_order() {
        let reference = Token {
            id: 1,
            symbol: "WETH".to_string(),
            name: "Wrapped Ether".to_string(),
            contract_address: None,
        };
        let embedded = EmbeddedToken {
            id: Some(1),
            symbol: Some("ETH".to_string()),
            name: None,
        };

        let resolved = DisplayToken::resolve(Some(1), Some(&reference), Some(&embedded));
        assert_eq!(resolved.symbol, "WETH");

        let resolved = DisplayToken::resolve(Some(1), None, Some(&embedded));
        assert_eq!(resolved.symbol, "ETH");
        assert_eq!(resolved.name, "Unknown");

        let resolved = DisplayToken::resolve(Some(7), None, None);
        assert_eq!(resolved.symbol, "Token 7");
        assert_eq!(resolved.name, "Unknown");
        assert!(resolved.is_fallback());
    }

    #[test]
    fn test_fallback_flag_is_not_inferred_from_names() {
        let lookalike = Token {
            id: 5,
            symbol: "Token 5".to_string(),
            name: "Unknown".to_string(),
            contract_address: None,
        };
        let resolved = DisplayToken::resolve(Some(5), Some(&lookalike), None);
        assert_eq!(resolved.symbol, "Token 5");
        assert!(!resolved.is_fallback());

        let embedded = EmbeddedToken {
            id: None,
            symbol: Some("Unknown".to_string()),
            name: None,
        };
        assert!(!DisplayToken::resolve(None, None, Some(&embedded)).is_fallback());
        assert!(DisplayToken::resolve(None, None, None).is_fallback());
    }

    #[test]
    fn test_blank_embedded_symbol_falls_back() {
        let embedded = EmbeddedToken {
            id: None,
            symbol: Some("  ".to_string()),
            name: Some("Something".to_string()),
        };
        let resolved = DisplayToken::resolve(Some(3), None, Some(&embedded));
        assert_eq!(resolved, DisplayToken::fallback(Some(3)));
    }

    #[test]
    fn test_source_endpoint_validation() {
        let endpoint = SourceEndpoint::parse(Some("https://polygon-rpc.com/v1"));
        assert_eq!(endpoint.label(), "polygon-rpc.com");
        assert!(endpoint.is_available());

        assert_eq!(SourceEndpoint::parse(Some("not a url")), SourceEndpoint::NotAvailable);
        assert_eq!(SourceEndpoint::parse(Some("mailto:ops@example.com")), SourceEndpoint::NotAvailable);
        assert_eq!(SourceEndpoint::parse(Some("")), SourceEndpoint::NotAvailable);
        assert_eq!(SourceEndpoint::parse(None).label(), NOT_AVAILABLE);
    }

    #[test]
    fn test_status_is_open_enum() {
        assert_eq!(OpportunityStatus::parse(Some("detected")), OpportunityStatus::Detected);
        assert_eq!(OpportunityStatus::parse(Some("Executed")), OpportunityStatus::Executed);

        let odd = OpportunityStatus::parse(Some("expired"));
        assert_eq!(odd.as_str(), "expired");
        assert_eq!(odd.tone(), StatusTone::Neutral);

        assert_eq!(OpportunityStatus::parse(None).as_str(), "unknown");
        assert_eq!(OpportunityStatus::Detected.tone(), StatusTone::Info);
        assert_eq!(OpportunityStatus::Executed.tone(), StatusTone::Success);
    }

    #[test]
    fn test_raw_opportunity_tolerates_sparse_payload() {
        let raw: RawOpportunity = serde_json::from_str(r#"{"token_id": 99, "profit": "abc"}"#).unwrap();
        assert_eq!(raw.token_id, Some(99));
        assert!(raw.buy_price.is_none());
        assert!(raw.status.is_none());
    }

    #[test]
    fn test_price_observation_wire_shape() {
        let obs: PriceObservation = serde_json::from_str(
            r#"{"id": 5, "token_id": 1, "price_usdc": "1.000000", "gas_fee": "0.010000",
                "rpc_url": "https://rpc-a.example", "token": {"id": 1, "symbol": "WETH", "name": "Wrapped Ether"}}"#,
        )
        .unwrap();
        assert_eq!(obs.id, Some(5));
        assert_eq!(obs.token.and_then(|t| t.symbol).as_deref(), Some("WETH"));
        assert!(obs.created_at.is_none());
    }
}
