use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::client::DashboardApi;
use crate::view::ViewModel;

/// What the rendering side reads. `view` is only ever swapped whole.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub view: Option<ViewModel>,
    /// Set by a failed cycle, cleared by the next successful one.
    pub last_error: Option<String>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub completed_cycles: u64,
    pub failed_cycles: u64,
}

pub type SharedState = Arc<RwLock<DashboardState>>;

pub struct Poller<A> {
    api: A,
    state: SharedState,
    interval: Duration,
}

impl<A: DashboardApi> Poller<A> {
    pub fn new(api: A, state: SharedState, interval: Duration) -> Self {
        Self { api, state, interval }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub async fn run(&self) -> Result<()> {
        log::info!("Starting dashboard poller (every {:?})", self.interval);

        loop {
            if self.refresh().await {
                if let Some(view) = self.state.read().view.as_ref() {
                    log::debug!("\n{}", view.render_price_table());
                    log::debug!("\n{}", view.render_opportunity_table());
                }
            }

            sleep(self.interval).await;
        }
    }

    /// One refresh cycle. Returns whether the shared view was replaced.
    pub async fn refresh(&self) -> bool {
        let fetched = tokio::try_join!(
            self.api.tokens(),
            self.api.price_records(),
            self.api.opportunities()
        );

        match fetched {
            Ok((tokens, prices, opportunities)) => {
                let view = ViewModel::build(tokens, &prices, &opportunities, Utc::now());
                log_degraded(&view);
                log::info!(
                    "Refreshed view: {} tokens x {} sources, {} significant deviations, {} opportunities",
                    view.matrix.len(),
                    view.matrix.sources().len(),
                    view.deviations.significant_count(),
                    view.opportunities.len()
                );

                let mut state = self.state.write();
                state.view = Some(view);
                state.last_error = None;
                state.completed_cycles += 1;
                true
            }
            Err(e) => {
                log::error!("Error refreshing dashboard data: {}", e);

                let mut state = self.state.write();
                state.last_error = Some(e.to_string());
                state.last_failure_at = Some(Utc::now());
                state.failed_cycles += 1;
                false
            }
        }
    }
}

fn log_degraded(view: &ViewModel) {
    let unavailable = view.matrix.unavailable_cells();
    if unavailable > 0 {
        log::debug!("{} price cells unavailable", unavailable);
    }

    for opp in view.opportunities.iter().filter(|o| !o.is_complete() || o.token.is_fallback()) {
        log::warn!(
            "Opportunity {:?} ({}) is incomplete: coerced {:?}, buy {}, sell {}",
            opp.id,
            opp.token.symbol,
            opp.coerced_fields,
            opp.buy_source.label(),
            opp.sell_source.label()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DashboardError, Result as ApiResult};
    use crate::models::{PriceObservation, RawOpportunity, Token};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StaticApi {
        prices: RwLock<Vec<PriceObservation>>,
        fail_opportunities: AtomicBool,
    }

    impl StaticApi {
        fn new(prices: Vec<PriceObservation>) -> Self {
            Self {
                prices: RwLock::new(prices),
                fail_opportunities: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl DashboardApi for Arc<StaticApi> {
        async fn tokens(&self) -> ApiResult<Vec<Token>> {
            Ok(vec![Token {
                id: 1,
                symbol: "WETH".to_string(),
                name: "Wrapped Ether".to_string(),
                contract_address: None,
            }])
        }

        async fn price_records(&self) -> ApiResult<Vec<PriceObservation>> {
            Ok(self.prices.read().clone())
        }

        async fn opportunities(&self) -> ApiResult<Vec<RawOpportunity>> {
            if self.fail_opportunities.load(Ordering::SeqCst) {
                return Err(DashboardError::Status {
                    endpoint: "arbitrage_opportunities".to_string(),
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                });
            }
            Ok(vec![serde_json::from_value(json!({"id": 1, "token_id": 1, "profit": "0.8"})).unwrap()])
        }
    }

    fn obs(source: &str, price: &str) -> PriceObservation {
        PriceObservation {
            id: None,
            token_id: 1,
            token: None,
            price_usdc: Some(json!(price)),
            gas_fee: Some(json!("0.01")),
            rpc_url: source.to_string(),
            created_at: None,
        }
    }

    fn poller(api: Arc<StaticApi>) -> Poller<Arc<StaticApi>> {
        Poller::new(api, SharedState::default(), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_successful_cycle_publishes_view() {
        let api = Arc::new(StaticApi::new(vec![obs("https://a.example", "1"), obs("https://b.example", "1.02")]));
        let poller = poller(api);

        assert!(poller.refresh().await);

        let state = poller.state();
        let state = state.read();
        let view = state.view.as_ref().unwrap();
        assert_eq!(view.matrix.sources().len(), 2);
        assert_eq!(view.opportunities.len(), 1);
        assert_eq!(state.completed_cycles, 1);
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_previous_view() {
        let api = Arc::new(StaticApi::new(vec![obs("https://a.example", "1")]));
        let poller = poller(api.clone());
        assert!(poller.refresh().await);
        let before = poller.state().read().view.clone();

        // New prices arrive but the opportunities fetch fails: nothing of the
        // new cycle may leak into the published view.
        *api.prices.write() = vec![obs("https://z.example", "5")];
        api.fail_opportunities.store(true, Ordering::SeqCst);
        assert!(!poller.refresh().await);

        {
            let state = poller.state();
            let state = state.read();
            assert_eq!(state.view, before);
            assert!(state.last_error.as_deref().unwrap().contains("503"));
            assert_eq!(state.failed_cycles, 1);
        }

        api.fail_opportunities.store(false, Ordering::SeqCst);
        assert!(poller.refresh().await);

        let state = poller.state();
        let state = state.read();
        assert!(state.last_error.is_none());
        assert_eq!(state.view.as_ref().unwrap().matrix.sources(), ["https://z.example"]);
    }

    #[tokio::test]
    async fn test_failure_before_first_success_leaves_no_view() {
        let api = Arc::new(StaticApi::new(Vec::new()));
        api.fail_opportunities.store(true, Ordering::SeqCst);
        let poller = poller(api);

        assert!(!poller.refresh().await);
        assert!(poller.state().read().view.is_none());
    }
}
