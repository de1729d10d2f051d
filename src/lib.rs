//! Price comparison core for the RPC arbitrage dashboard.
//!
//! Price observations from several RPC endpoints are folded into a
//! token × source [`PriceMatrix`], every cell is compared against the other
//! sources of its token, and arbitrage records are normalized and ranked for
//! display. The HTTP client and poller around it are thin collaborators.

pub mod aggregator;
pub mod client;
pub mod config;
pub mod deviation;
pub mod error;
pub mod format;
pub mod models;
pub mod normalizer;
pub mod numeric;
pub mod poller;
pub mod view;

pub use aggregator::{PriceMatrix, aggregate, aggregate_with_reference};
pub use deviation::{Deviation, deviation, deviation_grid, is_significant};
pub use error::{DashboardError, Result};
pub use normalizer::{normalize, tokens_by_id};
pub use view::ViewModel;
