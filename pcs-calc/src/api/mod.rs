//! HTTP API handlers for pcs-calc

pub mod calculate;
pub mod health;
pub mod history;
pub mod metrics;

pub use calculate::calculate;
pub use health::health_routes;
pub use history::history_routes;
pub use metrics::get_metrics;
