//! Posterior summaries: quantile bands and holdout scores

mod quantiles;
mod scoring;

pub use quantiles::{cell_quantiles, quantiles_over_draws, QuantileLevel, QuantileSummary};
pub use scoring::{ensemble_moments, gaussian_log_score, HoldoutEvaluation};
