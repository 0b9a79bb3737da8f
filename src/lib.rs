//! GVAR Forecast - posterior-predictive forecasting for Bayesian Global VAR models
//!
//! This library provides:
//! - Companion-form systems and impulse responses per posterior draw
//! - Unconditional predictive simulation with quantile bands and holdout scores
//! - Conditional forecasts via minimum-norm structural shock paths
//! - Generalized forecast-error variance decompositions
//! - Draw-parallel execution with progress observers and cancellation

pub mod decomposition;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod model;
pub mod report;
pub mod runner;
pub mod summary;
pub mod var;

// Re-export commonly used types
pub use decomposition::{decompose, DecompositionConfig, DecompositionMode, DecompositionTable};
pub use engine::ForecastEngine;
pub use error::{ForecastError, Result};
pub use forecast::{
    conditional_forecast, unconditional_forecast, ConditionalConfig, ConditionalForecast, ConstraintSpec,
    ForecastConfig, PinvTolerance, UnconditionalForecast,
};
pub use model::{Posterior, PosteriorDraw, SyntheticPosterior, VariableId};
pub use runner::{CancellationToken, DrawObserver, LogProgress, RunControl};
pub use summary::{HoldoutEvaluation, QuantileLevel, QuantileSummary};
pub use var::ShockIdentification;
