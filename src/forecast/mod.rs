//! Posterior-predictive forecasts
//!
//! Unconditional forecasts simulate one path per draw from the predictive
//! recursion; conditional forecasts reuse those paths and solve, per draw,
//! for the minimum-norm shock sequence that meets a set of constraints.

mod conditional;
mod config;
mod constraints;
mod ensemble;
mod unconditional;

pub use conditional::{
    conditional_draw, conditional_forecast, conditional_forecast_with, constraint_design, propagate_shocks,
    ConditionalForecast,
};
pub use config::{ConditionalConfig, ForecastConfig, PinvTolerance};
pub use constraints::ConstraintSpec;
pub use ensemble::PathEnsemble;
pub use unconditional::{
    simulate_draw, unconditional_forecast, unconditional_forecast_with, PredictiveRecursion, UnconditionalForecast,
};
