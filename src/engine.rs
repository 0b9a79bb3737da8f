//! Forecast engine over a loaded posterior
//!
//! Holds the posterior once and runs forecasts, conditional forecasts and
//! decompositions against it with whatever configuration each call needs.

use crate::decomposition::{decompose_with, DecompositionConfig, DecompositionTable};
use crate::error::Result;
use crate::forecast::{
    conditional_forecast_with, unconditional_forecast_with, ConditionalConfig, ConditionalForecast, ConstraintSpec,
    ForecastConfig, UnconditionalForecast,
};
use crate::model::{load_posterior, Posterior};
use crate::runner::{DrawObserver, RunControl};
use std::path::Path;

/// Pre-loaded posterior plus the run hooks shared by every call
///
/// # Example
/// ```ignore
/// let engine = ForecastEngine::load("posterior.json")?;
/// let fc = engine.unconditional(&ForecastConfig { horizon: 8, ..Default::default() })?;
/// let spec = ConstraintSpec::new(8, engine.posterior().k()).with_target(0, 1, 5.0)?;
/// let cond = engine.conditional(&fc, &spec, &ConditionalConfig::default())?;
/// ```
pub struct ForecastEngine<'a> {
    posterior: Posterior,
    control: RunControl<'a>,
}

impl<'a> ForecastEngine<'a> {
    pub fn new(posterior: Posterior) -> Self {
        Self {
            posterior,
            control: RunControl::default(),
        }
    }

    /// Load a posterior file; unstable draws are kept unless [`Self::stable_only`] is called
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(load_posterior(path)?))
    }

    /// Drop draws the estimator flagged as unstable
    pub fn stable_only(mut self) -> Self {
        self.posterior.retain_stable();
        self
    }

    pub fn with_control(mut self, control: RunControl<'a>) -> Self {
        self.control = control;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn DrawObserver) -> Self {
        self.control = self.control.with_observer(observer);
        self
    }

    pub fn unconditional(&self, config: &ForecastConfig) -> Result<UnconditionalForecast> {
        unconditional_forecast_with(&self.posterior, config, &self.control)
    }

    pub fn conditional(
        &self,
        unconditional: &UnconditionalForecast,
        constraints: &ConstraintSpec,
        config: &ConditionalConfig,
    ) -> Result<ConditionalForecast> {
        conditional_forecast_with(&self.posterior, unconditional, constraints, config, &self.control)
    }

    pub fn decompose(&self, config: &DecompositionConfig) -> Result<DecompositionTable> {
        decompose_with(&self.posterior, config, &self.control)
    }

    pub fn posterior(&self) -> &Posterior {
        &self.posterior
    }
}
