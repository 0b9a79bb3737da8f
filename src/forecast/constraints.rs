//! Future path constraints for conditional forecasts
//!
//! A constraint specification is a horizon x variable matrix of targets
//! (NaN = unconstrained) with an optional matrix of per-target standard
//! deviations (NaN or absent = 0, a hard constraint).

use crate::error::{ForecastError, Result};
use crate::model::VariableId;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSpec {
    /// Targets, horizon x variable
    targets: Array2<f64>,
    /// Standard deviations, horizon x variable
    sd: Option<Array2<f64>>,
}

/// One CSV row: `horizon,variable,value[,sd]`, horizon counted from 1
#[derive(Debug, Deserialize)]
struct ConstraintRow {
    horizon: usize,
    variable: String,
    value: f64,
    #[serde(default)]
    sd: Option<f64>,
}

impl ConstraintSpec {
    /// Empty specification: nothing constrained
    pub fn new(horizon: usize, k: usize) -> Self {
        Self {
            targets: Array2::from_elem((horizon, k), f64::NAN),
            sd: None,
        }
    }

    /// Build from target and standard deviation matrices, both horizon x variable
    pub fn from_arrays(targets: Array2<f64>, sd: Option<Array2<f64>>) -> Result<Self> {
        if let Some(sd) = &sd {
            if sd.dim() != targets.dim() {
                return Err(ForecastError::shape("constraint sd", targets.dim(), sd.dim()));
            }
        }
        let spec = Self { targets, sd };
        spec.check_values()?;
        Ok(spec)
    }

    fn check_index(&self, horizon: usize, variable: usize) -> Result<()> {
        let (h, k) = self.targets.dim();
        if horizon >= h || variable >= k {
            return Err(ForecastError::InvalidArgument(format!(
                "constraint cell ({}, {}) outside a {}x{} specification",
                horizon, variable, h, k
            )));
        }
        Ok(())
    }

    /// Constrain `variable` at horizon index `horizon` (0 = first forecast period)
    pub fn with_target(mut self, horizon: usize, variable: usize, value: f64) -> Result<Self> {
        self.check_index(horizon, variable)?;
        if value.is_infinite() {
            return Err(ForecastError::NonFiniteConstraint { horizon, variable });
        }
        self.targets[[horizon, variable]] = value;
        Ok(self)
    }

    /// Attach a standard deviation to an already constrained cell
    pub fn with_sd(mut self, horizon: usize, variable: usize, sd: f64) -> Result<Self> {
        self.check_index(horizon, variable)?;
        if !(sd.is_finite() && sd >= 0.0) {
            return Err(ForecastError::InvalidArgument(format!(
                "constraint sd must be a non-negative number, got {}",
                sd
            )));
        }
        let dim = self.targets.dim();
        self.sd.get_or_insert_with(|| Array2::zeros(dim))[[horizon, variable]] = sd;
        Ok(self)
    }

    /// `(horizon, K)`
    pub fn dim(&self) -> (usize, usize) {
        self.targets.dim()
    }

    pub fn is_constrained(&self, horizon: usize, variable: usize) -> bool {
        !self.targets[[horizon, variable]].is_nan()
    }

    pub fn target(&self, horizon: usize, variable: usize) -> f64 {
        self.targets[[horizon, variable]]
    }

    /// Standard deviation of a cell, zero when none was given
    pub fn sd(&self, horizon: usize, variable: usize) -> f64 {
        match &self.sd {
            Some(sd) if !sd[[horizon, variable]].is_nan() => sd[[horizon, variable]],
            _ => 0.0,
        }
    }

    /// Constrained `(horizon, variable)` cells, ordered by horizon then variable
    pub fn constrained_cells(&self) -> Vec<(usize, usize)> {
        let (h, k) = self.dim();
        (0..h)
            .flat_map(|i| (0..k).map(move |j| (i, j)))
            .filter(|&(i, j)| self.is_constrained(i, j))
            .collect()
    }

    fn check_values(&self) -> Result<()> {
        for ((h, j), v) in self.targets.indexed_iter() {
            if v.is_infinite() {
                return Err(ForecastError::NonFiniteConstraint { horizon: h, variable: j });
            }
        }
        if let Some(sd) = &self.sd {
            for ((h, j), v) in sd.indexed_iter() {
                if v.is_infinite() || *v < 0.0 {
                    return Err(ForecastError::InvalidArgument(format!(
                        "constraint sd at horizon {}, variable {} must be a non-negative number, got {}",
                        h, j, v
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check the specification against the forecast it conditions
    pub fn validate(&self, horizon: usize, k: usize) -> Result<()> {
        if self.dim() != (horizon, k) {
            return Err(ForecastError::shape("constraints", (horizon, k), self.dim()));
        }
        self.check_values()
    }

    /// Parse CSV rows `horizon,variable,value[,sd]` against the model's variables
    pub fn from_csv_reader<R: Read>(
        reader: R,
        horizon: usize,
        variables: &[VariableId],
        separator: &str,
    ) -> Result<Self> {
        let mut spec = Self::new(horizon, variables.len());
        let mut csv_reader = csv::Reader::from_reader(reader);
        for result in csv_reader.deserialize() {
            let row: ConstraintRow = result?;
            if row.horizon == 0 || row.horizon > horizon {
                return Err(ForecastError::InvalidArgument(format!(
                    "constraint horizon {} outside 1..={}",
                    row.horizon, horizon
                )));
            }
            let variable = variables
                .iter()
                .position(|id| id.matches(&row.variable, separator))
                .ok_or_else(|| ForecastError::UnknownVariable(row.variable.clone()))?;
            spec = spec.with_target(row.horizon - 1, variable, row.value)?;
            if let Some(sd) = row.sd {
                spec = spec.with_sd(row.horizon - 1, variable, sd)?;
            }
        }
        Ok(spec)
    }

    /// Load constraints from a CSV file
    pub fn load_csv<P: AsRef<Path>>(
        path: P,
        horizon: usize,
        variables: &[VariableId],
        separator: &str,
    ) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(file, horizon, variables, separator)
    }
}
