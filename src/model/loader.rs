//! Load and save posterior files
//!
//! Posterior files are JSON with row-major nested arrays. Combined variable
//! names are split into [`VariableId`]s here and nowhere else.

use super::draw::{CoefficientLayout, ModelDims, PosteriorDraw};
use super::ident::{VariableId, DEFAULT_SEPARATOR};
use super::posterior::Posterior;
use crate::error::{ForecastError, Result};
use nalgebra::DMatrix;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_stable() -> bool {
    true
}

/// Raw posterior file layout
#[derive(Debug, Serialize, Deserialize)]
struct PosteriorFile {
    variables: Vec<String>,
    #[serde(default = "default_separator")]
    separator: String,
    plag: usize,
    constant: bool,
    trend: bool,
    #[serde(default)]
    layout: CoefficientLayout,
    data: Vec<Vec<f64>>,
    #[serde(default)]
    holdout: Option<Vec<Vec<f64>>>,
    draws: Vec<DrawRecord>,
}

/// Raw draw record
#[derive(Debug, Serialize, Deserialize)]
struct DrawRecord {
    coefficients: Vec<Vec<f64>>,
    ginv: Vec<Vec<f64>>,
    s: Vec<Vec<f64>>,
    #[serde(default = "default_stable")]
    stable: bool,
    /// Indexed [response][shock][horizon]
    #[serde(default)]
    impulse_responses: Option<Vec<Vec<Vec<f64>>>>,
}

fn matrix_from_rows(what: &str, rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let nrows = rows.len();
    let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
    if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
        return Err(ForecastError::ShapeMismatch {
            what: what.to_string(),
            expected: format!("rows of length {}", ncols),
            actual: format!("row of length {}", bad.len()),
        });
    }
    Ok(DMatrix::from_fn(nrows, ncols, |i, j| rows[i][j]))
}

fn matrix_to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}

fn tensor_from_nested(nested: &[Vec<Vec<f64>>]) -> Result<Array3<f64>> {
    let d0 = nested.len();
    let d1 = nested.first().map(|x| x.len()).unwrap_or(0);
    let d2 = nested.first().and_then(|x| x.first()).map(|x| x.len()).unwrap_or(0);
    let flat: Vec<f64> = nested.iter().flatten().flatten().copied().collect();
    Array3::from_shape_vec((d0, d1, d2), flat).map_err(|e| ForecastError::ShapeMismatch {
        what: "impulse_responses".to_string(),
        expected: format!("{}x{}x{}", d0, d1, d2),
        actual: e.to_string(),
    })
}

impl DrawRecord {
    fn into_draw(self) -> Result<PosteriorDraw> {
        let mut draw = PosteriorDraw::new(
            matrix_from_rows("coefficients", &self.coefficients)?,
            matrix_from_rows("ginv", &self.ginv)?,
            matrix_from_rows("s", &self.s)?,
        );
        draw.stable = self.stable;
        if let Some(irf) = self.impulse_responses {
            draw.impulse_responses = Some(tensor_from_nested(&irf)?);
        }
        Ok(draw)
    }

    fn from_draw(draw: &PosteriorDraw) -> Self {
        Self {
            coefficients: matrix_to_rows(&draw.coefficients),
            ginv: matrix_to_rows(&draw.ginv),
            s: matrix_to_rows(&draw.s),
            stable: draw.stable,
            impulse_responses: draw.impulse_responses.as_ref().map(|irf| {
                irf.outer_iter()
                    .map(|plane| plane.outer_iter().map(|row| row.to_vec()).collect())
                    .collect()
            }),
        }
    }
}

impl PosteriorFile {
    fn into_posterior(self) -> Result<Posterior> {
        let variables: Vec<VariableId> = self
            .variables
            .iter()
            .map(|name| VariableId::parse(name, &self.separator))
            .collect();
        let dims = ModelDims::new(variables.len(), self.plag, self.constant, self.trend);
        let draws = self
            .draws
            .into_iter()
            .map(DrawRecord::into_draw)
            .collect::<Result<Vec<_>>>()?;
        let holdout = match self.holdout {
            Some(rows) if !rows.is_empty() => Some(matrix_from_rows("holdout", &rows)?),
            _ => None,
        };
        let posterior = Posterior {
            variables,
            dims,
            layout: self.layout,
            data: matrix_from_rows("data", &self.data)?,
            draws,
            holdout,
        };
        posterior.validate()?;
        Ok(posterior)
    }

    fn from_posterior(posterior: &Posterior, separator: &str) -> Self {
        Self {
            variables: posterior.variables.iter().map(|v| v.label(separator)).collect(),
            separator: separator.to_string(),
            plag: posterior.dims.plag,
            constant: posterior.dims.constant,
            trend: posterior.dims.trend,
            layout: posterior.layout,
            data: matrix_to_rows(&posterior.data),
            holdout: posterior.holdout.as_ref().map(matrix_to_rows),
            draws: posterior.draws.iter().map(DrawRecord::from_draw).collect(),
        }
    }
}

/// Load a posterior from a JSON file
pub fn load_posterior<P: AsRef<Path>>(path: P) -> Result<Posterior> {
    let file = File::open(path)?;
    load_posterior_from_reader(BufReader::new(file))
}

/// Load a posterior from any reader (e.g. string buffer, network stream)
pub fn load_posterior_from_reader<R: Read>(reader: R) -> Result<Posterior> {
    let raw: PosteriorFile = serde_json::from_reader(reader)?;
    let posterior = raw.into_posterior()?;
    log::info!(
        "loaded posterior: K={}, plag={}, {} draws, T={}",
        posterior.k(),
        posterior.dims.plag,
        posterior.n_draws(),
        posterior.data.nrows()
    );
    Ok(posterior)
}

/// Write a posterior as JSON, joining identifiers with `separator`
pub fn save_posterior<P: AsRef<Path>>(posterior: &Posterior, path: P, separator: &str) -> Result<()> {
    let file = File::create(path)?;
    save_posterior_to_writer(posterior, BufWriter::new(file), separator)
}

/// Write a posterior as JSON to any writer
pub fn save_posterior_to_writer<W: Write>(posterior: &Posterior, writer: W, separator: &str) -> Result<()> {
    let raw = PosteriorFile::from_posterior(posterior, separator);
    serde_json::to_writer(writer, &raw)?;
    Ok(())
}
