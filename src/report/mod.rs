//! Report writers for forecast and decomposition results
//!
//! Formatting is driven by an explicit [`ReportConfig`]; nothing here reads
//! global state. CSV tables are long format (one row per cell) with horizons
//! counted from 1.

use crate::decomposition::DecompositionTable;
use crate::error::{ForecastError, Result};
use crate::model::{VariableId, DEFAULT_SEPARATOR};
use crate::summary::{HoldoutEvaluation, QuantileLevel, QuantileSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Joins country and variable in labels
    pub separator: String,
    /// Decimal places of numeric CSV fields
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            precision: 6,
        }
    }
}

impl ReportConfig {
    fn number(&self, v: f64) -> String {
        if v.is_nan() {
            String::new()
        } else {
            format!("{:.*}", self.precision, v)
        }
    }
}

fn check_labels(variables: &[VariableId], k: usize) -> Result<()> {
    if variables.len() != k {
        return Err(ForecastError::shape("variable labels", (k, 1), (variables.len(), 1)));
    }
    Ok(())
}

/// `variable,horizon,low16,low25,median,high75,high84`
pub fn write_quantiles_csv<W: Write>(
    writer: W,
    variables: &[VariableId],
    summary: &QuantileSummary,
    config: &ReportConfig,
) -> Result<()> {
    let (k, horizon, _) = summary.dim();
    check_labels(variables, k)?;
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["variable".to_string(), "horizon".to_string()];
    header.extend(QuantileLevel::ALL.iter().map(|q| q.label().to_string()));
    out.write_record(&header)?;

    for (i, id) in variables.iter().enumerate() {
        for h in 0..horizon {
            let mut record = vec![id.label(&config.separator), (h + 1).to_string()];
            record.extend(QuantileLevel::ALL.iter().map(|&q| config.number(summary.get(i, h, q))));
            out.write_record(&record)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// `variable,horizon,realized,mean,sd,log_score,rmse`
pub fn write_holdout_csv<W: Write>(
    writer: W,
    variables: &[VariableId],
    evaluation: &HoldoutEvaluation,
    config: &ReportConfig,
) -> Result<()> {
    check_labels(variables, evaluation.realized.nrows())?;
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["variable", "horizon", "realized", "mean", "sd", "log_score", "rmse"])?;
    for (i, id) in variables.iter().enumerate() {
        for h in 0..evaluation.horizons {
            out.write_record([
                id.label(&config.separator),
                (h + 1).to_string(),
                config.number(evaluation.realized[[i, h]]),
                config.number(evaluation.mean[[i, h]]),
                config.number(evaluation.sd[[i, h]]),
                config.number(evaluation.log_score[[i, h]]),
                config.number(evaluation.rmse[[i, h]]),
            ])?;
        }
    }
    out.flush()?;
    Ok(())
}

/// `variable,shock,horizon,mean[,low16..high84]`
pub fn write_decomposition_csv<W: Write>(writer: W, table: &DecompositionTable, config: &ReportConfig) -> Result<()> {
    let (k, m, horizon) = table.mean.dim();
    check_labels(&table.variables, k)?;
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["variable".to_string(), "shock".to_string(), "horizon".to_string(), "mean".to_string()];
    if table.quantiles.is_some() {
        header.extend(QuantileLevel::ALL.iter().map(|q| q.label().to_string()));
    }
    out.write_record(&header)?;

    for i in 0..k {
        for j in 0..m {
            for h in 0..horizon {
                let mut record = vec![
                    table.variables[i].label(&config.separator),
                    table.variables[j].label(&config.separator),
                    (h + 1).to_string(),
                    config.number(table.share(i, j, h)),
                ];
                if table.quantiles.is_some() {
                    record.extend(
                        QuantileLevel::ALL
                            .iter()
                            .filter_map(|&q| table.quantile(i, j, h, q))
                            .map(|v| config.number(v)),
                    );
                }
                out.write_record(&record)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// JSON envelope around any serializable result
#[derive(Debug, Serialize)]
pub struct JsonReport<'a, T: Serialize> {
    pub generated_at: DateTime<Utc>,
    pub kind: &'a str,
    pub result: &'a T,
}

impl<'a, T: Serialize> JsonReport<'a, T> {
    pub fn new(kind: &'a str, result: &'a T) -> Self {
        Self {
            generated_at: Utc::now(),
            kind,
            result,
        }
    }

    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write(BufWriter::new(file))
    }
}

/// Create a buffered file for one of the CSV writers
pub fn create_output<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::{decompose, DecompositionConfig, DecompositionMode};
    use crate::model::SyntheticPosterior;
    use ndarray::{Array2, Array3};

    fn ids() -> Vec<VariableId> {
        vec![VariableId::new("US", "y"), VariableId::new("EA", "y")]
    }

    #[test]
    fn test_quantiles_csv_layout() {
        let summary = QuantileSummary {
            values: Array3::from_shape_fn((2, 3, 5), |(i, h, q)| (i * 100 + h * 10 + q) as f64),
        };
        let mut buf = Vec::new();
        let config = ReportConfig { precision: 1, ..Default::default() };
        write_quantiles_csv(&mut buf, &ids(), &summary, &config).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "variable,horizon,low16,low25,median,high75,high84");
        assert_eq!(lines.len(), 1 + 2 * 3);
        assert_eq!(lines[4], "EA.y,1,100.0,101.0,102.0,103.0,104.0");
    }

    #[test]
    fn test_label_count_checked() {
        let summary = QuantileSummary {
            values: Array3::zeros((3, 1, 5)),
        };
        let err = write_quantiles_csv(Vec::new(), &ids(), &summary, &ReportConfig::default()).unwrap_err();
        assert!(matches!(err, ForecastError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_holdout_csv_blank_for_nan() {
        let eval = HoldoutEvaluation {
            horizons: 1,
            realized: Array2::from_elem((2, 1), 1.0),
            mean: Array2::from_elem((2, 1), 1.0),
            sd: Array2::from_elem((2, 1), 0.0),
            log_score: Array2::from_elem((2, 1), f64::NAN),
            rmse: Array2::zeros((2, 1)),
        };
        let mut buf = Vec::new();
        write_holdout_csv(&mut buf, &ids(), &eval, &ReportConfig { precision: 2, ..Default::default() }).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with("1.00,0.00,,0.00"));
    }

    #[test]
    fn test_decomposition_csv_with_quantiles() {
        let posterior = SyntheticPosterior::single_country(2, 1, 5).build();
        let config = DecompositionConfig {
            horizon: 2,
            mode: DecompositionMode::FullDistribution,
            ..Default::default()
        };
        let table = decompose(&posterior, &config).unwrap();
        let mut buf = Vec::new();
        write_decomposition_csv(&mut buf, &table, &ReportConfig::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 2 * 2 * 2);
        assert_eq!(lines[0].split(',').count(), 9);
        assert!(lines[1].starts_with("v1,v1,1,"));
    }

    #[test]
    fn test_json_envelope() {
        let summary = QuantileSummary {
            values: Array3::zeros((1, 1, 5)),
        };
        let mut buf = Vec::new();
        JsonReport::new("unconditional", &summary).write(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["kind"], "unconditional");
        assert!(value["generated_at"].is_string());
    }
}
