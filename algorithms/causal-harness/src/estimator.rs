use std::fmt;

use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2, ArrayView1};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

use crate::data::ObservationTable;
use crate::error::{CausalError, Result};
use crate::identifier::IdentifiedEstimand;

pub const LINEAR_REGRESSION: &str = "backdoor.linear_regression";

/// Ordinary least squares fit of an outcome on a treatment and covariates.
#[derive(Debug, Clone)]
pub struct RegressionFit {
    pub treatment_coefficient: f64,
    pub intercept: f64,
    pub covariate_coefficients: Vec<f64>,
    pub r_squared: f64,
    pub residual_std: f64,
    pub std_error: f64,
    pub p_value: f64,
}

fn design(columns: &[ArrayView1<'_, f64>], rows: usize) -> Result<Array2<f64>> {
    let mut records = Array2::<f64>::zeros((rows, 0));
    for column in columns {
        records.push_column(*column)?;
    }
    Ok(records)
}

fn least_squares(records: Array2<f64>, targets: Array1<f64>) -> Result<(Array1<f64>, f64, f64)> {
    let dataset = Dataset::new(records, targets);
    let model = LinearRegression::new()
        .fit(&dataset)
        .map_err(|e| CausalError::Regression(e.to_string()))?;

    let fitted = dataset.records().dot(model.params()) + model.intercept();
    let residuals = dataset.targets() - &fitted;
    let ss_res = residuals.mapv(|r| r * r).sum();

    Ok((model.params().to_owned(), model.intercept(), ss_res))
}

/// Regresses `outcome` on `treatment` plus `covariates`, with an intercept.
///
/// The treatment coefficient's standard error comes from the Frisch-Waugh-Lovell
/// partial regression of the treatment on the covariates.
pub fn fit_effect(
    treatment: ArrayView1<'_, f64>,
    covariates: &[ArrayView1<'_, f64>],
    outcome: ArrayView1<'_, f64>,
) -> Result<RegressionFit> {
    let rows = outcome.len();
    let regressors = covariates.len() + 1;
    if rows <= regressors + 1 {
        return Err(CausalError::NotEnoughObservations(rows));
    }

    let mut columns: Vec<ArrayView1<'_, f64>> = vec![treatment.view()];
    columns.extend(covariates.iter().map(|c| c.view()));
    let (params, intercept, ss_res) = least_squares(design(&columns, rows)?, outcome.to_owned())?;

    let outcome_mean = outcome.mean().unwrap_or(0.0);
    let ss_tot = outcome.mapv(|y| (y - outcome_mean).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    let dof = (rows - regressors - 1) as f64;
    let residual_std = (ss_res / dof).sqrt();

    let treatment_ss = if covariates.is_empty() {
        let mean = treatment.mean().unwrap_or(0.0);
        treatment.mapv(|t| (t - mean).powi(2)).sum()
    } else {
        least_squares(design(covariates, rows)?, treatment.to_owned())?.2
    };

    let treatment_coefficient = params[0];
    let std_error = residual_std / treatment_ss.sqrt();
    let p_value = if std_error.is_finite() && std_error > 0.0 {
        let t_dist =
            StudentsT::new(0.0, 1.0, dof).map_err(|e| CausalError::Distribution(e.to_string()))?;
        2.0 * (1.0 - t_dist.cdf((treatment_coefficient / std_error).abs()))
    } else {
        f64::NAN
    };

    Ok(RegressionFit {
        treatment_coefficient,
        intercept,
        covariate_coefficients: params.iter().skip(1).copied().collect(),
        r_squared,
        residual_std,
        std_error,
        p_value,
    })
}

/// Effect of one treatment on the outcome, with the statistics behind it.
#[derive(Debug, Clone)]
pub struct CausalEstimate {
    pub method: &'static str,
    pub treatment: String,
    pub outcome: String,
    pub adjustment_set: Vec<String>,
    pub value: f64,
    pub intercept: f64,
    pub covariate_coefficients: Vec<(String, f64)>,
    pub std_error: f64,
    pub p_value: f64,
    pub r_squared: f64,
    pub residual_std: f64,
    pub num_observations: usize,
}

impl CausalEstimate {
    /// Regression formula in `outcome~treatment+covariates` form.
    pub fn realized_estimand(&self) -> String {
        let mut terms = vec![self.treatment.as_str()];
        terms.extend(self.adjustment_set.iter().map(String::as_str));
        format!("{}~{}", self.outcome, terms.join("+"))
    }
}

impl fmt::Display for CausalEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*** Causal Estimate ***")?;
        writeln!(f, "Method: {}", self.method)?;
        writeln!(f, "Realized estimand: b: {}", self.realized_estimand())?;
        writeln!(f, "Target units: ate")?;
        writeln!(f, "Observations: {}", self.num_observations)?;
        writeln!(f)?;
        writeln!(f, "## Estimate")?;
        writeln!(f, "Mean value: {}", self.value)?;
        writeln!(f, "Std. error: {:.6}", self.std_error)?;
        writeln!(f, "p-value: {:.6}", self.p_value)?;
        writeln!(f, "Intercept: {:.6}", self.intercept)?;
        for (name, coefficient) in &self.covariate_coefficients {
            writeln!(f, "Coefficient {}: {:.6}", name, coefficient)?;
        }
        write!(f, "R²: {:.6}", self.r_squared)
    }
}

pub trait Estimator {
    fn estimate(
        &self,
        table: &ObservationTable,
        estimand: &IdentifiedEstimand<&str>,
    ) -> Result<CausalEstimate>;
}

/// Linear regression of the outcome on the treatment and the backdoor set.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearRegressionEstimator;

impl Estimator for LinearRegressionEstimator {
    fn estimate(
        &self,
        table: &ObservationTable,
        estimand: &IdentifiedEstimand<&str>,
    ) -> Result<CausalEstimate> {
        let treatment = table.column(estimand.treatment)?;
        let outcome = table.column(estimand.outcome)?;
        let covariates = estimand
            .backdoor_variables
            .iter()
            .map(|name| table.column(name))
            .collect::<Result<Vec<_>>>()?;

        let fit = fit_effect(treatment, &covariates, outcome)?;
        debug!(
            treatment = estimand.treatment,
            value = fit.treatment_coefficient,
            r_squared = fit.r_squared,
            "estimated effect"
        );

        let adjustment_set: Vec<String> = estimand
            .backdoor_variables
            .iter()
            .map(|name| name.to_string())
            .collect();

        Ok(CausalEstimate {
            method: LINEAR_REGRESSION,
            treatment: estimand.treatment.to_string(),
            outcome: estimand.outcome.to_string(),
            covariate_coefficients: adjustment_set
                .iter()
                .cloned()
                .zip(fit.covariate_coefficients.iter().copied())
                .collect(),
            adjustment_set,
            value: fit.treatment_coefficient,
            intercept: fit.intercept,
            std_error: fit.std_error,
            p_value: fit.p_value,
            r_squared: fit.r_squared,
            residual_std: fit.residual_std,
            num_observations: table.nrows(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::rand_distr::StandardNormal;
    use ndarray_rand::RandomExt;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_exact_linear_relation() {
        let t = array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let x = array![1.0, 0.0, 1.0, 0.0, 2.0, 1.0];
        let y = 3.0 - 2.0 * &t + 0.5 * &x;

        let fit = fit_effect(t.view(), &[x.view()], y.view()).unwrap();
        assert_abs_diff_eq!(fit.treatment_coefficient, -2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.covariate_coefficients[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.intercept, 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_confounder_adjustment() {
        // z confounds t and y, the true effect of t is 1.5
        let mut rng = SmallRng::seed_from_u64(42);
        let n = 5_000;
        let z = Array1::<f64>::random_using(n, StandardNormal, &mut rng);
        let t = 2.0 * &z + Array1::<f64>::random_using(n, StandardNormal, &mut rng);
        let y = 1.5 * &t
            + 4.0 * &z
            + Array1::<f64>::random_using(n, StandardNormal, &mut rng);

        let naive = fit_effect(t.view(), &[], y.view()).unwrap();
        let adjusted = fit_effect(t.view(), &[z.view()], y.view()).unwrap();

        assert!(naive.treatment_coefficient > 2.5);
        assert_abs_diff_eq!(adjusted.treatment_coefficient, 1.5, epsilon = 0.05);
        assert!(adjusted.std_error > 0.0 && adjusted.std_error < 0.05);
        assert!(adjusted.p_value < 1e-6);
    }

    #[test]
    fn test_covariates_outlive_treatment() {
        let outcome = array![2.0, 4.1, 5.9, 8.2, 9.9, 12.1, 13.8];
        let covariate = array![0.5, -1.0, 0.3, 0.0, 1.2, -0.4, 0.9];
        let covariates = vec![covariate.view()];

        let fit = {
            let treatment = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
            fit_effect(treatment.view(), &covariates, outcome.view()).unwrap()
        };
        assert_abs_diff_eq!(fit.treatment_coefficient, 2.0, epsilon = 0.2);
        assert_eq!(fit.covariate_coefficients.len(), 1);
    }

    #[test]
    fn test_too_few_rows() {
        let t = array![1.0, 2.0];
        let y = array![1.0, 2.0];
        assert!(matches!(
            fit_effect(t.view(), &[], y.view()),
            Err(CausalError::NotEnoughObservations(2))
        ));
    }
}
