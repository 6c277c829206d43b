//! Mean-variance portfolio: maximize `μᵀw - λ·wᵀΣw` over long-only weights
//! summing to one, with per-asset caps, one asset's minimum weight and a
//! ceiling on the variance.

use log::info;
use orlab_solver::{quadratic_form, Bound, ConstraintOp, LpProblem, QpProblem, Sense, Solution, Solver};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{check_rectangular, ModelError};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightFloor {
    pub name: String,
    pub asset: usize,
    pub minimum: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortfolioModel {
    pub assets: Vec<String>,
    /// Annualized expected return per asset
    pub expected_returns: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
    pub risk_aversion: f64,
    /// Largest weight any single asset may take
    pub max_weight: f64,
    pub floor: Option<WeightFloor>,
    /// Ceiling on `wᵀΣw`
    pub risk_limit: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortfolioReport {
    /// `(asset, weight)`
    pub weights: Vec<(String, f64)>,
    pub expected_return: f64,
    pub variance: f64,
    pub std_dev: f64,
    /// `(return - λ/12) / std_dev`; `None` when the portfolio carries no risk
    pub sharpe_ratio: Option<f64>,
    /// `return - λ·variance`
    pub objective: f64,
}

impl Default for PortfolioModel {
    fn default() -> Self {
        Self {
            assets: ["Stocks", "Bonds", "Real Estate", "Commodities", "Crypto", "Cash"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            expected_returns: vec![0.12, 0.05, 0.08, 0.10, 0.20, 0.02],
            covariance: vec![
                vec![0.10, 0.02, 0.04, 0.03, 0.05, 0.01],
                vec![0.02, 0.08, 0.03, 0.02, 0.01, 0.02],
                vec![0.04, 0.03, 0.12, 0.05, 0.04, 0.01],
                vec![0.03, 0.02, 0.05, 0.09, 0.06, 0.02],
                vec![0.05, 0.01, 0.04, 0.06, 0.25, 0.01],
                vec![0.01, 0.02, 0.01, 0.02, 0.01, 0.02],
            ],
            risk_aversion: 0.0771,
            max_weight: 0.4,
            floor: Some(WeightFloor {
                name: "Liquidity".to_string(),
                asset: 2,
                minimum: 0.1,
            }),
            risk_limit: 0.05,
        }
    }
}

impl PortfolioModel {
    pub fn validate(&self) -> Result<(), ModelError> {
        let n = self.assets.len();
        if n == 0 {
            return Err(ModelError::InvalidInput("no assets".to_string()));
        }
        if self.expected_returns.len() != n {
            return Err(ModelError::dimension("expected returns", n, self.expected_returns.len()));
        }
        if self.covariance.len() != n {
            return Err(ModelError::dimension("covariance rows", n, self.covariance.len()));
        }
        check_rectangular(&self.covariance, n, "covariance")?;
        if let Some(floor) = &self.floor {
            if floor.asset >= n {
                return Err(ModelError::InvalidInput(format!(
                    "{} refers to asset {} of {}",
                    floor.name,
                    floor.asset + 1,
                    n
                )));
            }
        }
        if self.max_weight <= 0.0 || self.risk_limit < 0.0 || self.risk_aversion < 0.0 {
            return Err(ModelError::InvalidInput(
                "max weight must be positive, risk limit and risk aversion non-negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn formulate(&self) -> Result<QpProblem, ModelError> {
        self.validate()?;
        let n = self.assets.len();

        let mut lp = LpProblem::new(self.assets.clone());
        lp.set_objective(self.expected_returns.clone(), Sense::Maximize);
        lp.set_bounds(vec![Bound::between(0.0, self.max_weight); n]);
        lp.add_constraint("Budget", vec![1.0; n], ConstraintOp::Eq, 1.0);
        if let Some(floor) = &self.floor {
            let mut row = vec![0.0; n];
            row[floor.asset] = 1.0;
            lp.add_constraint(floor.name.clone(), row, ConstraintOp::Ge, floor.minimum);
        }

        let mut qp = QpProblem::new(lp);
        qp.set_quadratic(
            self.covariance
                .iter()
                .map(|row| row.iter().map(|v| -self.risk_aversion * v).collect())
                .collect(),
        );
        qp.add_quadratic_constraint("Risk", self.covariance.clone(), self.risk_limit);
        Ok(qp)
    }

    pub fn interpret(&self, solution: &Solution) -> PortfolioReport {
        let w = &solution.values;
        let expected_return: f64 = self.expected_returns.iter().zip(w).map(|(m, x)| m * x).sum();
        let variance = quadratic_form(&self.covariance, w);
        let std_dev = variance.max(0.0).sqrt();
        let sharpe_ratio = (std_dev > 0.0).then(|| (expected_return - self.risk_aversion / 12.0) / std_dev);

        PortfolioReport {
            weights: self.assets.iter().cloned().zip(w.iter().copied()).collect(),
            expected_return,
            variance,
            std_dev,
            sharpe_ratio,
            objective: solution.objective_value,
        }
    }

    pub fn solve(&self, solver: &Solver) -> Result<PortfolioReport, ModelError> {
        let qp = self.formulate()?;
        let solution = solver.solve_quadratic(&qp)?;
        let report = self.interpret(&solution);
        info!(
            "portfolio return {:.6}, variance {:.6}",
            report.expected_return, report.variance
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    fn objective(model: &PortfolioModel, w: &[f64]) -> f64 {
        let ret: f64 = model.expected_returns.iter().zip(w).map(|(m, x)| m * x).sum();
        ret - model.risk_aversion * quadratic_form(&model.covariance, w)
    }

    #[test]
    fn test_formulation_shape() {
        let qp = PortfolioModel::default().formulate().unwrap();
        assert_eq!(qp.num_variables(), 6);
        assert_eq!(qp.linear.objective.sense, Sense::Maximize);
        assert_eq!(qp.linear.num_constraints(), 2);
        assert_eq!(qp.quadratic_constraints.len(), 1);
        assert!((qp.quadratic[4][4] + 0.0771 * 0.25).abs() < 1e-15);
        assert!(qp.linear.bounds.iter().all(|b| *b == Bound::between(0.0, 0.4)));
    }

    #[test]
    fn test_default_portfolio_constraints() {
        let model = PortfolioModel::default();
        let report = model.solve(&Solver::new()).unwrap();
        let weights: Vec<f64> = report.weights.iter().map(|(_, w)| *w).collect();

        assert!((weights.iter().sum::<f64>() - 1.0).abs() < TOL);
        assert!(weights.iter().all(|w| *w >= -TOL && *w <= 0.4 + TOL));
        assert!(weights[2] >= 0.1 - TOL);
        assert!(report.variance <= 0.05 + TOL);
        assert!((report.std_dev - report.variance.sqrt()).abs() < 1e-12);
        assert!((report.objective - objective(&model, &weights)).abs() < 1e-9);
    }

    #[test]
    fn test_beats_feasible_alternatives() {
        let model = PortfolioModel::default();
        let report = model.solve(&Solver::new()).unwrap();

        let candidates = [
            [0.0, 0.4, 0.2, 0.0, 0.0, 0.4],
            [0.4, 0.0, 0.2, 0.0, 0.0, 0.4],
            [0.2, 0.1, 0.1, 0.2, 0.2, 0.2],
        ];
        for w in candidates {
            assert!(quadratic_form(&model.covariance, &w) <= model.risk_limit);
            assert!(report.objective >= objective(&model, &w) - TOL);
        }
    }

    #[test]
    fn test_sharpe_ratio_formula() {
        let model = PortfolioModel::default();
        let solution = Solution {
            values: vec![0.2, 0.1, 0.1, 0.2, 0.2, 0.2],
            objective_value: 0.0,
            iterations: 0,
            approximate: false,
        };
        let report = model.interpret(&solution);
        let expected = (report.expected_return - 0.0771 / 12.0) / report.std_dev;
        assert_eq!(report.sharpe_ratio, Some(expected));
    }

    #[test]
    fn test_riskless_asset_is_accepted() {
        // Cash with zero variance leaves the covariance only semidefinite
        let mut model = PortfolioModel::default();
        for k in 0..6 {
            model.covariance[5][k] = 0.0;
            model.covariance[k][5] = 0.0;
        }
        let report = model.solve(&Solver::new()).unwrap();
        let weights: Vec<f64> = report.weights.iter().map(|(_, w)| *w).collect();
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < TOL);
        assert!(weights[2] >= 0.1 - TOL);
        assert!(report.variance <= model.risk_limit + TOL);
        assert!(report.objective >= objective(&model, &[0.0, 0.4, 0.2, 0.0, 0.0, 0.4]) - TOL);
    }

    #[test]
    fn test_tight_risk_limit_is_infeasible() {
        let model = PortfolioModel {
            risk_limit: 1e-4,
            ..PortfolioModel::default()
        };
        let err = model.solve(&Solver::new()).unwrap_err();
        assert!(err.is_infeasible_or_unbounded(), "got {}", err);
    }

    #[test]
    fn test_covariance_shape_checked() {
        let mut model = PortfolioModel::default();
        model.covariance[3].pop();
        assert!(matches!(model.formulate(), Err(ModelError::Dimension { .. })));
    }
}
