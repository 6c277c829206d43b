//! Console renderings of interpreted results, and the success/failure
//! outcome every exercise reports.

use std::fmt;

use crate::diet::DietPlan;
use crate::error::ModelError;
use crate::game::{MixedEquilibrium, PureStrategies};
use crate::portfolio::PortfolioReport;
use crate::production::ProductionPlan;
use crate::transport::{Balance, TransportPlan};

/// Result of one formulate → solve → interpret run, with failures kept as a
/// readable diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Solved(T),
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn is_solved(&self) -> bool {
        matches!(self, Outcome::Solved(_))
    }

    pub fn solved(&self) -> Option<&T> {
        match self {
            Outcome::Solved(value) => Some(value),
            Outcome::Failed(_) => None,
        }
    }
}

impl<T> From<Result<T, ModelError>> for Outcome<T> {
    fn from(result: Result<T, ModelError>) -> Self {
        match result {
            Ok(value) => Outcome::Solved(value),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Solved(value) => {
                writeln!(f, "Status: OPTIMAL")?;
                write!(f, "{}", value)
            }
            Outcome::Failed(reason) => writeln!(f, "Status: FAILED ({})", reason),
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Balance::Balanced => write!(f, "balanced"),
            Balance::SurplusSupply(amount) => write!(f, "supply exceeds demand by {}", amount),
            Balance::SurplusDemand(amount) => write!(f, "demand exceeds supply by {}", amount),
        }
    }
}

impl fmt::Display for TransportPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Instance: {}", self.balance)?;
        writeln!(f, "Total cost: {:.2}", self.total_cost)?;
        writeln!(f, "Flows:")?;
        for (i, row) in self.flows.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|x| format!("{:8.2}", x)).collect();
            writeln!(f, "  S{:<3}{}", i + 1, cells.join(""))?;
        }
        for (i, unused) in self.unused_supply.iter().enumerate() {
            if *unused > 1e-6 {
                writeln!(f, "  S{} keeps {:.2}", i + 1, unused)?;
            }
        }
        for (j, unmet) in self.unmet_demand.iter().enumerate() {
            if *unmet > 1e-6 {
                writeln!(f, "  D{} short {:.2}", j + 1, unmet)?;
            }
        }
        Ok(())
    }
}

fn write_distribution(f: &mut fmt::Formatter<'_>, label: &str, probabilities: &[f64]) -> fmt::Result {
    writeln!(f, "{}:", label)?;
    for (i, p) in probabilities.iter().enumerate() {
        writeln!(f, "  strategy {:<3}{:.4}", i + 1, p)?;
    }
    Ok(())
}

impl fmt::Display for MixedEquilibrium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_distribution(f, "Row player", &self.row_strategy)?;
        write_distribution(f, "Column player", &self.column_strategy)?;
        writeln!(f, "Shift: {:.4}", self.shift)?;
        writeln!(
            f,
            "Shifted value: {:.6} (row) {:.6} (column)",
            self.row_value, self.column_value
        )?;
        writeln!(f, "Game value: {:.6}", self.game_value())
    }
}

impl fmt::Display for PureStrategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Row player maximin: strategy {} (value {})", self.row_index + 1, self.row_value)?;
        writeln!(
            f,
            "Column player minimax: strategy {} (value {})",
            self.column_index + 1,
            self.column_value
        )?;
        if self.has_saddle_point() {
            writeln!(f, "Saddle point: yes")
        } else {
            writeln!(f, "Saddle point: no")
        }
    }
}

impl fmt::Display for ProductionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total profit: {:.2}", self.total_profit)?;
        writeln!(f, "Production:")?;
        for (name, units) in &self.quantities {
            writeln!(f, "  {:20} {:10.4}", name, units)?;
        }
        writeln!(f, "Resources:")?;
        for r in &self.resources {
            writeln!(f, "  {:24} {:10.2} / {:.2}", r.name, r.used, r.capacity)?;
        }
        Ok(())
    }
}

impl fmt::Display for DietPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total cost: {:.4}", self.total_cost)?;
        writeln!(f, "Foods:")?;
        for (name, grams) in &self.quantities {
            if *grams > 1e-6 {
                writeln!(f, "  {:20} {:10.4} g", name, grams)?;
            }
        }
        writeln!(f, "Nutrients:")?;
        for n in &self.nutrients {
            writeln!(f, "  {:20} {:10.2} (min {:.2})", n.name, n.achieved, n.minimum)?;
        }
        Ok(())
    }
}

impl fmt::Display for PortfolioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Weights:")?;
        for (asset, weight) in &self.weights {
            writeln!(f, "  {:20} {:8.4} ({:5.2}%)", asset, weight, weight * 100.0)?;
        }
        writeln!(f, "Expected return: {:.6}", self.expected_return)?;
        writeln!(f, "Variance: {:.6}", self.variance)?;
        writeln!(f, "Std deviation: {:.6}", self.std_dev)?;
        match self.sharpe_ratio {
            Some(ratio) => writeln!(f, "Sharpe ratio: {:.6}", ratio)?,
            None => writeln!(f, "Sharpe ratio: undefined")?,
        }
        writeln!(f, "Objective: {:.6}", self.objective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orlab_solver::SolveError;

    #[test]
    fn test_failure_keeps_diagnostic() {
        let outcome: Outcome<ProductionPlan> = Err(ModelError::Solve(SolveError::Infeasible)).into();
        assert!(!outcome.is_solved());
        assert!(outcome.solved().is_none());
        let text = outcome.to_string();
        assert!(text.starts_with("Status: FAILED"), "{}", text);
        assert!(text.contains("infeasible"), "{}", text);
    }

    #[test]
    fn test_pure_strategies_are_one_based() {
        let pure = PureStrategies {
            row_index: 3,
            row_value: 1.0,
            column_index: 1,
            column_value: 1.0,
        };
        let text = pure.to_string();
        assert!(text.contains("strategy 4 (value 1)"), "{}", text);
        assert!(text.contains("strategy 2 (value 1)"), "{}", text);
        assert!(text.contains("Saddle point: yes"));
    }

    #[test]
    fn test_transport_lists_shortfall_only_when_present() {
        let plan = TransportPlan {
            flows: vec![vec![5.0, 0.0], vec![0.0, 3.0]],
            total_cost: 12.0,
            balance: Balance::SurplusSupply(2.0),
            unused_supply: vec![0.0, 2.0],
            unmet_demand: vec![0.0, 0.0],
        };
        let text = Outcome::Solved(plan).to_string();
        assert!(text.starts_with("Status: OPTIMAL\n"));
        assert!(text.contains("supply exceeds demand by 2"));
        assert!(text.contains("S2 keeps 2.00"));
        assert!(!text.contains("S1 keeps"));
        assert!(!text.contains("short"));
    }

    #[test]
    fn test_portfolio_without_risk_has_no_sharpe() {
        let report = PortfolioReport {
            weights: vec![("Cash".to_string(), 1.0)],
            expected_return: 0.02,
            variance: 0.0,
            std_dev: 0.0,
            sharpe_ratio: None,
            objective: 0.02,
        };
        assert!(report.to_string().contains("Sharpe ratio: undefined"));
    }
}
