use log::info;
use orlab_solver::{ConstraintOp, LpProblem, Sense, Solution, Solver};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Product {
    pub name: String,
    /// Profit per unit produced
    pub profit: f64,
}

/// `Σ usage[k] * x[k] <= capacity`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceLimit {
    pub name: String,
    pub usage: Vec<f64>,
    pub capacity: f64,
}

/// `x[product] >= minimum`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DemandFloor {
    pub name: String,
    pub product: usize,
    pub minimum: f64,
}

/// Profit maximization over products sharing limited resources.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProductionModel {
    pub products: Vec<Product>,
    pub resources: Vec<ResourceLimit>,
    pub floors: Vec<DemandFloor>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceUsage {
    pub name: String,
    pub used: f64,
    pub capacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProductionPlan {
    /// `(product name, units)` in model order
    pub quantities: Vec<(String, f64)>,
    pub total_profit: f64,
    pub resources: Vec<ResourceUsage>,
}

impl Default for ProductionModel {
    fn default() -> Self {
        let products = [50.0, 60.0, 65.0, 53.0, 90.0]
            .iter()
            .enumerate()
            .map(|(i, &profit)| Product {
                name: format!("P{}", i + 1),
                profit,
            })
            .collect();
        Self {
            products,
            resources: vec![
                ResourceLimit {
                    name: "Labor".to_string(),
                    usage: vec![5.0, 6.0, 2.0, 7.0, 5.0],
                    capacity: 400.0,
                },
                ResourceLimit {
                    name: "Material".to_string(),
                    usage: vec![5.0, 5.0, 5.0, 4.0, 7.0],
                    capacity: 350.0,
                },
                ResourceLimit {
                    name: "Demand for P3, P4, P5".to_string(),
                    usage: vec![0.0, 0.0, 1.0, 1.0, 1.0],
                    capacity: 50.0,
                },
            ],
            floors: vec![
                DemandFloor {
                    name: "Demand for P1".to_string(),
                    product: 0,
                    minimum: 10.0,
                },
                DemandFloor {
                    name: "Demand for P2".to_string(),
                    product: 1,
                    minimum: 10.0,
                },
            ],
        }
    }
}

impl ProductionModel {
    pub fn validate(&self) -> Result<(), ModelError> {
        let n = self.products.len();
        if n == 0 {
            return Err(ModelError::InvalidInput("no products".to_string()));
        }
        for r in &self.resources {
            if r.usage.len() != n {
                return Err(ModelError::dimension(format!("usage of {}", r.name), n, r.usage.len()));
            }
        }
        for f in &self.floors {
            if f.product >= n {
                return Err(ModelError::InvalidInput(format!(
                    "{} refers to product {} of {}",
                    f.name,
                    f.product + 1,
                    n
                )));
            }
        }
        Ok(())
    }

    pub fn formulate(&self) -> Result<LpProblem, ModelError> {
        self.validate()?;
        let n = self.products.len();

        let mut lp = LpProblem::with_indexed_variables("x", n);
        lp.set_objective(self.products.iter().map(|p| p.profit).collect(), Sense::Maximize);
        for r in &self.resources {
            lp.add_constraint(r.name.clone(), r.usage.clone(), ConstraintOp::Le, r.capacity);
        }
        for f in &self.floors {
            let mut row = vec![0.0; n];
            row[f.product] = 1.0;
            lp.add_constraint(f.name.clone(), row, ConstraintOp::Ge, f.minimum);
        }
        Ok(lp)
    }

    pub fn interpret(&self, solution: &Solution) -> ProductionPlan {
        let quantities = self
            .products
            .iter()
            .zip(&solution.values)
            .map(|(p, x)| (p.name.clone(), *x))
            .collect();
        let resources = self
            .resources
            .iter()
            .map(|r| ResourceUsage {
                name: r.name.clone(),
                used: r.usage.iter().zip(&solution.values).map(|(u, x)| u * x).sum(),
                capacity: r.capacity,
            })
            .collect();
        ProductionPlan {
            quantities,
            total_profit: solution.objective_value,
            resources,
        }
    }

    pub fn solve(&self, solver: &Solver) -> Result<ProductionPlan, ModelError> {
        let lp = self.formulate()?;
        let solution = solver.solve(&lp)?;
        let plan = self.interpret(&solution);
        info!("production profit {:.4}", plan.total_profit);
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formulation_shape() {
        let lp = ProductionModel::default().formulate().unwrap();
        assert_eq!(lp.variables, vec!["x1", "x2", "x3", "x4", "x5"]);
        assert_eq!(lp.num_constraints(), 5);
        assert_eq!(lp.objective.coefficients, vec![50.0, 60.0, 65.0, 53.0, 90.0]);
        assert_eq!(lp.constraints[3].op, ConstraintOp::Ge);
        assert_eq!(lp.constraints[3].coefficients, vec![1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_default_optimum() {
        let model = ProductionModel::default();
        let plan = model.solve(&Solver::new()).unwrap();

        assert!(plan.total_profit.is_finite());
        assert!((plan.total_profit - 4364.615384615).abs() < 1e-3, "profit {}", plan.total_profit);
        assert!(plan.quantities[0].1 >= 10.0 - 1e-6);
        assert!(plan.quantities[1].1 >= 10.0 - 1e-6);
        for r in &plan.resources {
            assert!(r.used <= r.capacity + 1e-6, "{} uses {}", r.name, r.used);
        }
    }

    #[test]
    fn test_floor_on_unknown_product() {
        let mut model = ProductionModel::default();
        model.floors[0].product = 9;
        assert!(matches!(model.formulate(), Err(ModelError::InvalidInput(_))));
    }

    #[test]
    fn test_usage_length_mismatch() {
        let mut model = ProductionModel::default();
        model.resources[0].usage.pop();
        assert!(matches!(model.formulate(), Err(ModelError::Dimension { .. })));
    }
}
