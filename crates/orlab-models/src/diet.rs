use log::info;
use orlab_solver::{ConstraintOp, LpProblem, Sense, Solution, Solver};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Food {
    pub name: String,
    /// Cost per gram
    pub cost: f64,
    /// Content per gram, one entry per nutrient requirement
    pub nutrients: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NutrientRequirement {
    pub name: String,
    pub minimum: f64,
}

/// Cheapest combination of foods meeting every nutrient minimum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DietModel {
    pub foods: Vec<Food>,
    pub requirements: Vec<NutrientRequirement>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NutrientLevel {
    pub name: String,
    pub achieved: f64,
    pub minimum: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DietPlan {
    /// `(food name, grams)`
    pub quantities: Vec<(String, f64)>,
    pub total_cost: f64,
    pub nutrients: Vec<NutrientLevel>,
}

impl Default for DietModel {
    fn default() -> Self {
        let costs = [0.5, 0.7, 0.75, 0.5, 0.4];
        let content = [
            [30.0, 30.0, 20.0, 10.0, 7.0],
            [30.0, 50.0, 15.0, 20.0, 10.0],
            [30.0, 30.0, 30.0, 40.0, 25.0],
            [40.0, 20.0, 10.0, 40.0, 15.0],
            [25.0, 15.0, 20.0, 15.0, 20.0],
        ];
        let foods = costs
            .iter()
            .zip(content)
            .enumerate()
            .map(|(i, (&cost, nutrients))| Food {
                name: format!("Food {}", i + 1),
                cost,
                nutrients: nutrients.to_vec(),
            })
            .collect();
        let requirements = [
            ("calories", 180.0),
            ("protein", 120.0),
            ("fat", 70.0),
            ("carbs", 180.0),
            ("fiber", 79.0),
        ]
        .iter()
        .map(|&(name, minimum)| NutrientRequirement {
            name: name.to_string(),
            minimum,
        })
        .collect();
        Self { foods, requirements }
    }
}

impl DietModel {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.foods.is_empty() {
            return Err(ModelError::InvalidInput("no foods".to_string()));
        }
        let k = self.requirements.len();
        for f in &self.foods {
            if f.nutrients.len() != k {
                return Err(ModelError::dimension(format!("nutrients of {}", f.name), k, f.nutrients.len()));
            }
        }
        Ok(())
    }

    /// Minimums enter as `-Σ content * x <= -minimum`.
    pub fn formulate(&self) -> Result<LpProblem, ModelError> {
        self.validate()?;

        let mut lp = LpProblem::new(self.foods.iter().map(|f| f.name.clone()).collect());
        lp.set_objective(self.foods.iter().map(|f| f.cost).collect(), Sense::Minimize);
        for (k, req) in self.requirements.iter().enumerate() {
            let row = self.foods.iter().map(|f| -f.nutrients[k]).collect();
            lp.add_constraint(req.name.clone(), row, ConstraintOp::Le, -req.minimum);
        }
        Ok(lp)
    }

    pub fn interpret(&self, solution: &Solution) -> DietPlan {
        let quantities = self
            .foods
            .iter()
            .zip(&solution.values)
            .map(|(f, x)| (f.name.clone(), *x))
            .collect();
        let nutrients = self
            .requirements
            .iter()
            .enumerate()
            .map(|(k, req)| NutrientLevel {
                name: req.name.clone(),
                achieved: self
                    .foods
                    .iter()
                    .zip(&solution.values)
                    .map(|(f, x)| f.nutrients[k] * x)
                    .sum(),
                minimum: req.minimum,
            })
            .collect();
        DietPlan {
            quantities,
            total_cost: solution.objective_value,
            nutrients,
        }
    }

    pub fn solve(&self, solver: &Solver) -> Result<DietPlan, ModelError> {
        let lp = self.formulate()?;
        let solution = solver.solve(&lp)?;
        let plan = self.interpret(&solution);
        info!("diet cost {:.4}", plan.total_cost);
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_are_negated() {
        let lp = DietModel::default().formulate().unwrap();
        assert_eq!(lp.num_constraints(), 5);
        let protein = &lp.constraints[1];
        assert_eq!(protein.op, ConstraintOp::Le);
        assert_eq!(protein.rhs, -120.0);
        assert_eq!(protein.coefficients, vec![-30.0, -50.0, -30.0, -20.0, -15.0]);
    }

    #[test]
    fn test_default_optimum() {
        let plan = DietModel::default().solve(&Solver::new()).unwrap();
        assert!((plan.total_cost - 2.727574750830).abs() < 1e-5, "cost {}", plan.total_cost);
        for n in &plan.nutrients {
            assert!(n.achieved >= n.minimum - 1e-5, "{} at {}", n.name, n.achieved);
        }
        assert!(plan.quantities.iter().all(|(_, g)| *g >= -1e-7));
    }

    #[test]
    fn test_nutrient_count_mismatch() {
        let mut model = DietModel::default();
        model.foods[2].nutrients.push(1.0);
        assert!(matches!(model.formulate(), Err(ModelError::Dimension { .. })));
    }

    #[test]
    fn test_unreachable_requirement_is_infeasible() {
        let model = DietModel {
            foods: vec![Food {
                name: "water".to_string(),
                cost: 1.0,
                nutrients: vec![0.0],
            }],
            requirements: vec![NutrientRequirement {
                name: "protein".to_string(),
                minimum: 1.0,
            }],
        };
        let err = model.solve(&Solver::new()).unwrap_err();
        assert!(err.is_infeasible_or_unbounded());
    }
}
