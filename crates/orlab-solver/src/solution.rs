use crate::problem::{ConstraintOp, LpProblem};

/// The optimum of a solved problem
#[derive(Debug, Clone)]
pub struct Solution {
    /// Optimal values for each variable
    pub values: Vec<f64>,
    /// Optimal objective value, in the problem's own sense
    pub objective_value: f64,
    /// Interior-point iterations used
    pub iterations: u32,
    /// True when the solver only reached its reduced accuracy level
    pub approximate: bool,
}

/// Information about a violated constraint
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// Constraint name
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl Solution {
    /// Constraints of `problem` not satisfied by these values within `tolerance`, worst first.
    pub fn violations(&self, problem: &LpProblem, tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for c in &problem.constraints {
            let lhs = c.evaluate(&self.values);
            if c.op.holds(lhs, c.rhs, tolerance) {
                continue;
            }

            let (violation_amount, description) = match c.op {
                ConstraintOp::Le => {
                    let amt = lhs - c.rhs;
                    (amt, format!("{} exceeds maximum of {:.4} by {:.4}", c.name, c.rhs, amt))
                }
                ConstraintOp::Ge => {
                    let amt = c.rhs - lhs;
                    (amt, format!("{} is below minimum of {:.4} by {:.4}", c.name, c.rhs, amt))
                }
                ConstraintOp::Eq => {
                    let amt = (lhs - c.rhs).abs();
                    (amt, format!("{} requires exactly {:.4} but got {:.4}", c.name, c.rhs, lhs))
                }
            };

            violations.push(ConstraintViolation {
                constraint: c.name.clone(),
                required: c.rhs,
                actual: lhs,
                violation_amount,
                description,
            });
        }

        // Sort by violation amount (worst first)
        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violations_sorted_worst_first() {
        let mut problem = LpProblem::with_indexed_variables("x", 2);
        problem.add_constraint("cap", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("floor", vec![1.0, 0.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("exact", vec![0.0, 1.0], ConstraintOp::Eq, 1.0);

        let solution = Solution {
            values: vec![1.0, 4.5],
            objective_value: 0.0,
            iterations: 0,
            approximate: false,
        };
        let violations = solution.violations(&problem, 1e-9);

        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].constraint, "floor");
        assert!((violations[0].violation_amount - 4.0).abs() < 1e-12);
        assert_eq!(violations[1].constraint, "exact");
        assert_eq!(violations[2].constraint, "cap");
    }

    #[test]
    fn test_no_violations_within_tolerance() {
        let mut problem = LpProblem::with_indexed_variables("x", 1);
        problem.add_constraint("floor", vec![1.0], ConstraintOp::Ge, 10.0);
        let solution = Solution {
            values: vec![10.0 - 1e-10],
            objective_value: 0.0,
            iterations: 0,
            approximate: false,
        };
        assert!(solution.violations(&problem, 1e-9).is_empty());
    }
}
