use crate::error::SolveError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a linear programming problem
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Variable names
    pub variables: Vec<String>,
    /// Objective function coefficients
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
    /// Per-variable bounds, one entry per variable
    pub bounds: Vec<Bound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub sense: Sense,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

/// Variable bound. `upper` of `None` means unbounded above.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bound {
    pub lower: f64,
    pub upper: Option<f64>,
}

impl Bound {
    pub fn non_negative() -> Self {
        Self { lower: 0.0, upper: None }
    }

    pub fn between(lower: f64, upper: f64) -> Self {
        Self { lower, upper: Some(upper) }
    }
}

impl Default for Bound {
    fn default() -> Self {
        Self::non_negative()
    }
}

impl ConstraintOp {
    /// Whether `lhs op rhs` holds within `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            ConstraintOp::Le => lhs <= rhs + tolerance,
            ConstraintOp::Ge => lhs >= rhs - tolerance,
            ConstraintOp::Eq => (lhs - rhs).abs() <= tolerance,
        }
    }
}

impl Constraint {
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.coefficients.iter().zip(values).map(|(c, x)| c * x).sum()
    }
}

impl LpProblem {
    /// New problem over `variables`, all non-negative, with a zero objective to minimize.
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                sense: Sense::Minimize,
            },
            constraints: Vec::new(),
            bounds: vec![Bound::non_negative(); n],
        }
    }

    /// Variables named `prefix1..prefixN`.
    pub fn with_indexed_variables(prefix: &str, n: usize) -> Self {
        Self::new((1..=n).map(|i| format!("{}{}", prefix, i)).collect())
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, sense: Sense) {
        self.objective = Objective { coefficients, sense };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn set_bound(&mut self, variable: usize, bound: Bound) {
        if let Some(b) = self.bounds.get_mut(variable) {
            *b = bound;
        }
    }

    pub fn set_bounds(&mut self, bounds: Vec<Bound>) {
        self.bounds = bounds;
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Linear part of the objective at `values`.
    pub fn linear_objective(&self, values: &[f64]) -> f64 {
        self.objective.coefficients.iter().zip(values).map(|(c, x)| c * x).sum()
    }

    /// Check that every vector in the problem has one entry per variable.
    pub fn validate(&self) -> Result<(), SolveError> {
        let n = self.num_variables();
        if self.objective.coefficients.len() != n {
            return Err(SolveError::dimension("objective", n, self.objective.coefficients.len()));
        }
        if self.bounds.len() != n {
            return Err(SolveError::dimension("bounds", n, self.bounds.len()));
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(SolveError::dimension(
                    format!("constraint '{}'", c.name),
                    n,
                    c.coefficients.len(),
                ));
            }
        }
        for (b, name) in self.bounds.iter().zip(&self.variables) {
            if let Some(upper) = b.upper {
                if upper < b.lower {
                    return Err(SolveError::InvalidData(format!(
                        "bound of {} has upper {} below lower {}",
                        name, upper, b.lower
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Convex quadratic constraint `xᵀ·M·x <= rhs`, `M` symmetric positive definite.
#[derive(Debug, Clone)]
pub struct QuadraticConstraint {
    pub name: String,
    pub matrix: Vec<Vec<f64>>,
    pub rhs: f64,
}

/// A linear program extended with a quadratic objective term and quadratic
/// constraints. The objective is `cᵀx + xᵀ·Q·x` in the linear part's sense.
#[derive(Debug, Clone)]
pub struct QpProblem {
    pub linear: LpProblem,
    /// Symmetric `Q`; must make the objective convex for its sense.
    pub quadratic: Vec<Vec<f64>>,
    pub quadratic_constraints: Vec<QuadraticConstraint>,
}

impl QpProblem {
    pub fn new(linear: LpProblem) -> Self {
        let n = linear.num_variables();
        Self {
            linear,
            quadratic: vec![vec![0.0; n]; n],
            quadratic_constraints: Vec::new(),
        }
    }

    pub fn set_quadratic(&mut self, matrix: Vec<Vec<f64>>) {
        self.quadratic = matrix;
    }

    pub fn add_quadratic_constraint(&mut self, name: impl Into<String>, matrix: Vec<Vec<f64>>, rhs: f64) {
        self.quadratic_constraints.push(QuadraticConstraint {
            name: name.into(),
            matrix,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.linear.num_variables()
    }

    /// Full objective `cᵀx + xᵀQx` at `values`.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.linear.linear_objective(values) + quadratic_form(&self.quadratic, values)
    }

    pub fn validate(&self) -> Result<(), SolveError> {
        self.linear.validate()?;
        let n = self.num_variables();
        check_square(&self.quadratic, n, "quadratic objective")?;
        for qc in &self.quadratic_constraints {
            check_square(&qc.matrix, n, &format!("quadratic constraint '{}'", qc.name))?;
            if qc.rhs < 0.0 {
                return Err(SolveError::InvalidData(format!(
                    "quadratic constraint '{}' has negative limit {}",
                    qc.name, qc.rhs
                )));
            }
        }
        Ok(())
    }
}

/// `xᵀ·M·x`
pub fn quadratic_form(matrix: &[Vec<f64>], x: &[f64]) -> f64 {
    matrix
        .iter()
        .zip(x)
        .map(|(row, xi)| xi * row.iter().zip(x).map(|(m, xj)| m * xj).sum::<f64>())
        .sum()
}

fn check_square(matrix: &[Vec<f64>], n: usize, context: &str) -> Result<(), SolveError> {
    if matrix.len() != n {
        return Err(SolveError::dimension(format!("{} rows", context), n, matrix.len()));
    }
    for row in matrix {
        if row.len() != n {
            return Err(SolveError::dimension(format!("{} columns", context), n, row.len()));
        }
    }
    Ok(())
}
