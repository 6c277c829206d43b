use orlab_solver::SolveError;
use thiserror::Error;

use crate::coordinates::ParseError;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    Dimension {
        context: String,
        expected: usize,
        found: usize,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Solver failed: {0}")]
    Solve(#[from] SolveError),
    #[error("Inconsistent result: {0}")]
    Inconsistent(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl ModelError {
    pub fn dimension(context: impl Into<String>, expected: usize, found: usize) -> Self {
        ModelError::Dimension {
            context: context.into(),
            expected,
            found,
        }
    }

    /// True when the solver proved the model has no finite optimum.
    pub fn is_infeasible_or_unbounded(&self) -> bool {
        matches!(self, ModelError::Solve(e) if e.is_infeasible_or_unbounded())
    }
}

/// Every row of `matrix` must have `cols` entries.
pub(crate) fn check_rectangular(matrix: &[Vec<f64>], cols: usize, context: &str) -> Result<(), ModelError> {
    for (i, row) in matrix.iter().enumerate() {
        if row.len() != cols {
            return Err(ModelError::dimension(format!("{} row {}", context, i + 1), cols, row.len()));
        }
    }
    Ok(())
}
