use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    Dimension {
        context: String,
        expected: usize,
        found: usize,
    },
    #[error("Problem is infeasible")]
    Infeasible,
    #[error("Problem is unbounded")]
    Unbounded,
    #[error("Solver stopped without an optimum: {0}")]
    Failed(String),
    #[error("Invalid problem data: {0}")]
    InvalidData(String),
}

impl SolveError {
    pub fn dimension(context: impl Into<String>, expected: usize, found: usize) -> Self {
        SolveError::Dimension {
            context: context.into(),
            expected,
            found,
        }
    }

    /// True when the solver proved there is no finite optimum.
    pub fn is_infeasible_or_unbounded(&self) -> bool {
        matches!(self, SolveError::Infeasible | SolveError::Unbounded)
    }
}
