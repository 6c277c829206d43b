mod error;
mod problem;
mod solution;
mod solver;

pub use error::SolveError;
pub use problem::{quadratic_form, Bound, Constraint, ConstraintOp, LpProblem, Objective, QpProblem, QuadraticConstraint, Sense};
pub use solution::{ConstraintViolation, Solution};
pub use solver::{Settings, Solver};
