use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use log::{debug, info, warn};
use nalgebra::{DMatrix, SymmetricEigen};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SolveError;
use crate::problem::{ConstraintOp, LpProblem, QpProblem, QuadraticConstraint, Sense};
use crate::solution::Solution;

/// Eigenvalues below this fraction of the largest one count as zero.
const EIGEN_TOLERANCE: f64 = 1e-10;

/// Solver settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    /// Maximum interior-point iterations before giving up
    pub max_iterations: u32,
    /// Duality gap and feasibility tolerance
    pub tolerance: f64,
    /// Print the solver's own iteration log
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-8,
            verbose: false,
        }
    }
}

/// Interior-point solver for linear and convex quadratic programs
#[derive(Debug, Clone, Default)]
pub struct Solver {
    settings: Settings,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.settings.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.settings.tolerance = tol;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.settings.verbose = verbose;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Solve a linear program
    pub fn solve(&self, problem: &LpProblem) -> Result<Solution, SolveError> {
        problem.validate()?;
        let n = problem.num_variables();

        let mut rows = ConeRows::new(n);
        rows.add_linear(problem);

        let p = CscMatrix::zeros((n, n));
        let q = signed_objective(&problem.objective.coefficients, problem.objective.sense);
        let (values, iterations, approximate) = self.run(&p, &q, rows)?;

        let objective_value = problem.linear_objective(&values);
        info!("LP optimum {:.6} after {} iterations", objective_value, iterations);
        let solution = Solution {
            values,
            objective_value,
            iterations,
            approximate,
        };
        if solution.approximate {
            if let Some(worst) = solution.violations(problem, self.settings.tolerance.sqrt()).first() {
                warn!("reduced-accuracy LP solution: {}", worst.description);
            }
        }
        Ok(solution)
    }

    /// Solve a program with a quadratic objective term and/or quadratic constraints
    pub fn solve_quadratic(&self, problem: &QpProblem) -> Result<Solution, SolveError> {
        problem.validate()?;
        let n = problem.num_variables();
        let sense = problem.linear.objective.sense;

        let mut rows = ConeRows::new(n);
        rows.add_linear(&problem.linear);
        for qc in &problem.quadratic_constraints {
            rows.add_quadratic(qc)?;
        }

        // cᵀx + xᵀQx = ½xᵀ(2Q)x + cᵀx; maximization flips both terms
        let scale = match sense {
            Sense::Minimize => 2.0,
            Sense::Maximize => -2.0,
        };
        let hessian = symmetric(&problem.quadratic, scale);
        check_convex(&hessian, self.settings.tolerance)?;

        let p = upper_triangle_csc(&hessian);
        let q = signed_objective(&problem.linear.objective.coefficients, sense);
        let (values, iterations, approximate) = self.run(&p, &q, rows)?;

        let objective_value = problem.objective_value(&values);
        info!("QP optimum {:.6} after {} iterations", objective_value, iterations);
        Ok(Solution {
            values,
            objective_value,
            iterations,
            approximate,
        })
    }

    fn run(&self, p: &CscMatrix<f64>, q: &[f64], rows: ConeRows) -> Result<(Vec<f64>, u32, bool), SolveError> {
        let (a, b, cones) = rows.assemble();
        debug!(
            "clarabel setup: {} variables, {} rows, {} cones",
            q.len(),
            b.len(),
            cones.len()
        );

        let settings = DefaultSettings::<f64> {
            max_iter: self.settings.max_iterations,
            verbose: self.settings.verbose,
            tol_gap_abs: self.settings.tolerance,
            tol_gap_rel: self.settings.tolerance,
            tol_feas: self.settings.tolerance,
            ..DefaultSettings::default()
        };

        let mut solver = DefaultSolver::new(p, q, &a, &b, &cones, settings)
            .map_err(|e| SolveError::InvalidData(e.to_string()))?;
        solver.solve();

        let status = &solver.solution.status;
        let iterations = solver.info.iterations;
        let approximate = match status {
            SolverStatus::Solved => false,
            SolverStatus::AlmostSolved => true,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                warn!("clarabel reports primal infeasibility after {} iterations", iterations);
                return Err(SolveError::Infeasible);
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                warn!("clarabel reports dual infeasibility after {} iterations", iterations);
                return Err(SolveError::Unbounded);
            }
            other => {
                warn!("clarabel stopped with {:?} after {} iterations", other, iterations);
                return Err(SolveError::Failed(format!("{:?}", other)));
            }
        };

        Ok((solver.solution.x.clone(), iterations, approximate))
    }
}

/// Constraint rows grouped by cone, in `s = b - Ax ∈ K` form.
struct ConeRows {
    n: usize,
    zero: Vec<(Vec<f64>, f64)>,
    nonneg: Vec<(Vec<f64>, f64)>,
    soc: Vec<Vec<(Vec<f64>, f64)>>,
}

impl ConeRows {
    fn new(n: usize) -> Self {
        Self {
            n,
            zero: Vec::new(),
            nonneg: Vec::new(),
            soc: Vec::new(),
        }
    }

    fn add_linear(&mut self, problem: &LpProblem) {
        for c in &problem.constraints {
            match c.op {
                ConstraintOp::Eq => self.zero.push((c.coefficients.clone(), c.rhs)),
                ConstraintOp::Le => self.nonneg.push((c.coefficients.clone(), c.rhs)),
                ConstraintOp::Ge => self
                    .nonneg
                    .push((c.coefficients.iter().map(|v| -v).collect(), -c.rhs)),
            }
        }

        for (j, bound) in problem.bounds.iter().enumerate() {
            if bound.lower.is_finite() {
                self.nonneg.push((unit_row(self.n, j, -1.0), -bound.lower));
            }
            if let Some(upper) = bound.upper.filter(|u| u.is_finite()) {
                self.nonneg.push((unit_row(self.n, j, 1.0), upper));
            }
        }
    }

    /// `xᵀMx <= r` as `‖Fx‖ <= √r`, where the rows of `F` are `√λₖ·vₖᵀ` over
    /// the non-negligible eigenpairs of `M`, so `FᵀF = M`.
    fn add_quadratic(&mut self, qc: &QuadraticConstraint) -> Result<(), SolveError> {
        let n = self.n;
        let m = DMatrix::from_fn(n, n, |i, j| 0.5 * (qc.matrix[i][j] + qc.matrix[j][i]));
        let eigen = SymmetricEigen::new(m);
        let largest = eigen.eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let cutoff = EIGEN_TOLERANCE * largest.max(1.0);

        let mut factor: Vec<Vec<f64>> = Vec::new();
        for (k, &lambda) in eigen.eigenvalues.iter().enumerate() {
            if lambda < -cutoff {
                return Err(SolveError::InvalidData(format!(
                    "matrix of quadratic constraint '{}' is not positive semidefinite (eigenvalue {:.3e})",
                    qc.name, lambda
                )));
            }
            if lambda > cutoff {
                let scale = lambda.sqrt();
                factor.push((0..n).map(|j| -scale * eigen.eigenvectors[(j, k)]).collect());
            }
        }

        if factor.is_empty() {
            // xᵀMx is identically zero
            self.nonneg.push((vec![0.0; n], qc.rhs));
            return Ok(());
        }
        let mut block = Vec::with_capacity(factor.len() + 1);
        block.push((vec![0.0; n], qc.rhs.sqrt()));
        block.extend(factor.into_iter().map(|row| (row, 0.0)));
        self.soc.push(block);
        Ok(())
    }

    fn assemble(self) -> (CscMatrix<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
        let mut cones = Vec::new();
        if !self.zero.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(self.zero.len()));
        }
        if !self.nonneg.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(self.nonneg.len()));
        }
        for block in &self.soc {
            cones.push(SupportedConeT::SecondOrderConeT(block.len()));
        }

        let (rows, b): (Vec<Vec<f64>>, Vec<f64>) = self
            .zero
            .into_iter()
            .chain(self.nonneg)
            .chain(self.soc.into_iter().flatten())
            .unzip();

        (dense_to_csc(&rows, self.n), b, cones)
    }
}

fn unit_row(n: usize, j: usize, value: f64) -> Vec<f64> {
    let mut row = vec![0.0; n];
    row[j] = value;
    row
}

fn signed_objective(coefficients: &[f64], sense: Sense) -> Vec<f64> {
    match sense {
        Sense::Minimize => coefficients.to_vec(),
        Sense::Maximize => coefficients.iter().map(|c| -c).collect(),
    }
}

fn symmetric(matrix: &[Vec<f64>], scale: f64) -> DMatrix<f64> {
    let n = matrix.len();
    DMatrix::from_fn(n, n, |i, j| 0.5 * scale * (matrix[i][j] + matrix[j][i]))
}

fn check_convex(hessian: &DMatrix<f64>, tolerance: f64) -> Result<(), SolveError> {
    if hessian.iter().all(|v| *v == 0.0) {
        return Ok(());
    }
    let eigen = SymmetricEigen::new(hessian.clone());
    let smallest = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if smallest < -tolerance.sqrt() {
        return Err(SolveError::InvalidData(format!(
            "quadratic objective is not convex for its sense (smallest eigenvalue {:.3e})",
            smallest
        )));
    }
    Ok(())
}

/// Compressed column form of dense rows, zeros dropped.
fn dense_to_csc(rows: &[Vec<f64>], n_cols: usize) -> CscMatrix<f64> {
    let mut colptr = Vec::with_capacity(n_cols + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for j in 0..n_cols {
        for (i, row) in rows.iter().enumerate() {
            if row[j] != 0.0 {
                rowval.push(i);
                nzval.push(row[j]);
            }
        }
        colptr.push(rowval.len());
    }
    CscMatrix::new(rows.len(), n_cols, colptr, rowval, nzval)
}

/// Upper triangle (diagonal included) in compressed column form.
fn upper_triangle_csc(matrix: &DMatrix<f64>) -> CscMatrix<f64> {
    let n = matrix.ncols();
    let mut colptr = Vec::with_capacity(n + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for j in 0..n {
        for i in 0..=j {
            let v = matrix[(i, j)];
            if v != 0.0 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr.push(rowval.len());
    }
    CscMatrix::new(n, n, colptr, rowval, nzval)
}
