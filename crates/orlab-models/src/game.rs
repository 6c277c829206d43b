//! Two-player zero-sum games. The row player maximizes the payoff, the column
//! player minimizes it.

use log::{debug, info};
use orlab_solver::{Bound, ConstraintOp, LpProblem, Sense, Solution, Solver};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{check_rectangular, ModelError};

/// Agreement required between the two players' equilibrium values.
pub const VALUE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PayoffMatrix {
    /// `payoffs[i][j]`: what the row player wins when playing `i` against `j`
    pub payoffs: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixedEquilibrium {
    pub row_strategy: Vec<f64>,
    pub column_strategy: Vec<f64>,
    /// Value of the shifted game found by the row player's program
    pub row_value: f64,
    /// Value of the shifted game found by the column player's program
    pub column_value: f64,
    /// Constant added to every payoff before solving
    pub shift: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PureStrategies {
    /// Row maximizing its worst-case payoff
    pub row_index: usize,
    /// `max_i min_j M[i][j]`
    pub row_value: f64,
    /// Column minimizing its worst-case loss
    pub column_index: usize,
    /// `min_j max_i M[i][j]`
    pub column_value: f64,
}

impl Default for PayoffMatrix {
    fn default() -> Self {
        Self {
            payoffs: vec![
                vec![4.2, -5.0, 6.7],
                vec![1.13, 5.1, -1.6],
                vec![-2.86, 4.1, 3.13],
                vec![2.85, -4.7, 7.5],
                vec![8.55, 0.9, -4.2],
            ],
        }
    }
}

impl PayoffMatrix {
    pub fn new(payoffs: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        let matrix = Self { payoffs };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Integer 5×3 game with a saddle point at row 4, column 2.
    pub fn pure_example() -> Self {
        Self {
            payoffs: vec![
                vec![3.0, -1.0, 2.0],
                vec![4.0, 0.0, -3.0],
                vec![-2.0, 1.0, 5.0],
                vec![3.0, 1.0, 6.0],
                vec![1.0, -2.0, 4.0],
            ],
        }
    }

    pub fn rows(&self) -> usize {
        self.payoffs.len()
    }

    pub fn cols(&self) -> usize {
        self.payoffs.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.rows() == 0 || self.cols() == 0 {
            return Err(ModelError::InvalidInput("payoff matrix is empty".to_string()));
        }
        check_rectangular(&self.payoffs, self.cols(), "payoff matrix")?;
        if self.payoffs.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidInput("payoff matrix has non-finite entries".to_string()));
        }
        Ok(())
    }

    /// `max(M)`, or `-min(M)` when adding `max(M)` would leave a negative entry.
    pub fn positivity_shift(&self) -> f64 {
        let max = self.payoffs.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = self.payoffs.iter().flatten().copied().fold(f64::INFINITY, f64::min);
        if min + max >= 0.0 { max } else { -min }
    }

    fn shifted(&self, shift: f64) -> Vec<Vec<f64>> {
        self.payoffs
            .iter()
            .map(|row| row.iter().map(|v| v + shift).collect())
            .collect()
    }

    /// Variables `(v, x1..xn)`: maximize `v` with `v <= Σ_i x_i M'[i][j]` for every column.
    pub fn row_player_problem(&self) -> Result<LpProblem, ModelError> {
        self.validate()?;
        let m = self.shifted(self.positivity_shift());
        let (rows, cols) = (self.rows(), self.cols());

        let mut lp = strategy_problem(rows, "x");
        lp.set_objective(unit_objective(rows), Sense::Maximize);
        for j in 0..cols {
            let coefficients = std::iter::once(1.0).chain((0..rows).map(|i| -m[i][j])).collect();
            lp.add_constraint(format!("column_{}", j + 1), coefficients, ConstraintOp::Le, 0.0);
        }
        Ok(lp)
    }

    /// Variables `(v, y1..ym)`: minimize `v` with `Σ_j y_j M'[i][j] <= v` for every row.
    pub fn column_player_problem(&self) -> Result<LpProblem, ModelError> {
        self.validate()?;
        let m = self.shifted(self.positivity_shift());
        let (rows, cols) = (self.rows(), self.cols());

        let mut lp = strategy_problem(cols, "y");
        lp.set_objective(unit_objective(cols), Sense::Minimize);
        for (i, row) in m.iter().enumerate() {
            let coefficients = std::iter::once(-1.0).chain(row.iter().copied()).collect();
            lp.add_constraint(format!("row_{}", i + 1), coefficients, ConstraintOp::Le, 0.0);
        }
        debug!("game programs: {} row strategies, {} column strategies", rows, cols);
        Ok(lp)
    }

    pub fn solve_mixed(&self, solver: &Solver) -> Result<MixedEquilibrium, ModelError> {
        let row_solution = solver.solve(&self.row_player_problem()?)?;
        let column_solution = solver.solve(&self.column_player_problem()?)?;

        let equilibrium = MixedEquilibrium {
            row_strategy: strategy_from(&row_solution),
            column_strategy: strategy_from(&column_solution),
            row_value: row_solution.objective_value,
            column_value: column_solution.objective_value,
            shift: self.positivity_shift(),
        };
        info!("mixed equilibrium value {:.6}", equilibrium.game_value());
        Ok(equilibrium)
    }

    /// Maximin row and minimax column, whether or not they meet at a saddle point.
    pub fn pure_strategies(&self) -> Result<PureStrategies, ModelError> {
        self.validate()?;

        let row_minima = self
            .payoffs
            .iter()
            .map(|row| row.iter().copied().fold(f64::INFINITY, f64::min));
        let (row_index, row_value) = first_best(row_minima, |candidate, best| candidate > best);

        let column_maxima = (0..self.cols()).map(|j| {
            self.payoffs
                .iter()
                .map(|row| row[j])
                .fold(f64::NEG_INFINITY, f64::max)
        });
        let (column_index, column_value) = first_best(column_maxima, |candidate, best| candidate < best);

        Ok(PureStrategies {
            row_index,
            row_value,
            column_index,
            column_value,
        })
    }
}

impl MixedEquilibrium {
    /// Value of the original game.
    pub fn game_value(&self) -> f64 {
        self.row_value - self.shift
    }

    /// Both players' programs must reach the same value.
    pub fn check_consistency(&self, tolerance: f64) -> Result<(), ModelError> {
        let gap = (self.row_value - self.column_value).abs();
        if gap > tolerance {
            return Err(ModelError::Inconsistent(format!(
                "row player value {:.9} and column player value {:.9} differ by {:.3e}",
                self.row_value - self.shift,
                self.column_value - self.shift,
                gap
            )));
        }
        Ok(())
    }
}

impl PureStrategies {
    pub fn has_saddle_point(&self) -> bool {
        self.row_value == self.column_value
    }
}

fn strategy_problem(strategies: usize, prefix: &str) -> LpProblem {
    let names = std::iter::once("v".to_string())
        .chain((1..=strategies).map(|k| format!("{}{}", prefix, k)))
        .collect();
    let mut lp = LpProblem::new(names);
    lp.add_constraint(
        "probabilities",
        std::iter::once(0.0).chain(std::iter::repeat_n(1.0, strategies)).collect(),
        ConstraintOp::Eq,
        1.0,
    );
    for k in 1..=strategies {
        lp.set_bound(k, Bound::between(0.0, 1.0));
    }
    lp
}

fn unit_objective(strategies: usize) -> Vec<f64> {
    let mut c = vec![0.0; strategies + 1];
    c[0] = 1.0;
    c
}

/// Drop `v`, clip round-off below zero and renormalize.
fn strategy_from(solution: &Solution) -> Vec<f64> {
    let clipped: Vec<f64> = solution.values[1..].iter().map(|p| p.max(0.0)).collect();
    let total: f64 = clipped.iter().sum();
    if total > 0.0 {
        clipped.iter().map(|p| p / total).collect()
    } else {
        clipped
    }
}

/// Index and value of the first element preferred by `better` over all before it.
fn first_best(values: impl Iterator<Item = f64>, better: impl Fn(f64, f64) -> bool) -> (usize, f64) {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        match best {
            Some((_, b)) if !better(v, b) => {}
            _ => best = Some((i, v)),
        }
    }
    best.unwrap_or((0, f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_strategy_saddle_point() {
        let pure = PayoffMatrix::pure_example().pure_strategies().unwrap();
        assert_eq!(pure.row_index, 3);
        assert_eq!(pure.row_value, 1.0);
        assert_eq!(pure.column_index, 1);
        assert_eq!(pure.column_value, 1.0);
        assert!(pure.has_saddle_point());
    }

    #[test]
    fn test_pure_strategy_without_saddle_point() {
        let pennies = PayoffMatrix::new(vec![vec![1.0, -1.0], vec![-1.0, 1.0]]).unwrap();
        let pure = pennies.pure_strategies().unwrap();
        assert_eq!(pure.row_index, 0);
        assert_eq!(pure.row_value, -1.0);
        assert_eq!(pure.column_index, 0);
        assert_eq!(pure.column_value, 1.0);
        assert!(!pure.has_saddle_point());
    }

    #[test]
    fn test_shift() {
        assert_eq!(PayoffMatrix::default().positivity_shift(), 8.55);
        let skewed = PayoffMatrix::new(vec![vec![-10.0, 1.0]]).unwrap();
        assert_eq!(skewed.positivity_shift(), 10.0);
    }

    #[test]
    fn test_row_player_layout() {
        let game = PayoffMatrix::pure_example();
        let lp = game.row_player_problem().unwrap();
        assert_eq!(lp.num_variables(), 6);
        // probability row plus one row per column strategy
        assert_eq!(lp.num_constraints(), 4);
        assert_eq!(lp.objective.sense, Sense::Maximize);
        assert_eq!(lp.bounds[0], Bound::non_negative());
        assert_eq!(lp.bounds[1], Bound::between(0.0, 1.0));

        // shift is 6: column 1 is [3,4,-2,3,1] + 6
        let col = &lp.constraints[1].coefficients;
        assert_eq!(col, &vec![1.0, -9.0, -10.0, -4.0, -9.0, -7.0]);
    }

    #[test]
    fn test_matching_pennies_mixed() {
        let game = PayoffMatrix::new(vec![vec![1.0, -1.0], vec![-1.0, 1.0]]).unwrap();
        let eq = game.solve_mixed(&Solver::new()).unwrap();
        for p in eq.row_strategy.iter().chain(&eq.column_strategy) {
            assert!((p - 0.5).abs() < 1e-5);
        }
        assert!(eq.game_value().abs() < 1e-6);
        eq.check_consistency(VALUE_TOLERANCE).unwrap();
    }

    #[test]
    fn test_mixed_strategies_are_distributions() {
        let eq = PayoffMatrix::default().solve_mixed(&Solver::new()).unwrap();
        assert_eq!(eq.row_strategy.len(), 5);
        assert_eq!(eq.column_strategy.len(), 3);
        for s in [&eq.row_strategy, &eq.column_strategy] {
            assert!(s.iter().all(|p| *p >= 0.0));
            assert!((s.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        eq.check_consistency(VALUE_TOLERANCE).unwrap();
    }

    #[test]
    fn test_mixed_value_matches_saddle_point() {
        let game = PayoffMatrix::pure_example();
        let eq = game.solve_mixed(&Solver::new()).unwrap();
        assert!((eq.game_value() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_consistency_check_reports_gap() {
        let eq = MixedEquilibrium {
            row_strategy: vec![1.0],
            column_strategy: vec![1.0],
            row_value: 2.0,
            column_value: 2.1,
            shift: 0.0,
        };
        assert!(matches!(eq.check_consistency(1e-6), Err(ModelError::Inconsistent(_))));
    }

    #[test]
    fn test_rejects_ragged_matrix() {
        assert!(PayoffMatrix::new(vec![vec![1.0, 2.0], vec![3.0]]).is_err());
        assert!(PayoffMatrix::new(Vec::new()).is_err());
    }
}
