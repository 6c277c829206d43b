use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::coordinates::Point;
use crate::error::{check_rectangular, ModelError};

/// Square pairwise cost matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceMatrix {
    rows: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    /// Euclidean distances between every pair of points.
    pub fn from_points(points: &[Point]) -> Self {
        let n = points.len();
        let mut rows = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dx = points[i].x - points[j].x;
                    let dy = points[i].y - points[j].y;
                    rows[i][j] = (dx * dx + dy * dy).sqrt();
                }
            }
        }
        debug!("built {}x{} distance matrix", n, n);
        Self { rows }
    }

    /// Wraps explicit weights; callers guarantee the rows are square.
    pub(crate) fn from_square(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        check_rectangular(&rows, rows.len(), "distance matrix")?;
        Ok(Self { rows })
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i][j]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Length of the closed tour visiting `route` in order and returning to its start.
    pub fn tour_cost(&self, route: &[usize]) -> Result<f64, ModelError> {
        self.check_route(route)?;
        Ok(self.closed_cost(route))
    }

    /// True when `d[i][j] == d[j][i]` for every pair.
    pub fn is_symmetric(&self) -> bool {
        let n = self.size();
        (0..n).all(|i| (i + 1..n).all(|j| self.rows[i][j] == self.rows[j][i]))
    }

    /// Improve `route` in place by segment reversals until none shortens it.
    /// Returns the final tour cost.
    pub fn two_opt(&self, route: &mut [usize]) -> Result<f64, ModelError> {
        self.check_route(route)?;
        let n = route.len();
        let symmetric = self.is_symmetric();

        let mut improved = n > 2;
        let mut passes = 0;
        while improved {
            improved = false;
            passes += 1;
            for i in 1..n - 1 {
                for j in i + 1..n {
                    if self.reversal_delta(route, i, j, symmetric) < -1e-10 {
                        route[i..=j].reverse();
                        improved = true;
                    }
                }
            }
        }
        debug!("2-opt converged after {} passes", passes);
        Ok(self.closed_cost(route))
    }

    /// Cost change from reversing `route[i..=j]`. Asymmetric weights also
    /// change the cost of every edge inside the segment.
    fn reversal_delta(&self, route: &[usize], i: usize, j: usize, symmetric: bool) -> f64 {
        let d = &self.rows;
        let (prev, next) = (route[i - 1], route[(j + 1) % route.len()]);
        let mut delta = d[prev][route[j]] + d[route[i]][next] - d[prev][route[i]] - d[route[j]][next];
        if !symmetric {
            for k in i..j {
                delta += d[route[k + 1]][route[k]] - d[route[k]][route[k + 1]];
            }
        }
        delta
    }

    /// Tab-separated rows, `decimals` places per entry.
    pub fn to_tsv(&self, decimals: usize) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| format!("{:.*}", decimals, v))
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub(crate) fn closed_cost(&self, route: &[usize]) -> f64 {
        if route.is_empty() {
            return 0.0;
        }
        let legs: f64 = route.windows(2).map(|w| self.rows[w[0]][w[1]]).sum();
        legs + self.rows[route[route.len() - 1]][route[0]]
    }

    fn check_route(&self, route: &[usize]) -> Result<(), ModelError> {
        let n = self.size();
        if route.len() != n {
            return Err(ModelError::dimension("tour", n, route.len()));
        }
        let mut seen = vec![false; n];
        for &city in route {
            if city >= n || seen[city] {
                return Err(ModelError::InvalidInput(format!(
                    "tour is not a permutation of 0..{} (city {})",
                    n, city
                )));
            }
            seen[city] = true;
        }
        Ok(())
    }
}
