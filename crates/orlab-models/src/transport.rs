//! Transportation problem: ship from sources to destinations at minimum cost.
//!
//! Flows are flattened row-major, `x[i * destinations + j]` being the amount
//! sent from source `i` to destination `j`.

use log::{debug, info};
use orlab_solver::{ConstraintOp, LpProblem, Sense, Solution, Solver};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{check_rectangular, ModelError};

const BALANCE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransportProblem {
    /// `costs[i][j]`: unit cost from source `i` to destination `j`
    pub costs: Vec<Vec<f64>>,
    pub supply: Vec<f64>,
    pub demand: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Balance {
    Balanced,
    /// Total supply exceeds total demand by this amount
    SurplusSupply(f64),
    /// Total demand exceeds total supply by this amount
    SurplusDemand(f64),
}

/// How an unbalanced instance is turned into a linear program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnbalancedStrategy {
    /// Sources ship at most their supply, destinations receive at least their demand
    #[default]
    Inequality,
    /// Add a zero-cost dummy node absorbing the imbalance, then solve the balanced form
    DummyNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dummy {
    Source,
    Destination,
}

/// A transportation linear program plus what is needed to read its solution back.
#[derive(Debug, Clone)]
pub struct TransportFormulation {
    pub lp: LpProblem,
    pub balance: Balance,
    pub strategy: UnbalancedStrategy,
    sources: usize,
    destinations: usize,
    dummy: Option<Dummy>,
    supply: Vec<f64>,
    demand: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransportPlan {
    /// Sources × destinations shipped amounts, dummy nodes excluded
    pub flows: Vec<Vec<f64>>,
    pub total_cost: f64,
    pub balance: Balance,
    /// Per source: supply left unshipped
    pub unused_supply: Vec<f64>,
    /// Per destination: demand left unmet
    pub unmet_demand: Vec<f64>,
}

impl Default for TransportProblem {
    /// Five depots supplying six distribution points, totals balanced at 300.
    fn default() -> Self {
        Self {
            costs: vec![
                vec![2.0, 3.0, 1.0, 4.0, 5.0, 6.0],
                vec![4.0, 1.0, 3.0, 2.0, 6.0, 5.0],
                vec![3.0, 5.0, 2.0, 6.0, 4.0, 1.0],
                vec![5.0, 6.0, 4.0, 3.0, 2.0, 1.0],
                vec![1.0, 2.0, 3.0, 5.0, 4.0, 6.0],
            ],
            supply: vec![50.0, 60.0, 40.0, 70.0, 80.0],
            demand: vec![40.0, 50.0, 60.0, 70.0, 50.0, 30.0],
        }
    }
}

impl TransportProblem {
    pub fn new(costs: Vec<Vec<f64>>, supply: Vec<f64>, demand: Vec<f64>) -> Result<Self, ModelError> {
        let problem = Self { costs, supply, demand };
        problem.validate()?;
        Ok(problem)
    }

    /// Ten sources, three destinations; supply 300 against demand 250.
    pub fn unbalanced_example() -> Self {
        Self {
            costs: vec![
                vec![12.0, 8.0, 15.0],
                vec![10.0, 18.0, 9.0],
                vec![14.0, 9.0, 19.0],
                vec![11.0, 12.0, 10.0],
                vec![20.0, 13.0, 11.0],
                vec![17.0, 15.0, 14.0],
                vec![10.0, 16.0, 12.0],
                vec![13.0, 11.0, 15.0],
                vec![18.0, 14.0, 9.0],
                vec![14.0, 10.0, 17.0],
            ],
            supply: vec![25.0, 30.0, 20.0, 40.0, 35.0, 15.0, 50.0, 30.0, 25.0, 30.0],
            demand: vec![70.0, 100.0, 80.0],
        }
    }

    pub fn sources(&self) -> usize {
        self.supply.len()
    }

    pub fn destinations(&self) -> usize {
        self.demand.len()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.costs.len() != self.sources() {
            return Err(ModelError::dimension("cost matrix rows vs supply", self.sources(), self.costs.len()));
        }
        check_rectangular(&self.costs, self.destinations(), "cost matrix")?;
        if self.sources() == 0 || self.destinations() == 0 {
            return Err(ModelError::InvalidInput(
                "transportation problem needs at least one source and one destination".to_string(),
            ));
        }
        if self.costs.iter().flatten().any(|c| !c.is_finite()) {
            return Err(ModelError::InvalidInput("cost matrix has non-finite entries".to_string()));
        }
        if let Some(v) = self.supply.iter().chain(&self.demand).find(|v| **v < 0.0 || !v.is_finite()) {
            return Err(ModelError::InvalidInput(format!(
                "supply and demand must be finite and non-negative, found {}",
                v
            )));
        }
        Ok(())
    }

    pub fn balance(&self) -> Balance {
        let supply: f64 = self.supply.iter().sum();
        let demand: f64 = self.demand.iter().sum();
        let diff = supply - demand;
        if diff.abs() <= BALANCE_TOLERANCE * supply.max(demand).max(1.0) {
            Balance::Balanced
        } else if diff > 0.0 {
            Balance::SurplusSupply(diff)
        } else {
            Balance::SurplusDemand(-diff)
        }
    }

    /// Build the linear program. Balanced instances always use equality constraints.
    pub fn formulate(&self, strategy: UnbalancedStrategy) -> Result<TransportFormulation, ModelError> {
        self.validate()?;
        let balance = self.balance();

        let (m, n) = (self.sources(), self.destinations());

        let (lp, dummy) = match (balance, strategy) {
            (Balance::Balanced, _) => (equality_form(&self.costs, &self.supply, &self.demand), None),
            (_, UnbalancedStrategy::Inequality) => (self.inequality_form(), None),
            (Balance::SurplusSupply(surplus), UnbalancedStrategy::DummyNode) => {
                let costs: Vec<Vec<f64>> = self
                    .costs
                    .iter()
                    .map(|row| row.iter().copied().chain([0.0]).collect())
                    .collect();
                let demand: Vec<f64> = self.demand.iter().copied().chain([surplus]).collect();
                (equality_form(&costs, &self.supply, &demand), Some(Dummy::Destination))
            }
            (Balance::SurplusDemand(shortfall), UnbalancedStrategy::DummyNode) => {
                let mut costs = self.costs.clone();
                costs.push(vec![0.0; n]);
                let supply: Vec<f64> = self.supply.iter().copied().chain([shortfall]).collect();
                (equality_form(&costs, &supply, &self.demand), Some(Dummy::Source))
            }
        };

        let (sources, destinations) = match dummy {
            Some(Dummy::Destination) => (m, n + 1),
            Some(Dummy::Source) => (m + 1, n),
            None => (m, n),
        };
        debug!(
            "transportation LP: {} variables, {} constraints, {:?}",
            lp.num_variables(),
            lp.num_constraints(),
            balance
        );
        Ok(TransportFormulation {
            lp,
            balance,
            strategy,
            sources,
            destinations,
            dummy,
            supply: self.supply.clone(),
            demand: self.demand.clone(),
        })
    }

    pub fn solve(&self, solver: &Solver, strategy: UnbalancedStrategy) -> Result<TransportPlan, ModelError> {
        let formulation = self.formulate(strategy)?;
        let solution = solver.solve(&formulation.lp)?;
        let plan = formulation.interpret(&solution)?;
        info!("transportation plan cost {:.4}", plan.total_cost);
        Ok(plan)
    }

    fn inequality_form(&self) -> LpProblem {
        let (m, n) = (self.sources(), self.destinations());
        let mut lp = flow_problem(&self.costs, m, n);

        for (i, &s) in self.supply.iter().enumerate() {
            lp.add_constraint(format!("supply_{}", i + 1), source_row(i, m, n, 1.0), ConstraintOp::Le, s);
        }
        // received >= demand, written as -received <= -demand
        for (j, &d) in self.demand.iter().enumerate() {
            lp.add_constraint(format!("demand_{}", j + 1), destination_row(j, m, n, -1.0), ConstraintOp::Le, -d);
        }
        lp
    }
}

impl TransportFormulation {
    /// Reshape the flat solution into the flow grid of the original (non-dummy) nodes.
    pub fn interpret(&self, solution: &Solution) -> Result<TransportPlan, ModelError> {
        let expected = self.sources * self.destinations;
        if solution.values.len() != expected {
            return Err(ModelError::dimension("transport solution", expected, solution.values.len()));
        }

        let grid = reshape(&solution.values, self.sources, self.destinations);
        let flows: Vec<Vec<f64>> = match self.dummy {
            Some(Dummy::Destination) => grid
                .into_iter()
                .map(|mut row| {
                    row.pop();
                    row
                })
                .collect(),
            Some(Dummy::Source) => {
                let mut grid = grid;
                grid.pop();
                grid
            }
            None => grid,
        };

        let unused_supply = self
            .supply
            .iter()
            .zip(&flows)
            .map(|(s, row)| (s - row.iter().sum::<f64>()).max(0.0))
            .collect();
        let unmet_demand = self
            .demand
            .iter()
            .enumerate()
            .map(|(j, d)| (d - flows.iter().map(|row| row[j]).sum::<f64>()).max(0.0))
            .collect();

        Ok(TransportPlan {
            flows,
            total_cost: solution.objective_value,
            balance: self.balance,
            unused_supply,
            unmet_demand,
        })
    }
}

impl TransportPlan {
    pub fn shipped_from(&self, source: usize) -> f64 {
        self.flows[source].iter().sum()
    }

    pub fn received_by(&self, destination: usize) -> f64 {
        self.flows.iter().map(|row| row[destination]).sum()
    }

    pub fn total_shipped(&self) -> f64 {
        self.flows.iter().flatten().sum()
    }
}

/// Split a flat row-major vector into `rows` rows of `cols` entries.
pub fn reshape(flat: &[f64], rows: usize, cols: usize) -> Vec<Vec<f64>> {
    (0..rows).map(|i| flat[i * cols..(i + 1) * cols].to_vec()).collect()
}

fn equality_form(costs: &[Vec<f64>], supply: &[f64], demand: &[f64]) -> LpProblem {
    let (m, n) = (supply.len(), demand.len());
    let mut lp = flow_problem(costs, m, n);

    for (i, &s) in supply.iter().enumerate() {
        lp.add_constraint(format!("supply_{}", i + 1), source_row(i, m, n, 1.0), ConstraintOp::Eq, s);
    }
    for (j, &d) in demand.iter().enumerate() {
        lp.add_constraint(format!("demand_{}", j + 1), destination_row(j, m, n, 1.0), ConstraintOp::Eq, d);
    }
    lp
}

fn flow_problem(costs: &[Vec<f64>], m: usize, n: usize) -> LpProblem {
    let names = (0..m)
        .flat_map(|i| (0..n).map(move |j| format!("x{}_{}", i + 1, j + 1)))
        .collect();
    let mut lp = LpProblem::new(names);
    lp.set_objective(costs.iter().flatten().copied().collect(), Sense::Minimize);
    lp
}

fn source_row(i: usize, m: usize, n: usize, value: f64) -> Vec<f64> {
    let mut row = vec![0.0; m * n];
    row[i * n..(i + 1) * n].fill(value);
    row
}

fn destination_row(j: usize, m: usize, n: usize, value: f64) -> Vec<f64> {
    let mut row = vec![0.0; m * n];
    for i in 0..m {
        row[i * n + j] = value;
    }
    row
}
