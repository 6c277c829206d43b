//! Genetic search for short closed tours over a [`DistanceMatrix`].
//!
//! Each generation keeps the elite, breeds the rest from rank-selected
//! parents with cut-point crossover and swap mutation, and periodically
//! polishes the whole population with 2-opt. Runs are reproducible for a
//! given seed.

use std::collections::HashSet;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distance::DistanceMatrix;
use crate::error::ModelError;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeneticSettings {
    pub population_size: usize,
    pub generations: usize,
    /// Share of the population drawn as parents each generation
    pub crossover_rate: f64,
    /// Best individuals copied unchanged into the next generation
    pub elite_size: usize,
    /// Run 2-opt on every individual each time `generation % interval == 0`; 0 disables it
    pub two_opt_interval: usize,
    pub seed: u64,
}

impl Default for GeneticSettings {
    fn default() -> Self {
        Self {
            population_size: 200,
            generations: 2000,
            crossover_rate: 0.8,
            elite_size: 7,
            two_opt_interval: 10,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneticTour {
    pub route: Vec<usize>,
    pub cost: f64,
    /// Cheapest tour in the population after each generation
    pub best_per_generation: Vec<f64>,
}

impl GeneticSettings {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.population_size < 2 {
            return Err(ModelError::InvalidInput("population needs at least two individuals".to_string()));
        }
        if self.elite_size > self.population_size {
            return Err(ModelError::InvalidInput(format!(
                "elite of {} exceeds population of {}",
                self.elite_size, self.population_size
            )));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(ModelError::InvalidInput(format!(
                "crossover rate {} outside [0, 1]",
                self.crossover_rate
            )));
        }
        Ok(())
    }
}

/// Search for a short closed tour visiting every city of `matrix`.
pub fn evolve(matrix: &DistanceMatrix, settings: &GeneticSettings) -> Result<GeneticTour, ModelError> {
    settings.validate()?;
    let n = matrix.size();
    if n < 2 {
        let route: Vec<usize> = (0..n).collect();
        let cost = matrix.tour_cost(&route)?;
        return Ok(GeneticTour {
            route,
            cost,
            best_per_generation: Vec::new(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
    let mut population = initial_population(&mut rng, n, settings.population_size);
    let size = population.len();
    let mut costs = tour_costs(matrix, &population);
    let mut history = Vec::with_capacity(settings.generations);

    for generation in 0..settings.generations {
        let order = by_fitness(&fitness_probabilities(&costs));
        let cumulative = rank_cumulative(&order);

        let mut next: Vec<Vec<usize>> = order
            .iter()
            .take(settings.elite_size)
            .map(|&i| population[i].clone())
            .collect();

        let parent_count = (settings.crossover_rate * size as f64) as usize;
        let parents: Vec<usize> = (0..parent_count)
            .map(|_| rank_select(&mut rng, &cumulative))
            .collect();

        let rate = mutation_rate(generation, settings.generations);
        let mut offspring = Vec::with_capacity(parents.len());
        for pair in parents.chunks_exact(2) {
            let (mut a, mut b) = crossover(&mut rng, &population[pair[0]], &population[pair[1]]);
            if rng.r#gen::<f64>() < rate {
                swap_mutation(&mut rng, &mut a);
            }
            if rng.r#gen::<f64>() < rate {
                swap_mutation(&mut rng, &mut b);
            }
            offspring.push(a);
            offspring.push(b);
        }

        while next.len() < size {
            match offspring.pop() {
                Some(child) => next.push(child),
                None => next.push(random_permutation(&mut rng, n)),
            }
        }

        if settings.two_opt_interval > 0 && generation % settings.two_opt_interval == 0 {
            for individual in &mut next {
                matrix.two_opt(individual)?;
            }
        }

        population = next;
        costs = tour_costs(matrix, &population);
        let best = costs.iter().copied().fold(f64::INFINITY, f64::min);
        debug!("generation {} best cost {:.4}", generation + 1, best);
        history.push(best);
    }

    let (best, cost) = costs
        .iter()
        .copied()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((0, f64::INFINITY));
    info!("genetic search over {} generations: best cost {:.4}", settings.generations, cost);

    Ok(GeneticTour {
        route: population.swap_remove(best),
        cost,
        best_per_generation: history,
    })
}

/// Up to `size` distinct random permutations, fewer when `n!` is smaller.
fn initial_population(rng: &mut ChaCha8Rng, n: usize, size: usize) -> Vec<Vec<usize>> {
    let distinct = (1..=n).try_fold(1usize, |acc, k| acc.checked_mul(k)).unwrap_or(usize::MAX);
    let target = size.min(distinct);

    let mut seen = HashSet::with_capacity(target);
    let mut population = Vec::with_capacity(target);
    while population.len() < target {
        let perm = random_permutation(rng, n);
        if seen.insert(perm.clone()) {
            population.push(perm);
        }
    }
    population
}

fn random_permutation(rng: &mut ChaCha8Rng, n: usize) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(rng);
    perm
}

fn tour_costs(matrix: &DistanceMatrix, population: &[Vec<usize>]) -> Vec<f64> {
    population.iter().map(|route| matrix.closed_cost(route)).collect()
}

/// `max(cost) - cost`, normalized; uniform when every tour costs the same.
fn fitness_probabilities(costs: &[f64]) -> Vec<f64> {
    let worst = costs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let fitness: Vec<f64> = costs.iter().map(|c| worst - c).collect();
    let total: f64 = fitness.iter().sum();
    if total > 0.0 {
        fitness.iter().map(|f| f / total).collect()
    } else {
        vec![1.0 / costs.len() as f64; costs.len()]
    }
}

/// Indices from fittest to least fit; ties keep population order.
fn by_fitness(probabilities: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));
    order
}

/// Cumulative selection probabilities indexed by individual. The fittest
/// gets rank `len`, the least fit rank 1.
fn rank_cumulative(order: &[usize]) -> Vec<f64> {
    let len = order.len();
    let mut ranks = vec![0.0; len];
    for (position, &i) in order.iter().enumerate() {
        ranks[i] = (len - position) as f64;
    }
    let total: f64 = ranks.iter().sum();
    ranks
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r / total;
            Some(*acc)
        })
        .collect()
}

fn rank_select(rng: &mut ChaCha8Rng, cumulative: &[f64]) -> usize {
    let draw: f64 = rng.r#gen();
    cumulative
        .iter()
        .position(|&c| draw <= c)
        .unwrap_or(cumulative.len() - 1)
}

/// Each child keeps its own parent's head up to a random cut and takes the
/// remaining cities in the other parent's order.
fn crossover(rng: &mut ChaCha8Rng, first: &[usize], second: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let cut = rng.gen_range(1..first.len());
    (ordered_fill(&first[..cut], second), ordered_fill(&second[..cut], first))
}

fn ordered_fill(head: &[usize], donor: &[usize]) -> Vec<usize> {
    let mut taken = vec![false; donor.len()];
    for &city in head {
        taken[city] = true;
    }
    let mut child = head.to_vec();
    child.extend(donor.iter().copied().filter(|&city| !taken[city]));
    child
}

fn swap_mutation(rng: &mut ChaCha8Rng, route: &mut [usize]) {
    let n = route.len();
    let i = rng.gen_range(0..n);
    let mut j = rng.gen_range(0..n - 1);
    if j >= i {
        j += 1;
    }
    route.swap(i, j);
}

/// Starts at 0.5 and decays linearly towards 0 over the run.
fn mutation_rate(generation: usize, generations: usize) -> f64 {
    0.5 * (1.0 - generation as f64 / generations as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::Point;

    fn scattered(n: usize, seed: u64) -> DistanceMatrix {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let points: Vec<Point> = (0..n)
            .map(|index| Point {
                index,
                x: rng.gen_range(0.0..100.0),
                y: rng.gen_range(0.0..100.0),
            })
            .collect();
        DistanceMatrix::from_points(&points)
    }

    fn small_run(seed: u64) -> GeneticSettings {
        GeneticSettings {
            population_size: 20,
            generations: 30,
            seed,
            ..GeneticSettings::default()
        }
    }

    #[test]
    fn test_same_seed_same_tour() {
        let m = scattered(12, 3);
        let first = evolve(&m, &small_run(7)).unwrap();
        let second = evolve(&m, &small_run(7)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.best_per_generation.len(), 30);
    }

    #[test]
    fn test_reported_cost_matches_route() {
        let m = scattered(15, 11);
        let tour = evolve(&m, &small_run(1)).unwrap();
        let mut sorted = tour.route.clone();
        sorted.sort();
        assert_eq!(sorted, (0..15).collect::<Vec<_>>());
        assert!((m.tour_cost(&tour.route).unwrap() - tour.cost).abs() < 1e-9);
    }

    #[test]
    fn test_best_cost_never_increases() {
        let m = scattered(12, 5);
        let tour = evolve(&m, &small_run(2)).unwrap();
        for w in tour.best_per_generation.windows(2) {
            assert!(w[1] <= w[0] + 1e-12, "{} then {}", w[0], w[1]);
        }
        let last = tour.best_per_generation[tour.best_per_generation.len() - 1];
        assert_eq!(last, tour.cost);
    }

    #[test]
    fn test_convex_points_reach_hull_tour() {
        // 2-opt leaves no crossing edges, which on a regular octagon is the perimeter
        let points: Vec<Point> = (0..8)
            .map(|index| {
                let angle = index as f64 * std::f64::consts::PI / 4.0;
                Point {
                    index,
                    x: angle.cos(),
                    y: angle.sin(),
                }
            })
            .collect();
        let m = DistanceMatrix::from_points(&points);
        let tour = evolve(&m, &small_run(4)).unwrap();
        let perimeter = 16.0 * (std::f64::consts::PI / 8.0).sin();
        assert!((tour.cost - perimeter).abs() < 1e-9, "cost {}", tour.cost);
    }

    #[test]
    fn test_tiny_instances() {
        let three = scattered(3, 9);
        let tour = evolve(&three, &small_run(0)).unwrap();
        assert_eq!(tour.route.len(), 3);

        let one = scattered(1, 9);
        let tour = evolve(&one, &small_run(0)).unwrap();
        assert_eq!(tour.route, vec![0]);
        assert_eq!(tour.cost, 0.0);
    }

    #[test]
    fn test_initial_population_is_unique_and_capped() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let population = initial_population(&mut rng, 3, 50);
        assert_eq!(population.len(), 6);
        let distinct: HashSet<_> = population.iter().collect();
        assert_eq!(distinct.len(), 6);
    }

    #[test]
    fn test_crossover_yields_permutations() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let first = vec![0, 1, 2, 3, 4, 5, 6];
        let second = vec![6, 4, 2, 0, 5, 3, 1];
        for _ in 0..20 {
            let (a, b) = crossover(&mut rng, &first, &second);
            assert_eq!(a[0], 0);
            assert_eq!(b[0], 6);
            for child in [a, b] {
                let mut sorted = child.clone();
                sorted.sort();
                assert_eq!(sorted, first);
            }
        }
    }

    #[test]
    fn test_fitness_and_rank_selection() {
        let probabilities = fitness_probabilities(&[10.0, 30.0, 20.0]);
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(probabilities[1], 0.0);
        assert_eq!(by_fitness(&probabilities), vec![0, 2, 1]);
        assert_eq!(fitness_probabilities(&[5.0, 5.0]), vec![0.5, 0.5]);

        // ranks 3, 1, 2 out of 6
        let cumulative = rank_cumulative(&[0, 2, 1]);
        assert!((cumulative[0] - 0.5).abs() < 1e-12);
        assert!((cumulative[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mutation_rate_decays() {
        assert_eq!(mutation_rate(0, 100), 0.5);
        assert_eq!(mutation_rate(50, 100), 0.25);
        assert!(mutation_rate(99, 100) > 0.0);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let m = scattered(5, 0);
        let bad = GeneticSettings {
            elite_size: 30,
            ..small_run(0)
        };
        assert!(matches!(evolve(&m, &bad), Err(ModelError::InvalidInput(_))));
        let bad = GeneticSettings {
            crossover_rate: 1.5,
            ..small_run(0)
        };
        assert!(bad.validate().is_err());
    }
}
