use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use env_logger::Builder;
use log::{warn, LevelFilter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use orlab_models::game::VALUE_TOLERANCE;
use orlab_models::{
    coordinates, genetic, DietModel, GeneticSettings, ModelError, Outcome, PayoffMatrix, PortfolioModel, ProductionModel,
    TransportProblem, UnbalancedStrategy,
};
use orlab_solver::{Settings, Solver};

#[derive(Parser)]
#[command(name = "orlab")]
#[command(about = "Operations research coursework models", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Interior-point iteration limit
    #[arg(long, default_value_t = 200, global = true)]
    max_iterations: u32,

    /// Duality gap and feasibility tolerance
    #[arg(long, default_value_t = 1e-8, global = true)]
    tolerance: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ModelArgs {
    /// JSON file replacing the built-in dataset
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Maximize production profit under resource limits
    Production {
        #[command(flatten)]
        args: ModelArgs,
    },
    /// Find the cheapest diet meeting nutrient minimums
    Diet {
        #[command(flatten)]
        args: ModelArgs,
    },
    /// Ship supply to demand at minimum cost
    Transport {
        /// Use the unbalanced 10×3 dataset
        #[arg(long)]
        unbalanced: bool,
        /// How an unbalanced instance is formulated
        #[arg(long, value_enum, default_value = "inequality")]
        strategy: Strategy,
        #[command(flatten)]
        args: ModelArgs,
    },
    /// Solve a two-player zero-sum game
    Game {
        #[arg(value_enum)]
        mode: GameMode,
        #[command(flatten)]
        args: ModelArgs,
    },
    /// Mean-variance portfolio with a risk ceiling
    Portfolio {
        #[command(flatten)]
        args: ModelArgs,
    },
    /// Print the Euclidean distance matrix of a TSPLIB file
    Distance {
        /// The coordinate file
        #[arg(env = "ORLAB_TSP_FILE")]
        file: PathBuf,
        /// Also report the identity tour cost before and after 2-opt
        #[arg(long)]
        tour: bool,
        /// Search for a short tour with the genetic algorithm
        #[arg(long)]
        ga: bool,
        /// Random seed of the genetic search
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 2000)]
        generations: usize,
        #[arg(long, default_value_t = 200)]
        population: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Inequality,
    Dummy,
}

#[derive(Clone, Copy, ValueEnum)]
enum GameMode {
    Mixed,
    Pure,
}

impl From<Strategy> for UnbalancedStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Inequality => UnbalancedStrategy::Inequality,
            Strategy::Dummy => UnbalancedStrategy::DummyNode,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new().filter_level(level).parse_default_env().init();

    let solver = Solver::with_settings(Settings {
        max_iterations: cli.max_iterations,
        tolerance: cli.tolerance,
        verbose: cli.verbose > 2,
    });
    let solved = match cli.command {
        Commands::Production { args } => run(&args, ProductionModel::default, |m: ProductionModel| m.solve(&solver)),
        Commands::Diet { args } => run(&args, DietModel::default, |m: DietModel| m.solve(&solver)),
        Commands::Transport {
            unbalanced,
            strategy,
            args,
        } => {
            let dataset = if unbalanced {
                TransportProblem::unbalanced_example
            } else {
                TransportProblem::default
            };
            run(&args, dataset, |p: TransportProblem| p.solve(&solver, strategy.into()))
        }
        Commands::Game { mode, args } => match mode {
            GameMode::Mixed => run(&args, PayoffMatrix::default, |m: PayoffMatrix| {
                let equilibrium = m.solve_mixed(&solver)?;
                if let Err(e) = equilibrium.check_consistency(VALUE_TOLERANCE) {
                    warn!("{}", e);
                }
                Ok(equilibrium)
            }),
            GameMode::Pure => run(&args, PayoffMatrix::pure_example, |m: PayoffMatrix| m.pure_strategies()),
        },
        Commands::Portfolio { args } => run(&args, PortfolioModel::default, |m: PortfolioModel| m.solve(&solver)),
        Commands::Distance {
            file,
            tour,
            ga,
            seed,
            generations,
            population,
        } => {
            let genetic = ga.then(|| GeneticSettings {
                population_size: population,
                generations,
                seed,
                ..GeneticSettings::default()
            });
            distance(&file, tour, genetic.as_ref())
        }
    };

    if !solved {
        std::process::exit(1);
    }
}

/// Load the model (or its default), solve it, print the outcome. Returns
/// whether an optimum was reported.
fn run<M, R>(args: &ModelArgs, default: fn() -> M, solve: impl FnOnce(M) -> Result<R, ModelError>) -> bool
where
    M: DeserializeOwned,
    R: Display + Serialize,
{
    let model = match &args.input {
        Some(path) => match load(path) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("{}", e);
                return false;
            }
        },
        None => default(),
    };

    let outcome = Outcome::from(solve(model));
    if args.json {
        if let Outcome::Solved(result) = &outcome {
            match serde_json::to_string_pretty(result) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing result: {}", e);
                    return false;
                }
            }
            return true;
        }
    }
    match &outcome {
        Outcome::Solved(_) => print!("{}", outcome),
        Outcome::Failed(_) => eprint!("{}", outcome),
    }
    outcome.is_solved()
}

fn load<M: DeserializeOwned>(path: &Path) -> Result<M, String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("Error reading {}: {}", path.display(), e))?;
    serde_json::from_str(&source).map_err(|e| format!("Error parsing {}: {}", path.display(), e))
}

fn distance(file: &Path, tour: bool, genetic: Option<&GeneticSettings>) -> bool {
    let instance = match coordinates::read_file(file) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("{}", e);
            return false;
        }
    };
    let matrix = instance.distance_matrix();
    println!("{}", matrix.to_tsv(2));

    if tour {
        let mut route: Vec<usize> = (0..matrix.size()).collect();
        let result = matrix
            .tour_cost(&route)
            .and_then(|before| matrix.two_opt(&mut route).map(|after| (before, after)));
        match result {
            Ok((before, after)) => {
                println!();
                println!("Identity tour: {:.2}", before);
                println!("After 2-opt:   {:.2}", after);
                let order: Vec<String> = route.iter().map(|c| (c + 1).to_string()).collect();
                println!("Route: {}", order.join(" "));
            }
            Err(e) => {
                eprintln!("{}", e);
                return false;
            }
        }
    }

    if let Some(settings) = genetic {
        match genetic::evolve(&matrix, settings) {
            Ok(result) => {
                println!();
                let mut best = f64::INFINITY;
                for (generation, cost) in result.best_per_generation.iter().enumerate() {
                    if *cost < best {
                        println!("Generation {}: {:.2}", generation + 1, cost);
                        best = *cost;
                    }
                }
                println!("Genetic tour:  {:.2}", result.cost);
                let order: Vec<String> = result.route.iter().map(|c| (c + 1).to_string()).collect();
                println!("Route: {}", order.join(" "));
            }
            Err(e) => {
                eprintln!("{}", e);
                return false;
            }
        }
    }
    true
}
