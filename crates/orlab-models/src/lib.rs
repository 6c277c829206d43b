pub mod coordinates;
pub mod diet;
pub mod distance;
pub mod error;
pub mod game;
pub mod genetic;
pub mod portfolio;
pub mod production;
pub mod report;
pub mod transport;

pub use coordinates::{InstanceData, ParseError, Point, TspInstance};
pub use diet::{DietModel, DietPlan, Food, NutrientLevel, NutrientRequirement};
pub use distance::DistanceMatrix;
pub use error::ModelError;
pub use game::{MixedEquilibrium, PayoffMatrix, PureStrategies};
pub use genetic::{GeneticSettings, GeneticTour};
pub use portfolio::{PortfolioModel, PortfolioReport, WeightFloor};
pub use production::{DemandFloor, ProductionModel, ProductionPlan, Product, ResourceLimit, ResourceUsage};
pub use report::Outcome;
pub use transport::{Balance, TransportFormulation, TransportPlan, TransportProblem, UnbalancedStrategy};
