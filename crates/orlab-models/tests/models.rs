use orlab_models::coordinates;
use orlab_models::game::VALUE_TOLERANCE;
use orlab_models::{
    DietModel, Outcome, PayoffMatrix, PortfolioModel, ProductionModel, TransportProblem, UnbalancedStrategy,
};
use orlab_solver::Solver;

const FLOW_TOL: f64 = 1e-5;

#[test]
fn test_balanced_transport_ships_everything() {
    let problem = TransportProblem::default();
    let plan = problem.solve(&Solver::new(), UnbalancedStrategy::default()).unwrap();

    for (i, s) in problem.supply.iter().enumerate() {
        assert!((plan.shipped_from(i) - s).abs() < FLOW_TOL, "source {}", i);
    }
    for (j, d) in problem.demand.iter().enumerate() {
        assert!((plan.received_by(j) - d).abs() < FLOW_TOL, "destination {}", j);
    }
    assert!((plan.total_shipped() - 300.0).abs() < FLOW_TOL);

    let cost: f64 = problem
        .costs
        .iter()
        .flatten()
        .zip(plan.flows.iter().flatten())
        .map(|(c, x)| c * x)
        .sum();
    assert!((cost - plan.total_cost).abs() < 1e-4);
}

#[test]
fn test_unbalanced_strategies_agree() {
    let problem = TransportProblem::unbalanced_example();
    let solver = Solver::new();
    let inequality = problem.solve(&solver, UnbalancedStrategy::Inequality).unwrap();
    let dummy = problem.solve(&solver, UnbalancedStrategy::DummyNode).unwrap();

    assert!((inequality.total_cost - dummy.total_cost).abs() < 1e-4);
    for plan in [&inequality, &dummy] {
        assert_eq!(plan.flows.len(), 10);
        assert!(plan.flows.iter().all(|row| row.len() == 3));
        for (i, s) in problem.supply.iter().enumerate() {
            assert!(plan.shipped_from(i) <= s + FLOW_TOL);
        }
        for (j, d) in problem.demand.iter().enumerate() {
            assert!(plan.received_by(j) >= d - FLOW_TOL);
        }
        let unused: f64 = plan.unused_supply.iter().sum();
        assert!((unused - 50.0).abs() < 1e-4, "unused {}", unused);
    }
}

#[test]
fn test_mixed_game_lies_between_pure_values() {
    let game = PayoffMatrix::default();
    let equilibrium = game.solve_mixed(&Solver::new()).unwrap();
    let pure = game.pure_strategies().unwrap();

    equilibrium.check_consistency(VALUE_TOLERANCE).unwrap();
    for strategy in [&equilibrium.row_strategy, &equilibrium.column_strategy] {
        assert!((strategy.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(strategy.iter().all(|p| *p >= 0.0));
    }
    let value = equilibrium.game_value();
    assert!(pure.row_value <= value + 1e-6);
    assert!(value <= pure.column_value + 1e-6);
}

#[test]
fn test_pure_game_has_saddle_point() {
    let pure = PayoffMatrix::pure_example().pure_strategies().unwrap();
    assert_eq!((pure.row_index, pure.row_value), (3, 1.0));
    assert_eq!((pure.column_index, pure.column_value), (1, 1.0));
    assert!(pure.has_saddle_point());

    let mixed = PayoffMatrix::pure_example().solve_mixed(&Solver::new()).unwrap();
    assert!((mixed.game_value() - 1.0).abs() < 1e-6);
}

#[test]
fn test_production_and_diet_outcomes() {
    let solver = Solver::new();

    let production = Outcome::from(ProductionModel::default().solve(&solver));
    let plan = production.solved().unwrap();
    assert!((plan.total_profit - 4364.615384615).abs() < 1e-3);
    assert!(plan.quantities[0].1 >= 10.0 - 1e-6 && plan.quantities[1].1 >= 10.0 - 1e-6);

    let diet = Outcome::from(DietModel::default().solve(&solver));
    assert!((diet.solved().unwrap().total_cost - 2.727574750830).abs() < 1e-5);
}

#[test]
fn test_failed_outcome_is_reported() {
    let mut model = ProductionModel::default();
    model.floors[0].minimum = 1000.0;
    let outcome = Outcome::from(model.solve(&Solver::new()));
    assert!(!outcome.is_solved());
    assert!(outcome.to_string().contains("FAILED"));
}

#[test]
fn test_portfolio_respects_risk_ceiling() {
    let model = PortfolioModel::default();
    let report = model.solve(&Solver::new()).unwrap();
    assert!(report.variance <= model.risk_limit + 1e-6);
    assert!((report.weights.iter().map(|(_, w)| w).sum::<f64>() - 1.0).abs() < 1e-6);
    assert!(report.sharpe_ratio.is_some());
}

#[test]
fn test_coordinates_to_tour() {
    let source = "NAME: square\nTYPE: TSP\nDIMENSION: 4\nNODE_COORD_SECTION\n1 0 0\n2 3 4\n3 3 0\n4 0 4\nEOF\n";
    let instance = coordinates::parse(source).unwrap();
    let matrix = instance.distance_matrix();
    assert_eq!(matrix.size(), 4);
    assert_eq!(matrix.get(0, 1), 5.0);

    let mut route = vec![0, 1, 2, 3];
    assert_eq!(matrix.tour_cost(&route).unwrap(), 18.0);
    let improved = matrix.two_opt(&mut route).unwrap();
    assert!((improved - 14.0).abs() < 1e-9);
}

#[test]
fn test_resolving_is_idempotent() {
    let solver = Solver::new();
    let same = |a: f64, b: f64| (a - b).abs() < 1e-9;

    let production = ProductionModel::default();
    let first = production.solve(&solver).unwrap();
    let second = production.solve(&solver).unwrap();
    assert!(same(first.total_profit, second.total_profit));

    let diet = DietModel::default();
    let first = diet.solve(&solver).unwrap();
    let second = diet.solve(&solver).unwrap();
    assert!(same(first.total_cost, second.total_cost));

    let transport = TransportProblem::default();
    let first = transport.solve(&solver, UnbalancedStrategy::default()).unwrap();
    let second = transport.solve(&solver, UnbalancedStrategy::default()).unwrap();
    assert!(same(first.total_cost, second.total_cost));

    let game = PayoffMatrix::default();
    let first = game.solve_mixed(&solver).unwrap();
    let second = game.solve_mixed(&solver).unwrap();
    assert!(same(first.row_value, second.row_value));
    assert_eq!(first.row_strategy, second.row_strategy);

    let portfolio = PortfolioModel::default();
    let first = portfolio.solve(&solver).unwrap();
    let second = portfolio.solve(&solver).unwrap();
    assert!(same(first.objective, second.objective));
}
