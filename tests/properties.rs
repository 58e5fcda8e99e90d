use nanosat_launcher::cost::{CostEstimator, RegressionForm};
use nanosat_launcher::dataset::LaunchDataPoint;
use nanosat_launcher::sizing::{size, DeltaVAllocation, MissionRequirement, StageSizer};
use nanosat_launcher::{EstimatorConfig, StageSpec};
use proptest::prelude::*;

fn stage_strategy() -> impl Strategy<Value = StageSpec> {
    (200.0f64..450.0, 0.02f64..0.25, 0.0f64..3.0)
        .prop_map(|(isp, f, interface)| StageSpec::new(isp, f).with_interface_mass(interface))
}

fn design_strategy() -> impl Strategy<Value = Vec<StageSpec>> {
    prop::collection::vec(stage_strategy(), 1..=4)
}

fn dataset_strategy() -> impl Strategy<Value = Vec<LaunchDataPoint>> {
    prop::collection::vec((0.1f64..20.0, 10.0f64..2000.0), 2..=10).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(r, c)| LaunchDataPoint::new(r, c).unwrap())
            .collect()
    })
}

proptest! {
    #[test]
    fn achieved_delta_v_matches_target(
        stages in design_strategy(),
        delta_v in 500.0f64..9000.0,
        payload in 1.0f64..100.0,
    ) {
        let requirement = MissionRequirement::new(delta_v, payload);
        if let Ok(result) = size(&requirement, &stages) {
            let relative = (result.achieved_delta_v_ms - delta_v).abs() / delta_v;
            prop_assert!(relative < 1e-6, "relative error {}", relative);
            prop_assert!(result.meets_target());
        }
    }

    #[test]
    fn minimum_mass_meets_target(
        stages in design_strategy(),
        delta_v in 500.0f64..9000.0,
        payload in 1.0f64..100.0,
    ) {
        let requirement = MissionRequirement::new(delta_v, payload);
        let sizer = StageSizer::with_allocation(DeltaVAllocation::MinimumMass);
        if let Ok(result) = sizer.size(&requirement, &stages) {
            let relative = (result.achieved_delta_v_ms - delta_v).abs() / delta_v;
            prop_assert!(relative < 1e-6, "relative error {}", relative);
        }
    }

    #[test]
    fn heavier_structure_never_lightens_vehicle(
        stages in design_strategy(),
        pick in 0usize..4,
        bump in 0.0f64..0.1,
        delta_v in 500.0f64..8000.0,
    ) {
        let requirement = MissionRequirement::new(delta_v, 10.0);
        let base = size(&requirement, &stages);
        prop_assume!(base.is_ok());

        let mut heavier = stages.clone();
        let index = pick % heavier.len();
        heavier[index].structural_fraction += bump;
        // A heavier design may become infeasible; that is consistent too
        if let Ok(bumped) = size(&requirement, &heavier) {
            let base = base.unwrap();
            prop_assert!(
                bumped.liftoff_mass_kg >= base.liftoff_mass_kg * (1.0 - 1e-12),
                "{} < {}",
                bumped.liftoff_mass_kg,
                base.liftoff_mass_kg
            );
        }
    }

    #[test]
    fn more_delta_v_never_lightens_vehicle(
        stages in design_strategy(),
        delta_v in 500.0f64..8000.0,
        extra in 0.0f64..2000.0,
    ) {
        let low = size(&MissionRequirement::new(delta_v, 10.0), &stages);
        let high = size(&MissionRequirement::new(delta_v + extra, 10.0), &stages);
        if let (Ok(low), Ok(high)) = (low, high) {
            prop_assert!(high.liftoff_mass_kg >= low.liftoff_mass_kg * (1.0 - 1e-12));
        }
    }

    #[test]
    fn minimum_mass_never_heavier_than_uniform(
        stages in prop::collection::vec((200.0f64..450.0, 0.02f64..0.25), 1..=4),
        delta_v in 500.0f64..8000.0,
    ) {
        let stages: Vec<StageSpec> = stages.into_iter().map(|(isp, f)| StageSpec::new(isp, f)).collect();
        let requirement = MissionRequirement::new(delta_v, 10.0);
        let uniform = size(&requirement, &stages);
        prop_assume!(uniform.is_ok());
        let optimised = StageSizer::with_allocation(DeltaVAllocation::MinimumMass)
            .size(&requirement, &stages)
            .unwrap();
        let uniform = uniform.unwrap();
        prop_assert!(
            optimised.liftoff_mass_kg <= uniform.liftoff_mass_kg * (1.0 + 1e-9),
            "{} > {}",
            optimised.liftoff_mass_kg,
            uniform.liftoff_mass_kg
        );
    }

    #[test]
    fn inliers_reproduce_their_own_cost(data in dataset_strategy()) {
        for form in [RegressionForm::LinearInPeriod, RegressionForm::Linear, RegressionForm::LogLog] {
            let estimator = CostEstimator::new(EstimatorConfig::default().with_form(form));
            let Ok(model) = estimator.fit(&data) else {
                continue;
            };
            for &i in &model.inliers {
                let estimate = model.predict(data[i].production_rate()).unwrap();
                let residual = (form.response(estimate.cost_per_mass)
                    - form.response(data[i].cost_per_mass()))
                .abs();
                prop_assert!(
                    residual < model.residual_threshold,
                    "{:?} point {} residual {} over {}",
                    form,
                    i,
                    residual,
                    model.residual_threshold
                );
            }
        }
    }

    #[test]
    fn small_dataset_fit_is_deterministic(data in dataset_strategy()) {
        for form in [RegressionForm::LinearInPeriod, RegressionForm::Linear, RegressionForm::LogLog] {
            let estimator = CostEstimator::new(EstimatorConfig::default().with_form(form));
            let a = estimator.fit(&data);
            let b = estimator.fit(&data);
            prop_assert_eq!(&a, &b);
            if let Ok(model) = a {
                prop_assert!(model.exhaustive);
                prop_assert!(model.inliers.iter().all(|&i| i < data.len()));
                prop_assert!(model.inlier_count() >= 2);
            }
        }
    }
}

#[test]
fn results_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<nanosat_launcher::SizingResult>();
    assert_send_sync::<nanosat_launcher::CostModel>();
    assert_send_sync::<nanosat_launcher::CostEstimate>();
}
