use nanosat_launcher::cost::CostEstimator;
use nanosat_launcher::dataset::{historical_dataset, historical_vehicles};
use nanosat_launcher::sizing::{MissionRequirement, StageSizer};
use nanosat_launcher::vehicle::reference_nanosat_launcher;
use nanosat_launcher::{logging, AnalysisConfig, AnalysisError};

/// Launches per year the dedicated launcher is expected to fly
const LAUNCH_RATE: f64 = 6.0;

fn main() -> Result<(), AnalysisError> {
    logging::init();

    // Optional path to a JSON config as the only argument
    let config = match std::env::args().nth(1) {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    println!("=== Reference Nanosat Launcher ===\n");
    let vehicle = reference_nanosat_launcher();
    for row in vehicle.performance() {
        println!("Stage {}:", row.stage);
        println!("\tTotal mass = {:.1} kg", row.total_mass_kg);
        println!("\tProp  mass = {:.1} kg", row.propellant_mass_kg);
        println!("\tPropellant mass fraction = {:.2}", row.propellant_fraction);
        println!("\tLength x diameter = {:.1} x {:.1} m", row.tank_length_m, row.diameter_m);
        println!("\tI_sp = {:.0} s", row.specific_impulse_s);
        println!("\tDelta-v = {:.0} m/s", row.delta_v_ms);
    }
    println!("\nTotal delta-v = {:.0} m/s", vehicle.total_delta_v());
    println!("Total mass on pad = {:.0} kg", vehicle.pad_mass_kg());

    println!("\n=== Sized From Stage Parameters ({}) ===\n", config.sizer.allocation.name());
    let requirement = MissionRequirement::new(vehicle.total_delta_v(), vehicle.payload_mass_kg);
    let sized = StageSizer::new(config.sizer.clone()).size(&requirement, &vehicle.stage_specs())?;
    for stage in &sized.stages {
        println!(
            "Stage {}: {:.0} m/s, {:.1} kg ({:.1} kg propellant)",
            stage.index + 1,
            stage.delta_v_ms,
            stage.stage_mass_kg(),
            stage.propellant_mass_kg
        );
    }
    println!("Liftoff mass = {:.0} kg", sized.liftoff_mass_kg);

    println!("\n=== Cost Regression ({}) ===\n", config.estimator.form.name());
    let model = CostEstimator::new(config.estimator.clone()).fit(&historical_dataset())?;
    let vehicles = historical_vehicles();
    for (i, record) in vehicles.iter().enumerate() {
        let mark = if model.is_inlier(i) { "inlier " } else { "outlier" };
        println!(
            "  [{}] {:<12} {:>7.1} USD/kg at {:>5.2}/yr",
            mark,
            record.name,
            record.cost_per_mass(),
            record.production_rate
        );
    }
    println!(
        "\nTrend: y = {:.2} + {:.2} x  ({} of {} points)",
        model.intercept,
        model.slope,
        model.inlier_count(),
        model.dataset_len
    );

    let estimate = model.predict(LAUNCH_RATE)?;
    let unit = estimate.for_vehicle(sized.liftoff_mass_kg, sized.payload_mass_kg);
    println!(
        "\nPredicted cost for a {:.0} kg launch vehicle, with {:.1} launches per year:",
        unit.liftoff_mass_kg, LAUNCH_RATE
    );
    println!(
        " = {:.1} kUSD (band {:.1} - {:.1} kUSD)",
        unit.unit_cost_usd / 1e3,
        unit.unit_cost_low_usd / 1e3,
        unit.unit_cost_high_usd / 1e3
    );
    println!(" = {:.0} USD per payload kg", unit.cost_per_payload_kg());
    if let Some(warning) = unit.extrapolation {
        println!(" ! {}", warning);
    }
    Ok(())
}
