mod common;

use citybuilder::{Engine, EngineSettings, ScenarioLoader, ScenarioReport};

#[test]
fn riverside_scenario_builds_a_working_street() {
    let catalog = common::catalog();
    let scenario = ScenarioLoader::new(common::fixtures())
        .load("scenarios/riverside.yaml")
        .unwrap();
    let mut engine = Engine::new(scenario.settings(EngineSettings::default()));
    let report = scenario.run(&mut engine, &catalog).unwrap();

    assert_eq!(
        report,
        ScenarioReport {
            placed: 18,
            rejected: 1,
            removed: 1,
            days_elapsed: 9,
        }
    );
    assert_eq!(engine.map().width(), 30);
    assert_eq!(engine.population(), 4 + 4 + 16);
    assert!(engine.happiness() > 0.0);
    assert_eq!(engine.date().to_string(), "2000.06.06");

    let home = engine
        .map()
        .instance_at(citybuilder::TilePos::new(3, 3))
        .unwrap();
    let state = home.building().unwrap();
    assert_eq!(state.water_received, 6);
    assert!(state.electricity_provided);
}

#[test]
fn missing_scenario_file_reports_path() {
    let err = ScenarioLoader::new(common::fixtures())
        .load("scenarios/nowhere.yaml")
        .unwrap_err();
    assert!(format!("{err:#}").contains("nowhere.yaml"));
}
