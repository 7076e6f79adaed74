use std::fs;

use sirvd::prelude::*;
use sirvd::report::write_tick_report;
use tempfile::tempdir;

fn compartmental_result() -> SimulationResult {
    SimulationConfig::from_json_str(include_str!("data/compartmental.json"))
        .unwrap()
        .build()
        .unwrap()
        .run()
        .unwrap()
}

#[test]
fn saved_result_loads_back_unchanged() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("runs").join("compartmental.json");
    let result = compartmental_result();
    result.save(&path).unwrap();

    let loaded = SimulationResult::load(&path).unwrap();
    assert_eq!(loaded, result);
    assert_eq!(loaded.ticks(), 100);
    assert_eq!(loaded.parameters.len(), 100);
}

#[test]
fn saved_document_has_the_three_groups() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("result.json");
    compartmental_result().save(&path).unwrap();

    let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    for key in ["Time", "S", "I", "R", "V", "D", "I_new"] {
        assert_eq!(document["observables"][key].as_array().unwrap().len(), 101);
    }
    for key in [
        "reproduction_rate",
        "infected_peak_time",
        "infected_peak",
        "epidemic_duration",
        "case_fatality_rate",
    ] {
        assert!(!document["additional_data"][key].is_null(), "missing {key}");
    }
    assert_eq!(document["parameters"]["infection_rate"].as_array().unwrap().len(), 100);
}

#[test]
fn network_result_round_trips_through_a_string() {
    let result = SimulationConfig::from_json_str(include_str!("data/dynamic_network.json"))
        .unwrap()
        .build()
        .unwrap()
        .run()
        .unwrap();
    let json = result.to_json_string().unwrap();
    assert_eq!(SimulationResult::from_json_str(&json).unwrap(), result);
}

#[test]
fn tick_report_has_one_row_per_recorded_tick() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("ticks.csv");
    let result = compartmental_result();
    write_tick_report(&path, &result).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(reader.records().count(), result.observables.len());
}
