// ==========================================
// 导出层集成测试
// ==========================================


use blast_design_engine::engine::{ChargeCalculator, InitiationNetwork, Sequencer};
use blast_design_engine::exporter::{
    charges_to_csv, schedule_to_csv, to_json_pretty, write_schedule_csv,
};
use blast_design_engine::FiringSchedule;
use tempfile::tempdir;
use test_helpers::*;

fn abc_schedule() -> FiringSchedule {
    let mut plan = abc_plan();
    plan.detonators = uniform_detonators(&abc_points(), 400);
    let network = InitiationNetwork::from_plan(test_scope(), &abc_points(), &plan).unwrap();
    Sequencer::compute_schedule(&network, &plan.initiation_points).unwrap()
}

#[test]
fn test_schedule_csv_rows() {
    let csv = schedule_to_csv(&abc_schedule()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "1,A,0,400,400,,,");
    assert_eq!(lines[2], "2,B,25,400,425,A,25,0");
    assert_eq!(lines[3], "3,C,75,400,475,B,50,0");
}

#[test]
fn test_charges_csv_keeps_full_precision() {
    let result = ChargeCalculator::default()
        .compute(&abc_points(), &test_material(), &test_pattern())
        .unwrap();
    let csv = charges_to_csv(&result).unwrap();

    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let headers = reader.headers().unwrap().clone();
    let anfo_col = headers.iter().position(|h| h == "anfo_kg").unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[3][0], "TOTAL");
    let parsed: f64 = rows[0][anfo_col].parse().unwrap();
    assert_eq!(parsed, result.holes[0].anfo_kg);
    let total: f64 = rows[3][anfo_col].parse().unwrap();
    assert_eq!(total, result.total_anfo);
}

#[test]
fn test_json_report_carries_identity() {
    let result = ChargeCalculator::default()
        .compute(&abc_points(), &test_material(), &test_pattern())
        .unwrap();
    let json = to_json_pretty(&result).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["calculation_id"], result.calculation_id.to_string());
    assert_eq!(value["point_ids"], serde_json::json!(["A", "B", "C"]));
    assert_eq!(value["powder_factor_basis"], "VOLUME");
}

#[test]
fn test_write_schedule_csv_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("schedule.csv");
    write_schedule_csv(&abc_schedule(), &path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("rank,hole_id,fire_time_ms"));
}
