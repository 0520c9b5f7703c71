use qradle_cli::commands::{inspect, proof, run, timeline, verify};
use qradle_kernel::storage::FileSink;
use qradle_kernel::{CoreConfig, DigestAlgorithm};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_contract(path: &Path, id: &str, parameters: serde_json::Value) {
    let contract = json!({
        "contract_id": id,
        "contract_type": "sum",
        "parameters": parameters,
        "safety_level": "ROUTINE",
    });
    fs::write(path, serde_json::to_string(&contract).unwrap()).unwrap();
}

#[test]
fn test_integration_workflow() {
    let dir = tempdir().unwrap();
    let contract = dir.path().join("contract.json");
    let log = dir.path().join("qradle.log");
    let config = CoreConfig::default();

    write_contract(&contract, "c-1", json!({"x": 10, "y": 20}));
    run::run(&contract, &log, &config, true).unwrap();

    write_contract(&contract, "c-2", json!({"x": 1.5, "y": 2}));
    run::run(&contract, &log, &config, false).unwrap();

    let entries = FileSink::read_entries(&log).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[3].contract_id(), Some("c-2"));

    assert!(inspect::run(&log, &config).is_ok());
    assert!(verify::run(&log, &config).is_ok());
    assert!(timeline::run(&log, &config).is_ok());
    assert!(proof::run(&log, &config, 1, false).is_ok());
    assert!(proof::run(&log, &config, 1, true).is_ok());
    assert!(proof::run(&log, &config, 4, false).is_err());
}

#[test]
fn test_failed_operation_is_logged() {
    let dir = tempdir().unwrap();
    let contract = dir.path().join("contract.json");
    let log = dir.path().join("qradle.log");
    let config = CoreConfig::default();

    write_contract(&contract, "bad", json!({"x": "ten"}));
    // A recovered failure is still a successful run of the tool.
    run::run(&contract, &log, &config, true).unwrap();

    let entries = FileSink::read_entries(&log).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].event_type(), Some("execution_failed"));
    assert!(verify::run(&log, &config).is_ok());
}

#[test]
fn test_rejected_contract_writes_nothing() {
    let dir = tempdir().unwrap();
    let contract = dir.path().join("contract.json");
    let log = dir.path().join("qradle.log");

    fs::write(
        &contract,
        json!({
            "contract_id": "risky",
            "contract_type": "sum",
            "parameters": {"x": 1},
            "safety_level": "CRITICAL",
        })
        .to_string(),
    )
    .unwrap();

    assert!(run::run(&contract, &log, &CoreConfig::default(), true).is_err());
    assert!(FileSink::read_entries(&log).unwrap().is_empty());
}

#[test]
fn test_verify_rejects_wrong_digest() {
    let dir = tempdir().unwrap();
    let contract = dir.path().join("contract.json");
    let log = dir.path().join("qradle.log");

    write_contract(&contract, "c-1", json!({"x": 1}));
    run::run(&contract, &log, &CoreConfig::default(), true).unwrap();

    let blake = CoreConfig::default().with_digest(DigestAlgorithm::Blake3);
    assert!(verify::run(&log, &blake).is_err());
    assert!(timeline::run(&log, &blake).is_err());
}

#[test]
fn test_unsupported_contract_type() {
    let dir = tempdir().unwrap();
    let contract = dir.path().join("contract.json");
    fs::write(
        &contract,
        json!({"contract_id": "c", "contract_type": "multiply", "parameters": {}}).to_string(),
    )
    .unwrap();

    let result = run::run(&contract, &dir.path().join("qradle.log"), &CoreConfig::default(), true);
    assert!(result.is_err());
}

#[test]
fn test_sum_operation() {
    let mut p = qradle_kernel::Payload::new();
    p.insert("a".into(), json!(2));
    p.insert("b".into(), json!(3));
    assert_eq!(run::sum(&p).unwrap(), json!(5));

    p.insert("c".into(), json!(0.5));
    assert_eq!(run::sum(&p).unwrap(), json!(5.5));

    p.insert("d".into(), json!("x"));
    assert!(run::sum(&p).is_err());
}
