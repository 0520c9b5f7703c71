use serde_json::{json, Value};

use crate::config::{CoreConfig, DigestAlgorithm};
use crate::engine::{ExecutionContext, ExecutionCore};
use crate::types::Payload;

fn add(p: &Payload) -> Result<Value, String> {
    let x = p.get("x").and_then(Value::as_i64).ok_or("missing x")?;
    let y = p.get("y").and_then(Value::as_i64).ok_or("missing y")?;
    Ok(json!(x + y))
}

fn params(pairs: &[(&str, Value)]) -> Payload {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn test_independent_engines_agree() {
    let mut a = ExecutionCore::new(CoreConfig::default());
    let mut b = ExecutionCore::new(CoreConfig::default());

    let ctx = ExecutionContext::new("add", params(&[("x", json!(10)), ("y", json!(20))]));
    let ra = a.execute(&ctx, add, true).into_result().unwrap();
    let rb = b.execute(&ctx, add, true).into_result().unwrap();

    assert_eq!(ra.output, json!(30));
    assert_eq!(ra.output_hash, rb.output_hash);
}

#[test]
fn test_parameter_order_is_irrelevant() {
    let mut a = ExecutionCore::new(CoreConfig::default());
    let mut b = ExecutionCore::new(CoreConfig::default());

    let forward = params(&[("x", json!(1)), ("y", json!(2))]);
    let reverse = params(&[("y", json!(2)), ("x", json!(1))]);

    let echo = |p: &Payload| -> Result<Value, String> { Ok(Value::Object(p.clone())) };
    let ra = a.execute(&ExecutionContext::new("echo", forward), echo, false);
    let rb = b.execute(&ExecutionContext::new("echo", reverse), echo, false);

    assert_eq!(
        ra.into_result().unwrap().output_hash,
        rb.into_result().unwrap().output_hash
    );
}

#[test]
fn test_history_does_not_change_fingerprint() {
    let mut fresh = ExecutionCore::new(CoreConfig::default());
    let mut busy = ExecutionCore::new(CoreConfig::default());
    for i in 0..5 {
        let ctx = ExecutionContext::new(format!("warmup-{}", i), params(&[("x", json!(i)), ("y", json!(i))]));
        let _ = busy.execute(&ctx, add, true);
    }

    let ctx = ExecutionContext::new("add", params(&[("x", json!(3)), ("y", json!(4))]));
    let r1 = fresh.execute(&ctx, add, true).into_result().unwrap();
    let r2 = busy.execute(&ctx, add, true).into_result().unwrap();

    assert_eq!(r1.output_hash, r2.output_hash);
    // The chains themselves differ; only the fingerprint is history-free.
    assert_ne!(fresh.chain().get_root_hash(), busy.chain().get_root_hash());
}

#[test]
fn test_digest_choice_changes_fingerprint() {
    let mut sha = ExecutionCore::new(CoreConfig::default());
    let mut blake = ExecutionCore::new(CoreConfig::default().with_digest(DigestAlgorithm::Blake3));

    let ctx = ExecutionContext::new("add", params(&[("x", json!(1)), ("y", json!(1))]));
    let rs = sha.execute(&ctx, add, false).into_result().unwrap();
    let rb = blake.execute(&ctx, add, false).into_result().unwrap();

    assert_eq!(rs.output, rb.output);
    assert_ne!(rs.output_hash, rb.output_hash);
    assert!(blake.verify_execution("add", &rb.output_hash));
}
