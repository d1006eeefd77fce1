//! Integration tests for the `segmask mask` command.

mod common;

use common::Sandbox;
use predicates::prelude::*;
use serde_json::Value;

fn two_cases(sandbox: &Sandbox) {
    sandbox.touch("data/sub01/sub01_t1.nii.gz");
    sandbox.touch("data/sub01/sub01_flair.nii.gz");
    sandbox.touch("data/sub02/sub02_t1.nii.gz");
}

#[test]
fn test_mask_two_cases_json() {
    let sandbox = Sandbox::new();
    two_cases(&sandbox);

    let assert = sandbox
        .command()
        .args(["mask", "-m", "t1-flair", "-i", "data", "--json"])
        .assert()
        .success();

    let report: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let records = report["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["case"]["id"], "sub01");
    assert_eq!(records[0]["outcome"]["status"], "succeeded");
    assert_eq!(records[1]["outcome"]["status"], "skipped");
    assert_eq!(records[1]["outcome"]["reason"]["kind"], "missing_inputs");
    assert_eq!(records[1]["outcome"]["reason"]["missing"][0], "flair");

    assert!(sandbox.root().join("data/sub01/sub01_brain_mask.nii.gz").is_file());
    assert!(!sandbox.root().join("data/sub02/sub02_brain_mask.nii.gz").exists());
}

#[test]
fn test_mask_rerun_skips_existing_output() {
    let sandbox = Sandbox::new();
    two_cases(&sandbox);

    sandbox.command().args(["mask", "-m", "t1-flair", "-i", "data"]).assert().success();
    sandbox
        .command()
        .args(["mask", "-m", "t1-flair", "-i", "data"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mask exists"))
        .stdout(predicate::str::contains("Produced: 0"));
}

#[test]
fn test_mask_channel_overrides_and_output_dir() {
    let sandbox = Sandbox::new();
    sandbox.touch("case/case_T1w.nii.gz");
    sandbox.touch("case/case_FLAIR.nii.gz");
    std::fs::create_dir_all(sandbox.root().join("out")).unwrap();

    sandbox
        .command()
        .args(["mask", "-m", "t1-flair", "-n", "T1w", "FLAIR", "-i", "case", "-o", "out", "-s", "mask.nii.gz"])
        .assert()
        .success()
        .stderr(predicate::str::contains("t1 --> T1w"));

    assert!(sandbox.root().join("out/case_mask.nii.gz").is_file());
}

#[test]
fn test_mask_failing_inference_still_exits_zero() {
    let sandbox = Sandbox::new();
    sandbox.write_config("echo 'CUDA out of memory' >&2\nexit 1\n");
    sandbox.touch("data/sub01/sub01_t1.nii.gz");
    sandbox.touch("data/sub01/sub01_flair.nii.gz");

    sandbox
        .command()
        .args(["mask", "-m", "t1-flair", "-i", "data"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed: 1"))
        .stderr(predicate::str::contains("Mask generation failed for the following directories"));
}

#[test]
fn test_mask_unknown_model() {
    let sandbox = Sandbox::new();
    two_cases(&sandbox);

    sandbox
        .command()
        .args(["mask", "-m", "t2-only", "-i", "data"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid model name: t2-only"));
}

#[test]
fn test_mask_missing_input_dir() {
    let sandbox = Sandbox::new();

    sandbox
        .command()
        .args(["mask", "-m", "t1-flair", "-i", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("input directory does not exist"));
}

#[test]
fn test_mask_rejects_bad_threshold() {
    let sandbox = Sandbox::new();
    two_cases(&sandbox);

    sandbox.command().args(["mask", "-m", "t1-flair", "-i", "data", "-t", "high"]).assert().failure();
    sandbox
        .command()
        .args(["mask", "-m", "t1-flair", "-i", "data", "-t", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid probability threshold"));
}
