use assert_cmd::Command;
use seqorder_test_data::TestFile;

const TINY: [&str; 8] = [
    "--n-lstm-hidden",
    "8",
    "--n-node-embed",
    "8",
    "--n-seq-embed",
    "4",
    "--num-workers",
    "2",
];

#[test]
fn test_cli_run_train_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("model.safetensors");
    let log = dir.path().join("log.json");
    let scores = dir.path().join("scores");

    let mut cmd = Command::cargo_bin("seqorder").unwrap();
    cmd.arg("run")
        .args(["--n-train", "4", "--n-val", "2", "--n-epoch", "2"])
        .args(TINY)
        .arg("--save")
        .arg(&model)
        .arg("--log")
        .arg(&log)
        .arg("--save-val")
        .arg(&scores);
    cmd.assert().success();

    assert!(model.exists());
    assert!(scores.join("000000.npy").exists());
    assert!(scores.join("000001.npy").exists());
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&log).unwrap()).unwrap();
    assert!(doc["train"].is_array());
    assert_eq!(doc["val"].as_array().unwrap().len(), 2);
    assert!(doc["val_seen"].is_array());
    assert_eq!(doc["params"]["n_train"], 4);
    assert_eq!(doc["params"]["seed"], 2020);

    // same architecture: reload and evaluate only
    let mut cmd = Command::cargo_bin("seqorder").unwrap();
    cmd.arg("run")
        .args(["--n-val", "2", "--skip-training", "--reverse-seq"])
        .args(TINY)
        .arg("--model")
        .arg(&model);
    cmd.assert().success();

    // different architecture: fails at load time
    let mut cmd = Command::cargo_bin("seqorder").unwrap();
    cmd.arg("run")
        .args(["--n-val", "2", "--skip-training"])
        .args(["--n-lstm-hidden", "16", "--n-node-embed", "8", "--n-seq-embed", "4"])
        .arg("--model")
        .arg(&model);
    cmd.assert().failure();
}

#[test]
fn test_cli_run_on_corpus_with_cache() {
    let (corpus, _temp) = TestFile::corpus_standard().create_temp().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("seqorder").unwrap();
    cmd.arg("-v")
        .arg("run")
        .args(["--n-train", "0", "--n-val", "0"])
        .args(TINY)
        .arg("--corpus")
        .arg(&corpus)
        .arg("--corpus-val")
        .arg(&corpus)
        .arg("--cache-dir")
        .arg(dir.path());
    cmd.assert().success();
    assert!(dir
        .path()
        .join("gcn_lstm_10_4_8_0_2020.safetensors")
        .exists());
}

#[test]
fn test_cli_on_the_fly() {
    let mut cmd = Command::cargo_bin("seqorder").unwrap();
    cmd.arg("run")
        .args(["--n-train", "3", "--n-val", "1", "--on-the-fly"])
        .args(TINY);
    cmd.assert().success();
}

#[test]
fn test_cli_cache() {
    let (corpus, _temp) = TestFile::corpus_plain().create_temp().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("seqorder").unwrap();
    cmd.arg("cache")
        .args(["-n", "3", "--seed", "7"])
        .arg("--corpus")
        .arg(&corpus)
        .arg("--cache-dir")
        .arg(dir.path());
    cmd.assert().success();
    assert!(dir.path().join("gcn_lstm_10_4_8_3_7.safetensors").exists());
}

#[test]
fn test_cli_rejects_unknown_corpus_format() {
    let mut cmd = Command::cargo_bin("seqorder").unwrap();
    cmd.arg("run")
        .args(["--n-val", "1", "--corpus-val", "missing.h5"])
        .args(TINY);
    cmd.assert().failure();
}
