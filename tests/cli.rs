mod common;

use assert_cmd::Command;
use clap::{CommandFactory, Parser};
use negotiator::negotiation::{add_data_generator_arguments, add_model_arguments, Arguments};
use serde_json::{json, Value};
use tempfile::tempdir;

use common::{example_json, schema, write_json};

fn negotiator(data: &std::path::Path, outputs: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("negotiator").expect("binary exists");
    cmd.env("NEGOTIATOR_DATA_DIR", data)
        .env("NEGOTIATOR_OUTPUTS_DIR", outputs)
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("negotiator").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn argument_definitions_are_consistent() {
    Arguments::command().debug_assert();
}

#[test]
fn argument_groups_register_on_a_shared_command() {
    let cmd = add_model_arguments(add_data_generator_arguments(clap::Command::new("train")));
    let names: Vec<&str> = cmd
        .get_arguments()
        .filter_map(|a| a.get_long())
        .collect();
    for flag in ["schema-path", "entity-encoding-form", "retrieve", "price-clip", "slot-scores"] {
        assert!(names.contains(&flag), "missing --{flag}");
    }
    for flag in ["model", "decoding", "attention-memory", "cnn-filter-sizes", "price-hist-len", "context-size", "ranker"] {
        assert!(names.contains(&flag), "missing --{flag}");
    }
}

#[test]
fn defaults_match_documented_values() {
    let args = Arguments::try_parse_from(["negotiator"]).unwrap();
    assert_eq!(args.run.batch_size, 16);
    assert_eq!(args.run.random_seed, 1);
    assert_eq!(args.model.basic.rnn_size, 20);
    assert_eq!(args.model.encdec.num_context, 0);
    assert_eq!(args.model.sequence_embedder.cnn_filter_sizes, vec![2, 3, 4]);
    assert_eq!(args.data.retriever.num_candidates, 20);
    assert_eq!(args.data.price_tracker.price_clip, 4.0);
    assert!(args.model.basic.model.is_none());
}

#[test]
fn check_rejects_inconsistent_flags() {
    let dir = tempdir().unwrap();
    negotiator(dir.path(), dir.path())
        .args(["check", "--num-context", "2", "--stateful"])
        .assert()
        .failure();
    negotiator(dir.path(), dir.path())
        .args(["check", "--model", "encdec"])
        .assert()
        .success();
}

#[test]
fn vocab_then_build_writes_outputs() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let outputs = dir.path().join("outputs");
    let schema_path = dir.path().join("schema.json");
    let train_path = dir.path().join("train.json");
    let cache = dir.path().join("cache");
    write_json(&schema_path, &serde_json::to_value(schema()).unwrap());
    write_json(&train_path, &json!([example_json("a"), example_json("b")]));

    let shared = [
        "--schema-path",
        schema_path.to_str().unwrap(),
        "--train-examples-paths",
        train_path.to_str().unwrap(),
        "--test-examples-paths",
        train_path.to_str().unwrap(),
        "--cache",
        cache.to_str().unwrap(),
    ];

    negotiator(&data, &outputs)
        .arg("vocab")
        .args(shared)
        .assert()
        .success();
    assert!(outputs.join("mappings.json").exists());

    negotiator(&data, &outputs)
        .arg("index")
        .args(shared)
        .assert()
        .success();
    assert!(data.join("index.json").exists());

    negotiator(&data, &outputs)
        .arg("build")
        .args(shared)
        .args(["--model", "encdec", "--predict-price", "--retrieve"])
        .assert()
        .success();

    let graph: Value =
        serde_json::from_str(&std::fs::read_to_string(outputs.join("model_graph.json")).unwrap())
            .unwrap();
    assert_eq!(graph["model"]["type"], "encdec");
    assert_eq!(graph["model"]["decoder"]["type"], "price");
    assert!(graph["num_parameters"].as_u64().unwrap() > 0);
    assert_eq!(graph["seed"], 1);
    assert!(outputs.join("model_args.json").exists());
}
