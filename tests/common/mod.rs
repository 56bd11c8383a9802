#![allow(dead_code)]

use std::{fs, path::Path};

use clap::Parser;
use negotiator::{
    data::{
        dataset::Example,
        dialogue::Dialogue,
        preprocess::Preprocessor,
        scenario::Schema,
        vocab::Mappings,
    },
    lexicon::{price_tracker::PriceTracker, slot_detector::SlotDetector, EntityForm},
    negotiation::Arguments,
};
use serde_json::{json, Value};

pub fn parse_args(flags: &[&str]) -> Arguments {
    Arguments::try_parse_from(std::iter::once("negotiator").chain(flags.iter().copied()))
        .expect("valid arguments")
}

pub fn schema() -> Schema {
    serde_json::from_value(json!({
        "values": {
            "category": ["bike", "phone"],
            "role": ["buyer", "seller"]
        },
        "attributes": [
            {"name": "Category", "value_type": "category"},
            {"name": "Role", "value_type": "role"}
        ]
    }))
    .expect("schema")
}

pub fn kb_json(role: &str) -> Value {
    json!({
        "item": {
            "Category": "bike",
            "Title": "Red road bike",
            "Description": ["Lightly used frame", "Shimano gears"],
            "Price": 200
        },
        "personal": {
            "Role": role,
            "Target": if role == "seller" { 200 } else { 150 },
            "Bottomline": if role == "seller" { 160 } else { 190 }
        }
    })
}

pub fn example_json(uuid: &str) -> Value {
    json!({
        "uuid": uuid,
        "scenario": {
            "uuid": format!("s-{uuid}"),
            "category": "bike",
            "kbs": [kb_json("buyer"), kb_json("seller")]
        },
        "events": [
            {"agent": 0, "action": "message", "data": "Hi, is the road bike still available?"},
            {"agent": 1, "action": "message", "data": "Yes it is. Asking $200 for it."},
            {"agent": 1, "action": "message", "data": "The gears are new."},
            {"agent": 0, "action": "offer", "data": {"price": 170}},
            {"agent": 1, "action": "accept", "data": null}
        ]
    })
}

pub fn examples(n: usize) -> Vec<Example> {
    (0..n)
        .map(|i| serde_json::from_value(example_json(&format!("ex{i}"))).expect("example"))
        .collect()
}

pub fn eval_example_json(uuid: &str) -> Value {
    json!({
        "uuid": uuid,
        "kb": kb_json("seller"),
        "agent": 1,
        "role": "seller",
        "prev_turns": ["Hi, would you take 150?"],
        "prev_roles": ["buyer"],
        "target": "I can do 180.",
        "candidates": ["I can do 180.", "No thanks.", "Sorry, it is sold."]
    })
}

pub fn preprocessor(schema: &Schema) -> Preprocessor {
    Preprocessor::new(
        schema.clone(),
        PriceTracker::new(None).expect("default lexicon"),
        EntityForm::Canonical,
        EntityForm::Canonical,
        EntityForm::Canonical,
        false,
        SlotDetector::new(None, 0.5).expect("detector"),
    )
}

pub fn mappings_for(dialogues: &[Dialogue], schema: &Schema) -> Mappings {
    Mappings::build(dialogues, schema, &[EntityForm::Canonical])
}

pub fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string(value).expect("json")).expect("write fixture");
}

/// A word-vector file whose first row has `dim` values.
pub fn write_wordvec(path: &Path, rows: &[(&str, Vec<f32>)]) {
    let text: String = rows
        .iter()
        .map(|(word, values)| {
            let values: Vec<String> = values.iter().map(f32::to_string).collect();
            format!("{word} {}\n", values.join(" "))
        })
        .collect();
    fs::write(path, text).expect("write word vectors");
}
