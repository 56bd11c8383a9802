//! Dialogue transcripts, evaluation examples and dataset readers.

use std::{collections::HashMap, fs, path::Path, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args as ClapArgs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::data::scenario::{Kb, Role, Scenario, ScenarioDb, Schema};

/// Options for locating transcripts.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct DatasetArgs {
    /// Input training examples (JSON lists of transcripts).
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    pub train_examples_paths: Vec<PathBuf>,
    /// Input test examples.
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    pub test_examples_paths: Vec<PathBuf>,
    /// Maximum number of training examples to read.
    #[arg(long)]
    pub train_max_examples: Option<usize>,
    /// Maximum number of test examples to read.
    #[arg(long)]
    pub test_max_examples: Option<usize>,
    /// Evaluation examples (context, target and candidates).
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    pub eval_examples_paths: Vec<PathBuf>,
}

/// Kind of a dialogue event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Message,
    Offer,
    Accept,
    Reject,
    Quit,
}

/// One event of a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub agent: usize,
    pub action: Action,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub time: Option<Value>,
}

impl Event {
    pub fn message(&self) -> Option<&str> {
        match self.action {
            Action::Message => self.data.as_str(),
            _ => None,
        }
    }

    pub fn offer_price(&self) -> Option<f64> {
        match self.action {
            Action::Offer => self.data.get("price").and_then(Value::as_f64),
            _ => None,
        }
    }
}

/// A complete transcript between two agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub uuid: String,
    #[serde(default)]
    pub scenario_uuid: Option<String>,
    #[serde(default)]
    pub scenario: Option<Scenario>,
    #[serde(default)]
    pub agents: HashMap<String, String>,
    #[serde(default)]
    pub outcome: Option<Value>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Example {
    pub fn scenario(&self) -> Result<&Scenario> {
        self.scenario
            .as_ref()
            .with_context(|| format!("example {} has no scenario", self.uuid))
    }
}

/// Train and test transcripts.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub train_examples: Vec<Example>,
    pub test_examples: Vec<Example>,
}

/// A single evaluation item: dialogue history, gold response and candidates.
#[derive(Debug, Clone, Serialize)]
pub struct EvalExample {
    pub uuid: String,
    pub scenario_id: Option<String>,
    pub kb: Kb,
    pub agent: usize,
    pub role: Role,
    pub prev_turns: Vec<String>,
    pub prev_roles: Vec<Role>,
    pub target: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvalExample {
    uuid: String,
    #[serde(default)]
    scenario_id: Option<String>,
    kb: Value,
    agent: usize,
    role: Role,
    #[serde(default)]
    prev_turns: Vec<String>,
    #[serde(default)]
    prev_roles: Vec<Role>,
    target: String,
    #[serde(default)]
    candidates: Vec<String>,
}

impl EvalExample {
    /// Build an eval example from a raw JSON record, checking the KB against the schema.
    pub fn from_dict(schema: &Schema, raw: &Value) -> Result<Self> {
        let raw: RawEvalExample =
            serde_json::from_value(raw.clone()).context("parse eval example")?;
        if raw.prev_turns.len() != raw.prev_roles.len() {
            bail!(
                "eval example {} has {} turns but {} roles",
                raw.uuid,
                raw.prev_turns.len(),
                raw.prev_roles.len()
            );
        }
        let kb = Kb::from_dict(schema, &raw.kb)
            .with_context(|| format!("eval example {}", raw.uuid))?;
        Ok(Self {
            uuid: raw.uuid,
            scenario_id: raw.scenario_id,
            kb,
            agent: raw.agent,
            role: raw.role,
            prev_turns: raw.prev_turns,
            prev_roles: raw.prev_roles,
            target: raw.target,
            candidates: raw.candidates,
        })
    }
}

/// Access to transcripts on behalf of the data generator factory.
pub trait ExampleSource {
    /// Read the standard train/test dataset.
    fn read_dataset(&self, args: &DatasetArgs) -> Result<Dataset>;
    /// Read one file of evaluation examples.
    fn read_eval_examples(&self, path: &Path, schema: &Schema) -> Result<Vec<EvalExample>>;
}

/// Reads transcripts from JSON files, resolving scenarios through an optional database.
#[derive(Debug, Default)]
pub struct JsonExampleSource {
    scenario_db: Option<ScenarioDb>,
}

impl JsonExampleSource {
    pub fn new(scenario_db: Option<ScenarioDb>) -> Self {
        Self { scenario_db }
    }

    fn read_examples(&self, paths: &[PathBuf], max_examples: Option<usize>) -> Result<Vec<Example>> {
        let mut examples = Vec::new();
        for path in paths {
            let mut batch: Vec<Example> = read_json(path)?;
            for example in &mut batch {
                self.resolve_scenario(example)?;
            }
            debug!(path = %path.display(), count = batch.len(), "read examples");
            examples.extend(batch);
        }
        if let Some(max) = max_examples {
            examples.truncate(max);
        }
        Ok(examples)
    }

    fn resolve_scenario(&self, example: &mut Example) -> Result<()> {
        if example.scenario.is_some() {
            return Ok(());
        }
        let uuid = example
            .scenario_uuid
            .as_deref()
            .with_context(|| format!("example {} has neither scenario nor scenario_uuid", example.uuid))?;
        let Some(db) = &self.scenario_db else {
            bail!("example {} references scenario {uuid} but no --scenarios-path was given", example.uuid);
        };
        let scenario = db
            .get(uuid)
            .with_context(|| format!("scenario {uuid} not found"))?;
        example.scenario = Some(scenario.clone());
        Ok(())
    }
}

impl ExampleSource for JsonExampleSource {
    fn read_dataset(&self, args: &DatasetArgs) -> Result<Dataset> {
        let train_examples = self.read_examples(&args.train_examples_paths, args.train_max_examples)?;
        let test_examples = self.read_examples(&args.test_examples_paths, args.test_max_examples)?;
        info!(
            train = train_examples.len(),
            test = test_examples.len(),
            "read dataset"
        );
        Ok(Dataset {
            train_examples,
            test_examples,
        })
    }

    fn read_eval_examples(&self, path: &Path, schema: &Schema) -> Result<Vec<EvalExample>> {
        let raw: Vec<Value> = read_json(path)?;
        raw.iter()
            .map(|value| EvalExample::from_dict(schema, value))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("eval examples in {}", path.display()))
    }
}

/// Deserialize a whole JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}
