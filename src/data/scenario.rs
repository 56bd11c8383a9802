//! Schema, knowledge bases and scenarios for the bargaining task.

use std::{collections::HashMap, fmt, path::Path, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args as ClapArgs;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::dataset::read_json;

/// Options for locating the schema and scenario database.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct ScenarioArgs {
    /// Input path of the schema describing attributes and allowed values.
    #[arg(long)]
    pub schema_path: Option<PathBuf>,
    /// Input path of the scenarios (JSON list).
    #[arg(long)]
    pub scenarios_path: Option<PathBuf>,
}

/// Negotiation role of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed attribute of the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value_type: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub multivalued: bool,
}

/// Attributes and their admissible values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub values: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn from_path(path: &Path) -> Result<Self> {
        let schema: Schema =
            read_json(path).with_context(|| format!("load schema {}", path.display()))?;
        info!(path = %path.display(), attributes = schema.attributes.len(), "loaded schema");
        Ok(schema)
    }

    /// Item categories in schema order.
    pub fn categories(&self) -> &[String] {
        self.values.get("category").map(Vec::as_slice).unwrap_or(&[])
    }

    fn admits(&self, value_type: &str, value: &str) -> bool {
        match self.values.get(value_type) {
            Some(values) => values.iter().any(|v| v.eq_ignore_ascii_case(value)),
            None => true,
        }
    }
}

/// The listing an agent negotiates over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: Vec<String>,
    #[serde(rename = "Price")]
    pub price: f64,
}

/// Private information of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personal {
    #[serde(rename = "Role")]
    pub role: Role,
    #[serde(rename = "Target", default)]
    pub target: Option<f64>,
    #[serde(rename = "Bottomline", default)]
    pub bottomline: Option<f64>,
}

/// Knowledge base of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kb {
    pub item: Item,
    pub personal: Personal,
}

impl Kb {
    /// Deserialize a KB and check its category and role against the schema.
    pub fn from_dict(schema: &Schema, raw: &serde_json::Value) -> Result<Self> {
        let kb: Kb = serde_json::from_value(raw.clone()).context("parse kb")?;
        if !schema.admits("category", &kb.item.category) {
            bail!("category {} is not in the schema", kb.item.category);
        }
        if !schema.admits("role", kb.personal.role.as_str()) {
            bail!("role {} is not in the schema", kb.personal.role);
        }
        Ok(kb)
    }

    pub fn role(&self) -> Role {
        self.personal.role
    }

    pub fn category(&self) -> &str {
        &self.item.category
    }

    pub fn listing_price(&self) -> f64 {
        self.item.price
    }

    /// Title and description joined into one lowercase string.
    pub fn item_text(&self) -> String {
        let mut text = self.item.title.to_lowercase();
        for line in &self.item.description {
            text.push(' ');
            text.push_str(&line.to_lowercase());
        }
        text
    }
}

/// A bargaining scenario: one listing seen by a buyer and a seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub uuid: String,
    #[serde(default)]
    pub post_id: Option<String>,
    pub category: String,
    pub kbs: Vec<Kb>,
}

impl Scenario {
    pub fn kb(&self, agent: usize) -> Option<&Kb> {
        self.kbs.get(agent)
    }
}

/// Scenarios indexed by uuid.
#[derive(Debug, Clone, Default)]
pub struct ScenarioDb {
    scenarios: HashMap<String, Scenario>,
}

impl ScenarioDb {
    pub fn from_path(schema: &Schema, path: &Path) -> Result<Self> {
        let values: Vec<serde_json::Value> =
            read_json(path).with_context(|| format!("load scenarios {}", path.display()))?;
        let mut scenarios = HashMap::with_capacity(values.len());
        for value in values {
            let scenario: Scenario = serde_json::from_value(value)?;
            for kb in &scenario.kbs {
                let raw_kb = serde_json::to_value(kb)?;
                Kb::from_dict(schema, &raw_kb)
                    .with_context(|| format!("scenario {}", scenario.uuid))?;
            }
            scenarios.insert(scenario.uuid.clone(), scenario);
        }
        info!(path = %path.display(), count = scenarios.len(), "loaded scenario db");
        Ok(Self { scenarios })
    }

    pub fn get(&self, uuid: &str) -> Option<&Scenario> {
        self.scenarios.get(uuid)
    }
}
