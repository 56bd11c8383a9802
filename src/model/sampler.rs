//! Decoding strategies.

use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Decoding method parsed from `--decoding`, e.g. `sample:0.7`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Decoding {
    /// Temperature sampling; temperature 0 is greedy.
    Sample { temperature: f64 },
}

impl FromStr for Decoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (method, arg) = match s.split_once(':') {
            Some((method, arg)) => (method.trim(), Some(arg.trim())),
            None => (s.trim(), None),
        };
        match method {
            "sample" => {
                let temperature = match arg {
                    Some(raw) => raw
                        .parse::<f64>()
                        .map_err(|_| ConfigError::UnknownDecoding(s.to_string()))?,
                    None => 0.0,
                };
                Ok(Self::Sample { temperature })
            }
            _ => Err(ConfigError::UnknownDecoding(s.to_string())),
        }
    }
}

impl fmt::Display for Decoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample { temperature } => write!(f, "sample:{temperature}"),
        }
    }
}

/// Picks the next token from decoder logits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sampler {
    pub temperature: f64,
}

impl Sampler {
    pub fn new(temperature: f64) -> Self {
        Self { temperature }
    }

    pub fn from_decoding(decoding: &Decoding) -> Self {
        match *decoding {
            Decoding::Sample { temperature } => Self::new(temperature),
        }
    }

    /// Argmax at temperature 0, otherwise a draw from `softmax(logits / t)`.
    ///
    /// NaN logits are never picked. Returns `None` when no logit is a number.
    pub fn sample<R: Rng>(&self, logits: &[f32], rng: &mut R) -> Option<usize> {
        let argmax = logits
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.is_nan())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)?;
        let max = logits[argmax];
        if self.temperature <= 0.0 || !max.is_finite() {
            return Some(argmax);
        }
        let t = self.temperature as f32;
        let weights: Vec<f32> = logits
            .iter()
            .map(|l| if l.is_nan() { 0.0 } else { ((l - max) / t).exp() })
            .collect();
        let total: f32 = weights.iter().sum();
        let mut draw = rng.gen::<f32>() * total;
        for (i, w) in weights.iter().enumerate() {
            if *w > 0.0 && draw < *w {
                return Some(i);
            }
            draw -= w;
        }
        // Rounding left `draw` past the last weight.
        Some(argmax)
    }
}
