//! Vocabularies mapping words to indices, and pretrained vector loading.

use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{bail, Context, Result};
use indexmap::IndexSet;
use ndarray::Array2;
use rand::{distributions::Uniform, Rng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    data::{dataset::read_json, dialogue::Dialogue, markers, scenario::Schema},
    error::ConfigError,
    lexicon::EntityForm,
};

/// Range of the uniform initialisation for words missing from a pretrained file.
const INIT_SCALE: f32 = 0.1;

/// Insertion-ordered word table. `<pad>` is always index 0 and `<unk>` index 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    words: IndexSet<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        let mut words = IndexSet::new();
        words.insert(markers::PAD.to_string());
        words.insert(markers::UNK.to_string());
        Self { words }
    }

    /// A vocabulary holding every sequence marker.
    pub fn with_markers() -> Self {
        let mut vocab = Self::new();
        vocab.add_words(markers::SEQUENCE_MARKERS.iter().copied());
        vocab
    }

    pub fn add_word(&mut self, word: impl Into<String>) -> usize {
        self.words.insert_full(word.into()).0
    }

    pub fn add_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for word in words {
            self.add_word(word);
        }
    }

    pub fn size(&self) -> usize {
        self.words.len()
    }

    /// Index of `word`, or of `<unk>` when absent.
    pub fn to_ind(&self, word: &str) -> usize {
        self.words
            .get_index_of(word)
            .unwrap_or_else(|| self.words.get_index_of(markers::UNK).unwrap_or(0))
    }

    pub fn to_word(&self, index: usize) -> Option<&str> {
        self.words.get_index(index).map(String::as_str)
    }

    /// Embedding matrix `[size, dim]`: rows of words found in `path` are copied,
    /// the rest are drawn uniformly from `rng`.
    pub fn load_embeddings<R: Rng>(&self, path: &Path, dim: usize, rng: &mut R) -> Result<Array2<f32>> {
        let dist = Uniform::new_inclusive(-INIT_SCALE, INIT_SCALE);
        let mut embeddings = Array2::from_shape_simple_fn((self.size(), dim), || rng.sample(dist));
        let file = File::open(path).with_context(|| format!("open word vectors {}", path.display()))?;
        let mut found = 0usize;
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let Some(index) = self.words.get_index_of(word) else {
                continue;
            };
            let values = fields
                .map(str::parse::<f32>)
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("{}:{}: bad float", path.display(), lineno + 1))?;
            if values.len() != dim {
                bail!(
                    "{}:{}: expected {dim} values, found {}",
                    path.display(),
                    lineno + 1,
                    values.len()
                );
            }
            for (col, value) in values.into_iter().enumerate() {
                embeddings[[index, col]] = value;
            }
            found += 1;
        }
        info!(path = %path.display(), found, vocab = self.size(), "loaded pretrained embeddings");
        Ok(embeddings)
    }
}

/// Dimension of a word vector file: token count of its first line minus the word itself.
pub fn word_vector_dim(path: &Path) -> Result<usize, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    first
        .split_whitespace()
        .count()
        .checked_sub(1)
        .ok_or_else(|| ConfigError::MalformedWordVectors(path.to_path_buf()))
}

/// Utterance, listing and category vocabularies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mappings {
    pub vocab: Vocabulary,
    pub kb_vocab: Vocabulary,
    pub cat_vocab: Vocabulary,
}

impl Mappings {
    /// Build all vocabularies from preprocessed dialogues.
    pub fn build(dialogues: &[Dialogue], schema: &Schema, forms: &[EntityForm]) -> Self {
        let mut vocab = Vocabulary::with_markers();
        let mut kb_vocab = Vocabulary::new();
        let mut cat_vocab = Vocabulary::new();

        for category in schema.categories() {
            vocab.add_word(markers::category(category));
            cat_vocab.add_word(category.as_str());
        }
        for dialogue in dialogues {
            vocab.add_word(markers::category(&dialogue.category));
            cat_vocab.add_word(dialogue.category.as_str());
            kb_vocab.add_words(dialogue.context_tokens().cloned());
            for token in dialogue
                .turns
                .iter()
                .flat_map(|t| t.tokens.iter())
                .chain(dialogue.candidates.iter().flatten().flatten())
            {
                for form in forms {
                    vocab.add_word(token.render(*form));
                }
            }
        }
        info!(
            vocab = vocab.size(),
            kb_vocab = kb_vocab.size(),
            cat_vocab = cat_vocab.size(),
            "built mappings"
        );
        Self {
            vocab,
            kb_vocab,
            cat_vocab,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path).with_context(|| format!("load mappings {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer(file, self)?;
        info!(path = %path.display(), "wrote mappings");
        Ok(())
    }
}
