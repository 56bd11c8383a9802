//! Batch generators: encoder-decoder turns, language-model sequences and eval items.

use std::{
    collections::HashMap,
    fmt,
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    data::{
        dataset::{read_json, EvalExample, Example},
        dialogue::Dialogue,
        markers,
        preprocess::Preprocessor,
        retriever::Retriever,
        scenario::Role,
        vocab::{Mappings, Vocabulary},
    },
    lexicon::{EntityForm, Token},
};

/// Dataset partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Dev, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Dev => "dev",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Padded integer matrices for one minibatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub uuids: Vec<String>,
    /// `[batch, enc_len]`; absent for language-model batches.
    pub encoder_inputs: Option<Array2<i64>>,
    pub decoder_inputs: Array2<i64>,
    pub targets: Array2<i64>,
    /// Listing words in the kb vocabulary, `[batch, ctx_len]`.
    pub context: Option<Array2<i64>>,
    pub categories: Vec<usize>,
    /// Encoded candidate responses per row.
    pub candidates: Vec<Vec<Vec<i64>>>,
}

impl Batch {
    pub fn size(&self) -> usize {
        self.uuids.len()
    }
}

/// Collaborators and switches shared by the training-time generators.
#[derive(Debug, Default)]
pub struct GeneratorOptions {
    pub retriever: Option<Retriever>,
    pub cache: PathBuf,
    pub ignore_cache: bool,
    pub candidates_path: Vec<PathBuf>,
    pub num_context: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone)]
struct TurnExample {
    uuid: String,
    encoder: Vec<i64>,
    decoder_input: Vec<i64>,
    target: Vec<i64>,
    context: Vec<i64>,
    category: usize,
    candidates: Vec<Vec<i64>>,
}

#[derive(Debug, Default)]
struct SplitBatches {
    train: Vec<Batch>,
    dev: Vec<Batch>,
    test: Vec<Batch>,
}

impl SplitBatches {
    fn get(&self, split: Split) -> &[Batch] {
        match split {
            Split::Train => &self.train,
            Split::Dev => &self.dev,
            Split::Test => &self.test,
        }
    }

    fn set(&mut self, split: Split, batches: Vec<Batch>) {
        match split {
            Split::Train => self.train = batches,
            Split::Dev => self.dev = batches,
            Split::Test => self.test = batches,
        }
    }
}

/// Go-marker opening a turn spoken by `role`.
pub fn go_marker(role: Role) -> &'static str {
    match role {
        Role::Seller => markers::GO_S,
        Role::Buyer => markers::GO_B,
    }
}

fn encode(tokens: &[Token], form: EntityForm, vocab: &Vocabulary) -> Vec<i64> {
    tokens
        .iter()
        .map(|t| vocab.to_ind(&t.render(form)) as i64)
        .collect()
}

fn pad_rows(rows: &[&[i64]], pad: i64) -> Array2<i64> {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut matrix = Array2::from_elem((rows.len(), width), pad);
    for (i, row) in rows.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            matrix[[i, j]] = *value;
        }
    }
    matrix
}

fn turn_examples(
    dialogue: &Dialogue,
    turns: std::ops::Range<usize>,
    preprocessor: &Preprocessor,
    mappings: &Mappings,
    num_context: usize,
) -> Vec<TurnExample> {
    let vocab = &mappings.vocab;
    let history = num_context.max(1);
    let context: Vec<i64> = dialogue
        .context_tokens()
        .map(|w| mappings.kb_vocab.to_ind(w) as i64)
        .collect();
    let category = mappings.cat_vocab.to_ind(&dialogue.category);

    turns
        .map(|t| {
            let turn = &dialogue.turns[t];
            let encoder = if t == 0 {
                vec![vocab.to_ind(markers::START) as i64]
            } else {
                dialogue.turns[t.saturating_sub(history)..t]
                    .iter()
                    .flat_map(|prev| {
                        std::iter::once(vocab.to_ind(go_marker(prev.role)) as i64).chain(encode(
                            &prev.tokens,
                            preprocessor.entity_encoding_form,
                            vocab,
                        ))
                    })
                    .collect()
            };
            let mut decoder_input = vec![vocab.to_ind(go_marker(turn.role)) as i64];
            decoder_input.extend(encode(&turn.tokens, preprocessor.entity_decoding_form, vocab));
            let mut target = encode(&turn.tokens, preprocessor.entity_target_form, vocab);
            target.push(vocab.to_ind(markers::EOS) as i64);
            let candidates = dialogue
                .candidates
                .get(t)
                .map(|cands| {
                    cands
                        .iter()
                        .map(|c| encode(c, preprocessor.entity_decoding_form, vocab))
                        .collect()
                })
                .unwrap_or_default();
            TurnExample {
                uuid: dialogue.uuid.clone(),
                encoder,
                decoder_input,
                target,
                context: context.clone(),
                category,
                candidates,
            }
        })
        .collect()
}

fn batch_turns(mut examples: Vec<TurnExample>, batch_size: usize, pad: i64) -> Vec<Batch> {
    examples.sort_by_key(|e| (e.encoder.len(), e.decoder_input.len()));
    examples
        .chunks(batch_size)
        .map(|chunk| {
            let enc: Vec<&[i64]> = chunk.iter().map(|e| e.encoder.as_slice()).collect();
            let dec: Vec<&[i64]> = chunk.iter().map(|e| e.decoder_input.as_slice()).collect();
            let tgt: Vec<&[i64]> = chunk.iter().map(|e| e.target.as_slice()).collect();
            let ctx: Vec<&[i64]> = chunk.iter().map(|e| e.context.as_slice()).collect();
            Batch {
                uuids: chunk.iter().map(|e| e.uuid.clone()).collect(),
                encoder_inputs: Some(pad_rows(&enc, pad)),
                decoder_inputs: pad_rows(&dec, pad),
                targets: pad_rows(&tgt, pad),
                context: Some(pad_rows(&ctx, pad)),
                categories: chunk.iter().map(|e| e.category).collect(),
                candidates: chunk.iter().map(|e| e.candidates.clone()).collect(),
            }
        })
        .collect()
}

/// Preprocessed dialogues of one split and the settings that produced them.
#[derive(Debug, Serialize, Deserialize)]
struct DialogueCache {
    slot_filling: bool,
    price_clip: Option<f64>,
    dialogues: Vec<Dialogue>,
}

pub fn cache_path(cache: &Path, split: Split) -> PathBuf {
    cache.join(format!("dialogues-{split}.json"))
}

/// Preprocessed dialogues of `split`, read from the cache when it was written
/// with the same preprocessing settings. Batches are never cached; callers
/// rebuild them so batch size, history length and mappings always apply.
fn cached_dialogues(
    options: &GeneratorOptions,
    preprocessor: &Preprocessor,
    split: Split,
    examples: &[Example],
) -> Result<Vec<Dialogue>> {
    let path = cache_path(&options.cache, split);
    if !options.ignore_cache && path.exists() {
        let cached: DialogueCache = read_json(&path)?;
        if cached.slot_filling == preprocessor.slot_filling
            && cached.price_clip == preprocessor.price_clip()
        {
            info!(path = %path.display(), dialogues = cached.dialogues.len(), "loaded cached dialogues");
            return Ok(cached.dialogues);
        }
        info!(path = %path.display(), "cached dialogues were preprocessed differently, rebuilding");
    }
    let cache = DialogueCache {
        slot_filling: preprocessor.slot_filling,
        price_clip: preprocessor.price_clip(),
        dialogues: preprocessor.preprocess(examples)?,
    };
    fs::create_dir_all(&options.cache)
        .with_context(|| format!("create cache dir {}", options.cache.display()))?;
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer(file, &cache)?;
    debug!(path = %path.display(), dialogues = cache.dialogues.len(), "cached dialogues");
    Ok(cache.dialogues)
}

fn load_candidates(paths: &[PathBuf]) -> Result<HashMap<String, Vec<Vec<String>>>> {
    let mut candidates = HashMap::new();
    for path in paths {
        let file: HashMap<String, Vec<Vec<String>>> = read_json(path)?;
        info!(path = %path.display(), dialogues = file.len(), "loaded candidates");
        candidates.extend(file);
    }
    Ok(candidates)
}

fn attach_candidates(
    dialogues: &mut [Dialogue],
    preprocessor: &Preprocessor,
    retriever: Option<&Retriever>,
    precomputed: &HashMap<String, Vec<Vec<String>>>,
) {
    for dialogue in dialogues.iter_mut() {
        for t in 0..dialogue.num_turns() {
            let texts = match (precomputed.get(&dialogue.uuid), retriever) {
                (Some(per_turn), _) => per_turn.get(t).cloned().unwrap_or_default(),
                (None, Some(retriever)) => retriever.search(
                    dialogue.turns[t].role,
                    &dialogue.category,
                    &dialogue.history_text(t),
                ),
                (None, None) => continue,
            };
            let candidates = texts
                .iter()
                .map(|text| preprocessor.process_utterance(text, &dialogue.kb))
                .collect();
            dialogue.set_candidates(t, candidates);
        }
    }
}

fn check_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        bail!("batch size must be at least 1");
    }
    Ok(())
}

/// Encoder-decoder turn batches for train/dev/test.
#[derive(Debug)]
pub struct StandardDataGenerator {
    splits: SplitBatches,
}

impl StandardDataGenerator {
    pub fn new(
        train: Vec<Example>,
        dev: Vec<Example>,
        test: Vec<Example>,
        preprocessor: &Preprocessor,
        mappings: &Mappings,
        options: GeneratorOptions,
    ) -> Result<Self> {
        check_batch_size(options.batch_size)?;
        let precomputed = load_candidates(&options.candidates_path)?;
        let pad = mappings.vocab.to_ind(markers::PAD) as i64;
        let mut splits = SplitBatches::default();
        for (split, examples) in [(Split::Train, train), (Split::Dev, dev), (Split::Test, test)] {
            if examples.is_empty() {
                continue;
            }
            let mut dialogues = cached_dialogues(&options, preprocessor, split, &examples)?;
            attach_candidates(
                &mut dialogues,
                preprocessor,
                options.retriever.as_ref(),
                &precomputed,
            );
            let turns = dialogues
                .iter()
                .flat_map(|d| {
                    turn_examples(d, 0..d.num_turns(), preprocessor, mappings, options.num_context)
                })
                .collect();
            let batches = batch_turns(turns, options.batch_size, pad);
            info!(%split, batches = batches.len(), "built encoder-decoder batches");
            splits.set(split, batches);
        }
        Ok(Self { splits })
    }
}

/// Whole-dialogue sequences for language modelling.
#[derive(Debug)]
pub struct LmDataGenerator {
    splits: SplitBatches,
}

impl LmDataGenerator {
    pub fn new(
        train: Vec<Example>,
        dev: Vec<Example>,
        test: Vec<Example>,
        preprocessor: &Preprocessor,
        mappings: &Mappings,
        options: GeneratorOptions,
    ) -> Result<Self> {
        check_batch_size(options.batch_size)?;
        if options.retriever.is_some() || !options.candidates_path.is_empty() {
            warn!("language-model batches carry no candidates; ignoring retrieval options");
        }
        let vocab = &mappings.vocab;
        let pad = vocab.to_ind(markers::PAD) as i64;
        let mut splits = SplitBatches::default();
        for (split, examples) in [(Split::Train, train), (Split::Dev, dev), (Split::Test, test)] {
            if examples.is_empty() {
                continue;
            }
            let dialogues = cached_dialogues(&options, preprocessor, split, &examples)?;
            let mut sequences: Vec<(String, Vec<i64>)> = dialogues
                .iter()
                .map(|d| (d.uuid.clone(), lm_sequence(d, preprocessor, vocab)))
                .collect();
            sequences.sort_by_key(|(_, seq)| seq.len());
            let batches: Vec<Batch> = sequences
                .chunks(options.batch_size)
                .map(|chunk| {
                    let inputs: Vec<&[i64]> = chunk.iter().map(|(_, s)| &s[..s.len() - 1]).collect();
                    let targets: Vec<&[i64]> = chunk.iter().map(|(_, s)| &s[1..]).collect();
                    Batch {
                        uuids: chunk.iter().map(|(u, _)| u.clone()).collect(),
                        encoder_inputs: None,
                        decoder_inputs: pad_rows(&inputs, pad),
                        targets: pad_rows(&targets, pad),
                        context: None,
                        categories: Vec::new(),
                        candidates: Vec::new(),
                    }
                })
                .collect();
            info!(%split, batches = batches.len(), "built language-model batches");
            splits.set(split, batches);
        }
        Ok(Self { splits })
    }
}

/// Category marker, then every turn as go-marker plus tokens, closed by `</s>`.
fn lm_sequence(dialogue: &Dialogue, preprocessor: &Preprocessor, vocab: &Vocabulary) -> Vec<i64> {
    let mut seq = vec![vocab.to_ind(&markers::category(&dialogue.category)) as i64];
    for turn in &dialogue.turns {
        seq.push(vocab.to_ind(go_marker(turn.role)) as i64);
        seq.extend(encode(&turn.tokens, preprocessor.entity_decoding_form, vocab));
    }
    seq.push(vocab.to_ind(markers::EOS) as i64);
    seq
}

/// One single-item batch per evaluation example, all in the test split.
#[derive(Debug)]
pub struct EvalDataGenerator {
    splits: SplitBatches,
}

impl EvalDataGenerator {
    pub fn new(
        examples: &[EvalExample],
        preprocessor: &Preprocessor,
        mappings: &Mappings,
        num_context: usize,
    ) -> Self {
        let pad = mappings.vocab.to_ind(markers::PAD) as i64;
        let batches = examples
            .iter()
            .map(|example| {
                let dialogue = preprocessor.preprocess_eval(example);
                let last = dialogue.num_turns() - 1;
                let turns = turn_examples(&dialogue, last..last + 1, preprocessor, mappings, num_context);
                let mut batch = batch_turns(turns, 1, pad);
                batch.remove(0)
            })
            .collect::<Vec<_>>();
        info!(examples = examples.len(), "built evaluation batches");
        let mut splits = SplitBatches::default();
        splits.set(Split::Test, batches);
        Self { splits }
    }
}

/// The generator selected by the factory.
#[derive(Debug)]
pub enum DataGenerator {
    Standard(StandardDataGenerator),
    Lm(LmDataGenerator),
    Eval(EvalDataGenerator),
}

impl DataGenerator {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Standard(_) => "standard",
            Self::Lm(_) => "lm",
            Self::Eval(_) => "eval",
        }
    }

    fn splits(&self) -> &SplitBatches {
        match self {
            Self::Standard(g) => &g.splits,
            Self::Lm(g) => &g.splits,
            Self::Eval(g) => &g.splits,
        }
    }

    pub fn batches(&self, split: Split) -> &[Batch] {
        self.splits().get(split)
    }

    pub fn num_batches(&self, split: Split) -> usize {
        self.batches(split).len()
    }

    pub fn num_examples(&self, split: Split) -> usize {
        self.batches(split).iter().map(Batch::size).sum()
    }

    /// Batches of `split`, shuffled when training.
    pub fn shuffled<R: Rng>(&self, split: Split, rng: &mut R) -> Vec<&Batch> {
        let mut batches: Vec<&Batch> = self.batches(split).iter().collect();
        if split == Split::Train {
            batches.shuffle(rng);
        }
        batches
    }
}
