//! Data generator factory.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::{
    data::{
        dataset::{EvalExample, Example, ExampleSource},
        generator::{
            DataGenerator, EvalDataGenerator, GeneratorOptions, LmDataGenerator,
            StandardDataGenerator,
        },
        preprocess::Preprocessor,
        retriever::Retriever,
        scenario::Schema,
        vocab::Mappings,
    },
    lexicon::{price_tracker::PriceTracker, slot_detector::SlotDetector},
    model::{encdec::ModelType, ModelArgs},
    negotiation::args::{DataGeneratorArgs, RunArgs},
};

enum Loaded {
    Eval(Vec<EvalExample>),
    Splits {
        train: Vec<Example>,
        dev: Vec<Example>,
        test: Vec<Example>,
    },
}

/// Bind the schema, price lexicon and slot detector into a preprocessor.
pub fn build_preprocessor(
    data: &DataGeneratorArgs,
    model_args: &ModelArgs,
    schema: &Schema,
) -> Result<Preprocessor> {
    let lexicon = PriceTracker::new(data.price_tracker.price_tracker_model.as_deref())?;
    let slot_detector = SlotDetector::new(
        data.slot_detector.slot_scores.as_deref(),
        data.slot_detector.slot_threshold,
    )?;
    let preprocess = &data.preprocess;
    Ok(Preprocessor::new(
        schema.clone(),
        lexicon,
        preprocess.entity_encoding_form,
        preprocess.entity_decoding_form,
        preprocess.entity_target_form,
        model_args.encdec.slot_filling,
        slot_detector,
    )
    .with_price_clip(data.price_tracker.price_clip))
}

/// Load the examples for this run and wrap them in the matching generator.
///
/// In eval mode only `eval_examples_paths` are read. In test mode dropout is
/// zeroed and only the test split is kept.
#[instrument(skip_all, fields(eval = run.eval, test = run.test))]
pub fn get_data_generator(
    data: &DataGeneratorArgs,
    run: &RunArgs,
    model_args: &mut ModelArgs,
    mappings: &Mappings,
    schema: &Schema,
    source: &dyn ExampleSource,
) -> Result<DataGenerator> {
    let loaded = if run.eval {
        let mut examples = Vec::new();
        for path in &data.dataset.eval_examples_paths {
            examples.extend(source.read_eval_examples(path, schema)?);
        }
        Loaded::Eval(examples)
    } else {
        let dataset = source.read_dataset(&data.dataset)?;
        if run.test {
            model_args.basic.dropout = 0.0;
            Loaded::Splits {
                train: Vec::new(),
                dev: Vec::new(),
                test: dataset.test_examples,
            }
        } else {
            Loaded::Splits {
                train: dataset.train_examples,
                dev: dataset.test_examples,
                test: Vec::new(),
            }
        }
    };

    let preprocessor = build_preprocessor(data, model_args, schema)?;

    let retriever = if data.retriever.retrieve {
        let index = data
            .retriever
            .index
            .as_deref()
            .context("--retrieve requires --index")?;
        Some(Retriever::new(
            index,
            data.retriever.retriever_context_len,
            data.retriever.num_candidates,
        )?)
    } else {
        None
    };

    let num_context = model_args.encdec.num_context;
    let generator = match loaded {
        Loaded::Eval(examples) => DataGenerator::Eval(EvalDataGenerator::new(
            &examples,
            &preprocessor,
            mappings,
            num_context,
        )),
        Loaded::Splits { train, dev, test } => {
            let options = GeneratorOptions {
                retriever,
                cache: data.preprocess.cache.clone(),
                ignore_cache: data.preprocess.ignore_cache,
                candidates_path: data.preprocess.candidates_path.clone(),
                num_context,
                batch_size: run.batch_size,
            };
            if model_args.basic.model == Some(ModelType::Lm) {
                DataGenerator::Lm(LmDataGenerator::new(
                    train,
                    dev,
                    test,
                    &preprocessor,
                    mappings,
                    options,
                )?)
            } else {
                DataGenerator::Standard(StandardDataGenerator::new(
                    train,
                    dev,
                    test,
                    &preprocessor,
                    mappings,
                    options,
                )?)
            }
        }
    };
    info!(kind = generator.kind(), "data generator ready");
    Ok(generator)
}
