mod common;

use std::str::FromStr;

use negotiator::{
    data::{markers, vocab::Mappings},
    error::ConfigError,
    model::{
        context_embedder::CATEGORY_EMBED_SIZE,
        decoder::decoder_stack,
        encoder::EncoderKind,
        graph::{GraphContext, KeepProb},
        sampler::{Decoding, Sampler},
        Model,
    },
    negotiation::build_model,
};
use tempfile::tempdir;

use common::{mappings_for, parse_args, schema, write_wordvec};

fn mappings() -> Mappings {
    mappings_for(&[], &schema())
}

fn build(flags: &[&str]) -> anyhow::Result<(Model, GraphContext)> {
    let mut ctx = GraphContext::new(0);
    let model = build_model(&mappings(), &parse_args(flags), &mut ctx)?;
    Ok((model, ctx))
}

fn config_error(flags: &[&str]) -> ConfigError {
    let err = build(flags).expect_err("build should fail");
    match err.downcast::<ConfigError>() {
        Ok(config) => config,
        Err(other) => panic!("unexpected error: {other:#}"),
    }
}

#[test]
fn price_head_sits_beneath_slot_filling() {
    let (model, _) = build(&["--model", "encdec", "--predict-price", "--slot-filling"]).unwrap();
    let decoder = model.decoder().expect("decoder");
    assert_eq!(decoder_stack(decoder), ["slot_filling", "price", "basic"]);
}

#[test]
fn single_wrappers_apply_alone() {
    let (model, ctx) = build(&["--model", "encdec", "--predict-price"]).unwrap();
    assert_eq!(decoder_stack(model.decoder().unwrap()), ["price", "basic"]);
    assert!(ctx.variable_names().any(|n| n == "PricePredictor/hidden"));

    let (model, _) = build(&["--model", "lm", "--slot-filling"]).unwrap();
    assert_eq!(decoder_stack(model.decoder().unwrap()), ["slot_filling", "basic"]);
}

#[test]
fn context_mode_selects_context_decoder() {
    let (model, ctx) = build(&["--model", "encdec", "--context", "title,description"]).unwrap();
    assert_eq!(decoder_stack(model.decoder().unwrap()), ["context"]);
    // Bow listing encoder of the default width plus the category embedding.
    assert_eq!(
        model.summary()["decoder"]["context_width"],
        20 + CATEGORY_EMBED_SIZE
    );
    let names: Vec<&str> = ctx.variable_names().collect();
    assert!(names.contains(&"ContextWordEmbedder/embedding"));
    assert!(names.contains(&"CategoryWordEmbedder/embedding"));
}

#[test]
fn attention_over_listing_needs_context() {
    let err = config_error(&[
        "--model", "encdec", "--decoder", "rnn-attn", "--attention-memory", "title",
    ]);
    assert!(matches!(err, ConfigError::AttentionMemoryWithoutContext(field) if field == "title"));

    let (model, _) = build(&[
        "--model", "encdec", "--decoder", "rnn-attn", "--attention-memory", "encoder,title",
        "--context", "title",
    ])
    .unwrap();
    assert_eq!(decoder_stack(model.decoder().unwrap()), ["attention"]);
}

#[test]
fn encoder_follows_num_context() {
    let (model, _) = build(&["--model", "encdec", "--num-context", "2"]).unwrap();
    let Model::EncoderDecoder(encdec) = model else {
        panic!("expected encoder-decoder");
    };
    assert_eq!(encdec.encoder.kind, EncoderKind::Context { num_context: 2 });
    assert!(!encdec.stateful);

    let (model, _) = build(&["--model", "encdec", "--stateful"]).unwrap();
    let Model::EncoderDecoder(encdec) = model else {
        panic!("expected encoder-decoder");
    };
    assert_eq!(encdec.encoder.kind, EncoderKind::Basic);
    assert!(encdec.stateful);
}

#[test]
fn ranker_selection() {
    let (model, _) = build(&["--ranker", "cheat"]).unwrap();
    assert!(matches!(model, Model::CheatRanker(_)));
    let (model, _) = build(&["--ranker", "cheat", "--model", "lm"]).unwrap();
    assert!(matches!(model, Model::CheatRanker(_)));

    let (model, _) = build(&["--ranker", "ir", "--model", "encdec"]).unwrap();
    assert!(matches!(model, Model::IrRanker(_)));

    let (model, _) = build(&["--ranker", "encdec", "--temperature", "0.5"]).unwrap();
    match &model {
        Model::EncDecRanker { model, temperature } => {
            assert_eq!(*temperature, 0.5);
            assert!(matches!(model.as_ref(), Model::EncoderDecoder(_)));
        }
        other => panic!("unexpected model {}", other.name()),
    }

    let (model, _) = build(&["--ranker", "sf", "--model", "lm"]).unwrap();
    assert_eq!(model.name(), "sf_ranker");
    assert!(matches!(model.inner(), Some(Model::LanguageModel(_))));
}

#[test]
fn missing_model_is_reported() {
    assert!(matches!(config_error(&[]), ConfigError::MissingModel));
    assert!(matches!(config_error(&["--ranker", "sf"]), ConfigError::MissingModel));
}

#[test]
fn decoding_parses_sample_temperature() {
    let decoding = Decoding::from_str("sample:0.7").unwrap();
    assert_eq!(decoding, Decoding::Sample { temperature: 0.7 });
    assert_eq!(Sampler::from_decoding(&decoding).temperature, 0.7);

    assert!(matches!(
        Decoding::from_str("beam:5"),
        Err(ConfigError::UnknownDecoding(_))
    ));
    let args = parse_args(&["--decoding", "sample:0.7"]);
    assert_eq!(args.model.basic.decoding, Decoding::Sample { temperature: 0.7 });
}

#[test]
fn unknown_decoding_fails_at_parse_time() {
    use clap::Parser;
    let parsed = negotiator::negotiation::Arguments::try_parse_from(["negotiator", "--decoding", "beam:5"]);
    assert!(parsed.is_err());
}

#[test]
fn encoder_and_decoder_embeddings_are_independent() {
    let (model, ctx) = build(&["--model", "encdec"]).unwrap();
    let names: Vec<&str> = ctx.variable_names().collect();
    assert!(names.contains(&"EncoderWordEmbedder/embedding"));
    assert!(names.contains(&"DecoderWordEmbedder/embedding"));

    let Model::EncoderDecoder(encdec) = &model else {
        panic!("expected encoder-decoder");
    };
    let enc = ctx.get(&encdec.encoder.word_embedder.embedding).unwrap();
    let dec = ctx.get(&encdec.decoder.core().word_embedder.embedding).unwrap();
    assert_ne!(enc, dec);
    assert!(enc.row(0).iter().all(|v| *v == 0.0), "pad row is zeroed");
}

#[test]
fn same_seed_rebuilds_identical_parameters() {
    let flags = ["--model", "encdec", "--random-seed", "7"];
    let (first, ctx_a) = build(&flags).unwrap();
    let (_, ctx_b) = build(&flags).unwrap();
    let Model::EncoderDecoder(encdec) = &first else {
        panic!("expected encoder-decoder");
    };
    let variable = &encdec.encoder.word_embedder.embedding;
    assert_eq!(ctx_a.get(variable), ctx_b.get(variable));

    let (_, ctx_c) = build(&["--model", "encdec", "--random-seed", "8"]).unwrap();
    assert_ne!(ctx_a.get(variable), ctx_c.get(variable));
}

#[test]
fn keep_prob_is_fixed_when_testing() {
    let (model, _) = build(&["--model", "encdec", "--test", "--dropout", "0.3"]).unwrap();
    let Model::EncoderDecoder(encdec) = &model else {
        panic!("expected encoder-decoder");
    };
    assert_eq!(encdec.keep_prob, KeepProb::Fixed { value: 1.0 });

    let (model, _) = build(&["--model", "encdec", "--dropout", "0.25"]).unwrap();
    let Model::EncoderDecoder(encdec) = &model else {
        panic!("expected encoder-decoder");
    };
    assert_eq!(encdec.keep_prob.value(None), 0.75);
    assert_eq!(encdec.keep_prob.value(Some(1.0)), 1.0);
}

#[test]
fn pretrained_rows_are_copied_into_both_embedders() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vectors.txt");
    write_wordvec(&path, &[(markers::GO_S, vec![1.0, 2.0, 3.0, 4.0])]);
    let (model, ctx) = build(&[
        "--model", "encdec", "--pretrained-wordvec", path.to_str().unwrap(),
        "--word-embed-size", "4",
    ])
    .unwrap();
    let Model::EncoderDecoder(encdec) = &model else {
        panic!("expected encoder-decoder");
    };
    let row = mappings().vocab.to_ind(markers::GO_S);
    for variable in [
        &encdec.encoder.word_embedder.embedding,
        &encdec.decoder.core().word_embedder.embedding,
    ] {
        let table = ctx.get(variable).unwrap();
        assert_eq!(table.row(row).to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }
}

#[test]
fn tied_decoder_has_no_output_projection() {
    let (_, ctx) = build(&["--model", "lm", "--tied"]).unwrap();
    assert!(!ctx.variable_names().any(|n| n == "Decoder/output_projection"));
    let (_, ctx) = build(&["--model", "lm"]).unwrap();
    assert!(ctx.variable_names().any(|n| n == "Decoder/output_projection"));
}
