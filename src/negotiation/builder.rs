//! Flag validation and model assembly.

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::{
    data::{markers, vocab::{word_vector_dim, Mappings}},
    error::ConfigError,
    model::{
        context_embedder::{ContextEmbedder, ContextEncoderType, CATEGORY_EMBED_SIZE},
        decoder::{
            decoder_stack, AttentionDecoder, BasicDecoder, ContextDecoder, Decoder, DecoderCore,
            PriceDecoder, SlotFillingDecoder,
        },
        encdec::{DecoderType, EncoderDecoder, LanguageModel, ModelType},
        encoder::Encoder,
        graph::{GraphContext, KeepProb},
        price_predictor::PricePredictor,
        ranker::{CheatRanker, IrRanker, RankerType},
        sampler::Sampler,
        sequence_embedder::{get_sequence_embedder, SequenceEmbedder, SequenceEmbedderOptions},
        word_embedder::WordEmbedder,
        Model, ModelArgs,
    },
    negotiation::args::Arguments,
};

/// Reject flag combinations that cannot produce a consistent model.
pub fn check_model_args(args: &Arguments) -> Result<(), ConfigError> {
    let model = &args.model;
    let basic = &model.basic;
    let encdec = &model.encdec;

    if let Some(path) = &basic.pretrained_wordvec {
        let dim = word_vector_dim(path)?;
        if dim != basic.word_embed_size {
            return Err(ConfigError::EmbeddingSizeMismatch {
                expected: basic.word_embed_size,
                found: dim,
            });
        }
        let context_size = model.context_embedder.context_size;
        if encdec.context_enabled()
            && model.context_embedder.context_encoder == ContextEncoderType::Bow
            && dim != context_size
        {
            return Err(ConfigError::ContextSizeMismatch {
                expected: context_size,
                found: dim,
            });
        }
    }

    if encdec.slot_filling && args.run.test && args.run.batch_size != 1 {
        return Err(ConfigError::SlotFillingBatchSize(args.run.batch_size));
    }

    if basic.decoder == DecoderType::RnnAttn && encdec.attention_memory.is_empty() {
        return Err(ConfigError::MissingAttentionMemory);
    }

    if encdec.num_context > 0 && encdec.stateful {
        return Err(ConfigError::StatefulWithContext(encdec.num_context));
    }

    if model.ranker.temperature < 0.0 {
        return Err(ConfigError::NegativeTemperature(model.ranker.temperature));
    }

    Ok(())
}

/// Components shared by every decoder variant.
struct Parts {
    pad: usize,
    vocab_size: usize,
    keep_prob: KeepProb,
    sampler: Sampler,
    decoder_word_embedder: WordEmbedder,
    decoder_seq_embedder: SequenceEmbedder,
    context_embedder: Option<ContextEmbedder>,
}

/// Assemble the model described by `args` into a freshly reset `ctx`.
#[instrument(skip_all, fields(seed = args.run.random_seed))]
pub fn build_model(mappings: &Mappings, args: &Arguments, ctx: &mut GraphContext) -> Result<Model> {
    check_model_args(args)?;

    let model_args = &args.model;
    let basic = &model_args.basic;
    let encdec = &model_args.encdec;

    ctx.reset(args.run.random_seed);
    let keep_prob = ctx.scoped("GlobalDropout", |ctx| ctx.keep_prob(args.run.test, basic.dropout));

    let vocab = &mappings.vocab;
    let pad = vocab.to_ind(markers::PAD);

    let (word_embeddings, context_word_embeddings) = match &basic.pretrained_wordvec {
        Some(path) => {
            let words = vocab.load_embeddings(path, basic.word_embed_size, ctx.rng())?;
            let context = if encdec.context_enabled() {
                Some(mappings.kb_vocab.load_embeddings(path, basic.word_embed_size, ctx.rng())?)
            } else {
                None
            };
            (Some(words), context)
        }
        None => (None, None),
    };

    let encoder_word_embedder = ctx.scoped("EncoderWordEmbedder", |ctx| {
        WordEmbedder::new(ctx, vocab.size(), basic.word_embed_size, word_embeddings.as_ref(), pad)
    })?;
    let decoder_word_embedder = ctx.scoped("DecoderWordEmbedder", |ctx| {
        WordEmbedder::new(ctx, vocab.size(), basic.word_embed_size, word_embeddings.as_ref(), pad)
    })?;

    let sampler = Sampler::from_decoding(&basic.decoding);

    let opts = SequenceEmbedderOptions {
        vocab_size: vocab.size(),
        embed_size: basic.rnn_size,
        rnn_size: basic.rnn_size,
        rnn_type: basic.rnn_type,
        num_layers: basic.num_layers,
        keep_prob,
        cnn_filter_sizes: model_args.sequence_embedder.cnn_filter_sizes.clone(),
        cnn_num_filters: model_args.sequence_embedder.cnn_num_filters,
    };
    let encoder_seq_embedder = get_sequence_embedder(basic.encoder, &opts);
    let decoder_seq_embedder = get_sequence_embedder(basic.decoder.into(), &opts);

    let context_embedder = if encdec.context_enabled() {
        let context_opts = SequenceEmbedderOptions {
            vocab_size: mappings.kb_vocab.size(),
            embed_size: model_args.context_embedder.context_size,
            ..opts.clone()
        };
        let context_word_embedder = ctx.scoped("ContextWordEmbedder", |ctx| {
            WordEmbedder::new(
                ctx,
                context_opts.vocab_size,
                context_opts.embed_size,
                context_word_embeddings.as_ref(),
                pad,
            )
        })?;
        let num_categories = mappings.cat_vocab.size();
        let category_word_embedder = ctx.scoped("CategoryWordEmbedder", |ctx| {
            WordEmbedder::new(ctx, num_categories, CATEGORY_EMBED_SIZE, None, pad)
        })?;
        let context_seq_embedder =
            get_sequence_embedder(model_args.context_embedder.context_encoder.into(), &context_opts);
        Some(ContextEmbedder::new(
            num_categories,
            context_word_embedder,
            category_word_embedder,
            context_seq_embedder,
            pad,
        ))
    } else {
        None
    };

    let parts = Parts {
        pad,
        vocab_size: vocab.size(),
        keep_prob,
        sampler,
        decoder_word_embedder,
        decoder_seq_embedder,
        context_embedder,
    };

    let needs_encdec = basic.model == Some(ModelType::Encdec)
        || model_args.ranker.ranker == Some(RankerType::Encdec);
    let model = if needs_encdec {
        let decoder = build_decoder(model_args, parts, ctx)?;
        let encoder = if encdec.num_context > 0 {
            Encoder::context(
                encoder_word_embedder,
                encoder_seq_embedder,
                encdec.num_context,
                pad,
                keep_prob,
            )
        } else {
            Encoder::basic(encoder_word_embedder, encoder_seq_embedder, pad, keep_prob)
        };
        Some(Model::EncoderDecoder(EncoderDecoder::new(
            encoder,
            decoder,
            pad,
            keep_prob,
            encdec.stateful,
        )))
    } else if basic.model == Some(ModelType::Lm) {
        let decoder = build_decoder(model_args, parts, ctx)?;
        Some(Model::LanguageModel(LanguageModel::new(decoder, pad)))
    } else {
        None
    };

    let model = apply_ranker(model, model_args)?;
    info!(
        model = model.name(),
        variables = ctx.variable_names().count(),
        parameters = ctx.num_parameters(),
        "built model"
    );
    Ok(model)
}

/// Base decoder, then the price head, then slot filling outermost.
fn build_decoder(
    model_args: &ModelArgs,
    parts: Parts,
    ctx: &mut GraphContext,
) -> Result<Box<dyn Decoder>, ConfigError> {
    let basic = &model_args.basic;
    let encdec = &model_args.encdec;
    let tied = basic.tied && basic.decoder == DecoderType::Rnn;
    let core = DecoderCore {
        output_projection: DecoderCore::output_projection(ctx, basic.rnn_size, parts.vocab_size, tied)?,
        word_embedder: parts.decoder_word_embedder,
        seq_embedder: parts.decoder_seq_embedder,
        pad: parts.pad,
        keep_prob: parts.keep_prob,
        vocab_size: parts.vocab_size,
        sampler: parts.sampler,
        sampled_loss: basic.sampled_loss,
        tied,
    };

    let mut decoder: Box<dyn Decoder> = match (basic.decoder, parts.context_embedder) {
        (DecoderType::Rnn, Some(context_embedder)) => Box::new(ContextDecoder {
            core,
            context_embedder,
            context: encdec.context.clone(),
        }),
        (DecoderType::Rnn, None) => Box::new(BasicDecoder { core }),
        (DecoderType::RnnAttn, context_embedder) => Box::new(AttentionDecoder::new(
            core,
            context_embedder,
            encdec.attention_memory.clone(),
        )?),
    };

    if encdec.predict_price {
        let hist = &model_args.price_predictor;
        let price_predictor =
            PricePredictor::new(ctx, hist.price_predictor_hidden_size, hist.input_size())?;
        decoder = Box::new(PriceDecoder {
            inner: decoder,
            price_predictor,
        });
    }

    if encdec.slot_filling {
        decoder = Box::new(SlotFillingDecoder { inner: decoder });
    }

    debug!(stack = ?decoder_stack(decoder.as_ref()), "built decoder");
    Ok(decoder)
}

/// Wrap or replace `model` according to `--ranker`.
pub fn apply_ranker(model: Option<Model>, model_args: &ModelArgs) -> Result<Model, ConfigError> {
    let ranker = model_args.ranker.ranker;
    match (ranker, model) {
        (Some(RankerType::Cheat), _) => Ok(Model::CheatRanker(CheatRanker)),
        (Some(RankerType::Ir), _) => Ok(Model::IrRanker(IrRanker)),
        (Some(RankerType::Encdec), Some(model)) => Ok(Model::EncDecRanker {
            model: Box::new(model),
            temperature: model_args.ranker.temperature,
        }),
        (Some(RankerType::Sf), Some(model)) => Ok(Model::SlotFillingRanker {
            model: Box::new(model),
        }),
        (None, Some(model)) => Ok(model),
        (Some(RankerType::Encdec | RankerType::Sf), None) | (None, None) => {
            Err(ConfigError::MissingModel)
        }
    }
}
