mod common;

use negotiator::{
    data::{
        markers,
        preprocess::tokenize,
        scenario::{Kb, Role, Schema},
        vocab::{Mappings, Vocabulary},
    },
    lexicon::{
        canonical_price,
        price_tracker::{PriceScaler, PriceTracker},
        slot_detector::SlotDetector,
        EntityForm, Token,
    },
    model::ranker::{CheatRanker, IrRanker},
};
use rand::{rngs::StdRng, SeedableRng};
use tempfile::tempdir;

use common::{kb_json, schema, write_wordvec};

fn kb(role: &str) -> Kb {
    Kb::from_dict(&schema(), &kb_json(role)).unwrap()
}

#[test]
fn parses_price_formats() {
    assert_eq!(PriceTracker::parse_price("1,200"), Some(1200.0));
    assert_eq!(PriceTracker::parse_price("1.2k"), Some(1200.0));
    assert_eq!(PriceTracker::parse_price("85.50"), Some(85.5));
    assert_eq!(PriceTracker::parse_price("twelve"), None);
    assert_eq!(PriceTracker::parse_price("1,20"), None);
}

#[test]
fn dollar_sign_is_absorbed_into_price() {
    let tracker = PriceTracker::new(None).unwrap();
    let tokens = tokenize("I can pay $1,200 tops");
    let linked = tracker.link_entity(&tokens, None, false, None);
    assert_eq!(
        linked,
        vec![
            Token::word("i"),
            Token::word("can"),
            Token::word("pay"),
            Token::Price {
                surface: "$1,200".to_string(),
                value: 1200.0
            },
            Token::word("tops"),
        ]
    );
}

#[test]
fn bare_numbers_near_listing_price_are_prices() {
    let tracker = PriceTracker::new(None).unwrap();
    let seller = kb("seller");
    let linked = tracker.link_entity(&tokenize("how about 180 for 2 of them"), Some(&seller), false, None);
    let prices: Vec<&Token> = linked.iter().filter(|t| t.is_entity()).collect();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].surface(), "180");
}

#[test]
fn scaled_prices_are_clipped() {
    let seller = kb("seller");
    assert_eq!(PriceScaler::price_range(&seller), (160.0, 200.0));
    assert_eq!(PriceScaler::scale_price(&seller, 180.0, None), 0.5);
    assert_eq!(PriceScaler::scale_price(&seller, 10_000.0, Some(4.0)), 4.0);
    assert_eq!(PriceScaler::scale_price(&seller, 0.0, Some(4.0)), -4.0);
    let scaled = PriceScaler::scale_price(&seller, 190.0, None);
    assert!((PriceScaler::unscale_price(&seller, scaled) - 190.0).abs() < 1e-9);
}

#[test]
fn canonical_price_rendering() {
    let token = Token::Price {
        surface: "$180".to_string(),
        value: 0.5,
    };
    assert_eq!(token.render(EntityForm::Canonical), canonical_price(0.5));
    assert_eq!(token.render(EntityForm::Type), markers::PRICE);
    assert_eq!(token.render(EntityForm::Surface), "$180");
    assert_eq!(canonical_price(-0.04), canonical_price(0.0));
}

#[test]
fn listing_words_become_slots() {
    let detector = SlotDetector::new(None, 0.5).unwrap();
    let seller = kb("seller");
    assert_eq!(seller.role(), Role::Seller);
    let tokens = tokenize("the shimano gears are great")
        .into_iter()
        .map(Token::word)
        .collect();
    let detected = detector.detect_slots(tokens, &seller);
    let slots: Vec<&str> = detected
        .iter()
        .filter(|t| t.is_entity())
        .map(Token::surface)
        .collect();
    assert_eq!(slots, ["shimano", "gears"]);
}

#[test]
fn slot_scores_gate_detection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scores.json");
    std::fs::write(&path, r#"{"bike": {"gears": 0.9, "shimano": 0.1}}"#).unwrap();
    let detector = SlotDetector::new(Some(&path), 0.5).unwrap();
    assert_eq!(detector.score("bike", "gears"), Some(0.9));
    let tokens = vec![Token::word("shimano"), Token::word("gears")];
    let detected = detector.detect_slots(tokens, &kb("seller"));
    assert!(!detected[0].is_entity());
    assert!(detected[1].is_entity());
}

#[test]
fn vocabulary_reserves_pad_and_unk() {
    let mut vocab = Vocabulary::with_markers();
    assert_eq!(vocab.to_ind(markers::PAD), 0);
    assert_eq!(vocab.to_word(0), Some(markers::PAD));
    let bike = vocab.add_word("bike");
    assert_eq!(vocab.to_ind("bike"), bike);
    assert_eq!(vocab.to_ind("unicycle"), vocab.to_ind(markers::UNK));
    assert_eq!(vocab.add_word("bike"), bike);
}

#[test]
fn embeddings_copy_known_rows_and_reject_wrong_widths() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vectors.txt");
    write_wordvec(&path, &[("bike", vec![0.5, -0.5]), ("unused", vec![1.0, 1.0])]);

    let mut vocab = Vocabulary::new();
    let bike = vocab.add_word("bike");
    let mut rng = StdRng::seed_from_u64(3);
    let table = vocab.load_embeddings(&path, 2, &mut rng).unwrap();
    assert_eq!(table.dim(), (vocab.size(), 2));
    assert_eq!(table.row(bike).to_vec(), vec![0.5, -0.5]);
    assert!(table.row(0).iter().all(|v| v.abs() <= 0.1));

    assert!(vocab.load_embeddings(&path, 3, &mut rng).is_err());
}

#[test]
fn baseline_rankers() {
    let candidates = vec![
        vec!["no", "thanks"],
        vec!["i", "can", "do", "180"],
        vec!["sold"],
    ];
    let target = ["i", "can", "do", "180", "then"];
    assert_eq!(CheatRanker.select(&candidates, &target), Some(1));
    assert_eq!(IrRanker.select(&candidates), Some(0));
    let empty: Vec<Vec<&str>> = Vec::new();
    assert_eq!(CheatRanker.select(&empty, &target), None);
    assert_eq!(IrRanker.select(&empty), None);
}

#[test]
fn json_loaders_name_the_file_they_failed_on() {
    let dir = tempdir().unwrap();
    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();
    let missing = dir.path().join("missing.json");

    let lexicon = format!("{:#}", PriceTracker::new(Some(&broken)).unwrap_err());
    assert!(lexicon.contains("load price lexicon") && lexicon.contains("parse"));
    let scores = format!("{:#}", SlotDetector::new(Some(&missing), 0.5).unwrap_err());
    assert!(scores.contains("load slot scores") && scores.contains("read"));
    let schema = format!("{:#}", Schema::from_path(&broken).unwrap_err());
    assert!(schema.contains("broken.json"));
    let mappings = format!("{:#}", Mappings::load(&missing).unwrap_err());
    assert!(mappings.contains("load mappings"));
}
