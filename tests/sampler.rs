use negotiator::model::sampler::Sampler;
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

#[test]
fn zero_temperature_is_argmax() {
    let mut rng = StdRng::seed_from_u64(0);
    let greedy = Sampler::new(0.0);
    assert_eq!(greedy.sample(&[0.1, 2.0, -1.0], &mut rng), Some(1));
    assert_eq!(greedy.sample(&[f32::NAN, 0.5, 0.2], &mut rng), Some(1));
}

#[test]
fn no_numeric_logits_yields_nothing() {
    let mut rng = StdRng::seed_from_u64(0);
    for sampler in [Sampler::new(0.0), Sampler::new(1.0)] {
        assert_eq!(sampler.sample(&[], &mut rng), None);
        assert_eq!(sampler.sample(&[f32::NAN, f32::NAN], &mut rng), None);
    }
}

#[test]
fn nan_logits_are_never_drawn() {
    let mut rng = StdRng::seed_from_u64(3);
    let sampler = Sampler::new(1.0);
    for _ in 0..200 {
        assert_eq!(sampler.sample(&[f32::NAN, 0.0, f32::NAN], &mut rng), Some(1));
    }
}

#[test]
fn seeded_draws_repeat() {
    let sampler = Sampler::new(0.8);
    let logits = [0.2, 0.4, 0.1, 0.3];
    let draw = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..32)
            .map(|_| sampler.sample(&logits, &mut rng).unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(draw(11), draw(11));
    assert!(draw(11).iter().any(|&i| i != draw(11)[0]));
}

#[test]
fn dominant_logit_wins_at_low_temperature() {
    let mut rng = StdRng::seed_from_u64(5);
    let sampler = Sampler::new(0.1);
    for _ in 0..50 {
        assert_eq!(sampler.sample(&[0.0, 10.0, 1.0], &mut rng), Some(1));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn draws_stay_in_range(
        logits in prop::collection::vec(-20.0f32..20.0, 1..12),
        temperature in 0.0f64..3.0,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let picked = Sampler::new(temperature).sample(&logits, &mut rng);
        prop_assert!(matches!(picked, Some(i) if i < logits.len()));
    }
}
