// Key finding across profiles, methods and transpositions

use approx::{assert_relative_eq, relative_eq};
use proptest::prelude::*;

use chordscope_lib::theory::{
    find_key, CorrelationMethod, KeyCorrelator, Mode, PitchClass, ProfileKind, ProfilePair,
};

fn histogram(weights: &[(u8, f64)]) -> [f64; 12] {
    let mut h = [0.0; 12];
    for &(pc, w) in weights {
        h[pc as usize] += w;
    }
    h
}

fn rotate(h: &[f64; 12], shift: usize) -> [f64; 12] {
    let mut out = [0.0; 12];
    for (pc, w) in h.iter().enumerate() {
        out[(pc + shift) % 12] = *w;
    }
    out
}

#[test]
fn c_major_triad_bar() {
    // Beats sounding: C twice, E and G once
    let key = find_key(&histogram(&[(0, 2.0), (4, 1.0), (7, 1.0)]), &ProfilePair::krumhansl_kessler())
        .unwrap()
        .unwrap();
    assert_eq!((key.root, key.mode), (PitchClass::C, Mode::Major));
    assert_relative_eq!(key.score, 10.587717062686181, epsilon = 1e-9);
    assert_eq!(key.name(), "C major");
}

#[test]
fn a_minor_triad_bar() {
    let h = histogram(&[(9, 2.0), (0, 1.0), (4, 1.0)]);
    let scores = KeyCorrelator::default().scores(&h).unwrap();
    let best = scores.best();
    assert_eq!(best.name(), "A minor");
    assert_relative_eq!(best.score, 11.042586863107289, epsilon = 1e-9);

    let top = scores.top(3);
    assert_eq!(top[1].name(), "A major");
    assert_eq!(top[2].name(), "C major");
    assert!(scores.clarity() > 3.0);
}

#[test]
fn correlation_is_bounded() {
    let h = histogram(&[(0, 5.0), (2, 3.0), (4, 4.0), (7, 4.0), (11, 2.0)]);
    for kind in ProfileKind::ALL {
        let scores = KeyCorrelator::new(ProfilePair::from_kind(kind)).scores(&h).unwrap();
        for candidate in scores.iter() {
            let r = candidate.correlation();
            assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&r), "{} {}", kind.label(), r);
        }
    }
}

#[test]
fn every_profile_finds_c_major_in_its_own_table() {
    for kind in ProfileKind::ALL {
        let pair = ProfilePair::from_kind(kind);
        let key = find_key(&pair.major().0, &pair).unwrap().unwrap();
        assert_eq!((key.root, key.mode), (PitchClass::C, Mode::Major), "{}", kind.label());
        assert_relative_eq!(key.correlation(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn flat_and_silent_histograms_have_no_key() {
    let pair = ProfilePair::krumhansl_kessler();
    assert_eq!(find_key(&[0.0; 12], &pair).unwrap(), None);
    assert_eq!(find_key(&[3.0; 12], &pair).unwrap(), None);

    let weighted = KeyCorrelator::default().with_method(CorrelationMethod::WeightedSum);
    assert_eq!(weighted.best(&[1.0; 12]).unwrap(), None);
    assert!(weighted.best(&histogram(&[(0, 1.0)])).unwrap().is_some());
}

#[test]
fn negative_weight_is_rejected() {
    let mut h = [1.0; 12];
    h[3] = -0.5;
    assert!(find_key(&h, &ProfilePair::krumhansl_kessler()).is_err());
}

proptest! {
    #[test]
    fn transposition_moves_every_score(
        weights in proptest::array::uniform12(0.0f64..10.0),
        shift in 1usize..12,
    ) {
        let correlator = KeyCorrelator::default();
        let Ok(scores) = correlator.scores(&weights) else {
            return Ok(());
        };
        let shifted = correlator.scores(&rotate(&weights, shift)).unwrap();

        for candidate in scores.iter() {
            let moved = shifted.get(candidate.root.transpose(shift as i32), candidate.mode);
            prop_assert!(relative_eq!(candidate.score, moved.score, epsilon = 1e-9));
        }
    }

    #[test]
    fn scaling_does_not_change_the_key(
        weights in proptest::array::uniform12(0.0f64..10.0),
        factor in 0.1f64..100.0,
    ) {
        let pair = ProfilePair::krumhansl_kessler();
        let scaled = weights.map(|w| w * factor);
        let (Some(a), Some(b)) = (find_key(&weights, &pair).unwrap(), find_key(&scaled, &pair).unwrap()) else {
            return Ok(());
        };
        prop_assert!(relative_eq!(a.score, b.score, epsilon = 1e-6));
    }
}
