use std::fmt;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct LabeledScore {
    pub label: String,
    pub probability: f32,
}

impl fmt::Display for LabeledScore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({:.1}%)", self.label, self.probability * 100.0)
    }
}

/// Pairs each probability with the label of the same index and keeps the
/// `k` best, highest first.
///
/// Only indices present in both `probabilities` and `labels` are paired: the
/// excess of the longer side is ignored. NaN scores rank below every
/// number. Ties keep no particular order.
pub fn top_k(
    probabilities: &[f32],
    labels: &[impl AsRef<str>],
    k: usize,
) -> Result<Vec<LabeledScore>> {
    let paired = probabilities.len().min(labels.len());
    if paired < k {
        return Err(Error::NotEnoughClasses { found: paired, required: k });
    }
    let mut scores: Vec<LabeledScore> = probabilities
        .iter()
        .zip(labels)
        .map(|(&probability, label)| LabeledScore {
            label: label.as_ref().to_string(),
            probability,
        })
        .collect();
    scores.sort_by(|a, b| {
        let nan = a.probability.is_nan().cmp(&b.probability.is_nan());
        nan.then_with(|| b.probability.total_cmp(&a.probability))
    });
    scores.truncate(k);
    Ok(scores)
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    const ANIMALS: [&str; 6] = ["cat", "dog", "bird", "fish", "tree", "rock"];

    #[test]
    fn dog_first() {
        let ranked = top_k(&[0.1, 0.7, 0.05, 0.05, 0.05, 0.05], &ANIMALS, 5).unwrap();
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0], LabeledScore { label: "dog".into(), probability: 0.7 });
        assert_eq!(ranked[1], LabeledScore { label: "cat".into(), probability: 0.1 });
        for tie in &ranked[2..] {
            assert_eq!(tie.probability, 0.05);
            assert!(["bird", "fish", "tree", "rock"].contains(&&*tie.label));
        }
    }

    #[test]
    fn longer_probabilities_are_truncated() {
        let mut probabilities = vec![0.0f32; 1008];
        probabilities[1007] = 1.0;
        probabilities[1000] = 0.5;
        let labels: Vec<String> = (0..1001).map(|i| format!("class {i}")).collect();
        let ranked = top_k(&probabilities, &labels, 5).unwrap();
        assert_eq!(ranked[0].label, "class 1000");
        assert!(ranked.iter().all(|s| s.probability < 1.0));
    }

    #[test]
    fn longer_labels_are_truncated() {
        let ranked = top_k(&[0.2, 0.2, 0.2, 0.2, 0.2], &ANIMALS, 5).unwrap();
        assert!(ranked.iter().all(|s| s.label != "rock"));
    }

    #[test]
    fn not_enough_labels() {
        let err = top_k(&[0.1; 10], &["a", "b", "c"], 5).unwrap_err();
        assert!(matches!(err, Error::NotEnoughClasses { found: 3, required: 5 }));
    }

    #[test]
    fn not_enough_probabilities() {
        let err = top_k(&[0.5, 0.5], &ANIMALS, 5).unwrap_err();
        assert!(matches!(err, Error::NotEnoughClasses { found: 2, required: 5 }));
    }

    #[test]
    fn nan_ranks_last() {
        let ranked = top_k(&[0.1, f32::NAN, 0.3, 0.2, -f32::NAN, 0.9], &ANIMALS, 5).unwrap();
        assert_eq!(ranked.len(), 5);
        let labels: Vec<&str> = ranked.iter().map(|s| &*s.label).collect();
        assert_eq!(&labels[..4], &["rock", "bird", "fish", "cat"]);
        assert!(ranked[4].probability.is_nan());
    }

    #[test]
    fn display_as_percent() {
        let score = LabeledScore { label: "military uniform".into(), probability: 0.8321 };
        assert_eq!(score.to_string(), "military uniform (83.2%)");
        let score = LabeledScore { label: "suit".into(), probability: 0.05 };
        assert_eq!(score.to_string(), "suit (5.0%)");
    }

    proptest! {
        #[test]
        fn ranked_descending_and_bounded(
            probabilities in proptest::collection::vec(0f32..1.0, 0..40),
            labels in 0usize..40,
            k in 1usize..8,
        ) {
            let labels: Vec<String> = (0..labels).map(|i| i.to_string()).collect();
            let paired = probabilities.len().min(labels.len());
            match top_k(&probabilities, &labels, k) {
                Ok(ranked) => {
                    prop_assert!(paired >= k);
                    prop_assert_eq!(ranked.len(), k);
                    for pair in ranked.windows(2) {
                        prop_assert!(pair[0].probability >= pair[1].probability);
                    }
                    for score in &ranked {
                        let ix: usize = score.label.parse().unwrap();
                        prop_assert!(ix < paired);
                        prop_assert_eq!(probabilities[ix], score.probability);
                    }
                }
                Err(Error::NotEnoughClasses { found, required }) => {
                    prop_assert!(paired < k);
                    prop_assert_eq!((found, required), (paired, k));
                }
                Err(e) => prop_assert!(false, "unexpected error {}", e),
            }
        }
    }
}
