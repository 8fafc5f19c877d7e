//! Classifier output decoding. Detector outputs are handed back untouched.
use serde::Serialize;

use crate::errors::{PrepError, PrepResult};

/// Softmax over `logits`, shifted by the largest logit so `exp` cannot
/// overflow.
///
/// NaN logits get probability 0. If some logits are `+inf` they share the
/// whole mass, and if every usable logit is `-inf` the mass is uniform over
/// them. Only an input with no non-NaN logit yields all zeros.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max.is_infinite() {
        let winners = logits.iter().filter(|&&l| l == max).count();
        return logits
            .iter()
            .map(|&l| if l == max { 1.0 / winners as f32 } else { 0.0 })
            .collect();
    }
    let exps: Vec<f32> =
        logits.iter().map(|&l| if l.is_nan() { 0.0 } else { (l - max).exp() }).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value, lowest index on ties, NaN never wins.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (ix, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, b)| v > b) {
            best = Some((ix, v));
        }
    }
    best.map(|(ix, _)| ix)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Classification {
    /// Arg-max of the logits.
    pub index: usize,
    pub probabilities: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub index: usize,
    pub label: Option<String>,
    pub probability: f32,
}

/// Softmax and arg-max of a flat logits array.
pub fn classify(logits: &[f32]) -> PrepResult<Classification> {
    let index = argmax(logits)
        .ok_or_else(|| PrepError::shape("no usable logits to classify"))?;
    Ok(Classification { index, probabilities: softmax(logits) })
}

impl Classification {
    pub fn probability(&self) -> f32 {
        self.probabilities[self.index]
    }

    /// The `k` most probable classes, most probable first. The predicted
    /// class always comes first, even when rounding made its probability
    /// equal to another one.
    pub fn top_k(&self, k: usize) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> =
            self.probabilities.iter().copied().enumerate().filter(|(_, p)| !p.is_nan()).collect();
        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then((a.0 != self.index).cmp(&(b.0 != self.index)))
                .then(a.0.cmp(&b.0))
        });
        ranked.truncate(k);
        ranked
    }

    pub fn predictions(&self, k: usize, labels: Option<&[String]>) -> Vec<Prediction> {
        self.top_k(k)
            .into_iter()
            .map(|(index, probability)| Prediction {
                index,
                label: labels.and_then(|l| l.get(index)).cloned(),
                probability,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn picks_the_max() {
        assert_eq!(classify(&[1.0, 5.0, 2.0]).unwrap().index, 1);
    }

    #[test]
    fn first_max_wins_ties() {
        let c = classify(&[3.0, 3.0, 1.0]).unwrap();
        assert_eq!(c.index, 0);
        assert_abs_diff_eq!(c.probabilities[0], c.probabilities[1]);
    }

    #[test]
    fn huge_logits_do_not_overflow() {
        let c = classify(&[1000.0, 1001.0, 999.0]).unwrap();
        assert_eq!(c.index, 1);
        assert!(c.probabilities.iter().all(|p| p.is_finite()));
        assert_abs_diff_eq!(c.probabilities.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn nan_is_never_selected() {
        assert_eq!(argmax(&[f32::NAN, 2.0, 1.0]), Some(1));
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn empty_logits_fail() {
        assert!(matches!(classify(&[]), Err(PrepError::ShapeMismatch(_))));
    }

    #[test]
    fn all_neg_infinity_is_uniform() {
        let p = softmax(&[f32::NEG_INFINITY; 4]);
        assert_eq!(p, vec![0.25; 4]);
    }

    #[test]
    fn non_finite_logits_keep_a_distribution() {
        let c = classify(&[1.0, f32::INFINITY, 2.0]).unwrap();
        assert_eq!(c.index, 1);
        assert_eq!(c.probabilities, vec![0.0, 1.0, 0.0]);

        let p = softmax(&[f32::INFINITY, 0.0, f32::INFINITY]);
        assert_eq!(p, vec![0.5, 0.0, 0.5]);

        let c = classify(&[1.0, f32::NAN, 2.0]).unwrap();
        assert_eq!(c.index, 2);
        assert_eq!(c.probabilities[1], 0.0);
        assert_abs_diff_eq!(c.probabilities.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        assert!(c.probability() > c.probabilities[0]);
    }

    #[test]
    fn predicted_class_leads_rounded_ties() {
        let c = classify(&[0.0, 1e-8]).unwrap();
        assert_eq!(c.index, 1);
        assert_eq!(c.probabilities[0], c.probabilities[1]);
        assert_eq!(c.top_k(2)[0].0, 1);
        let labels: Vec<String> = vec!["cat".into(), "dog".into()];
        assert_eq!(c.predictions(1, Some(&labels))[0].label.as_deref(), Some("dog"));
    }

    #[test]
    fn top_k_ordering() {
        let c = classify(&[0.0, 2.0, 1.0, 2.0]).unwrap();
        let top: Vec<usize> = c.top_k(3).into_iter().map(|(ix, _)| ix).collect();
        assert_eq!(top, vec![1, 3, 2]);
        assert_eq!(c.top_k(10).len(), 4);
    }

    #[test]
    fn predictions_carry_labels() {
        let labels: Vec<String> = ["dingo", "collie"].iter().map(|s| s.to_string()).collect();
        let c = classify(&[0.5, 0.1, 3.0]).unwrap();
        let p = c.predictions(2, Some(&labels));
        assert_eq!(p[0].index, 2);
        assert_eq!(p[0].label, None);
        assert_eq!(p[1].label.as_deref(), Some("dingo"));
        assert_abs_diff_eq!(p[0].probability, c.probability());
    }

    proptest! {
        #[test]
        fn probabilities_sum_to_one(logits in proptest::collection::vec(-50f32..50f32, 1..200)) {
            let c = classify(&logits).unwrap();
            let sum: f32 = c.probabilities.iter().sum();
            prop_assert!((sum - 1.0).abs() <= 1e-5, "sum {}", sum);
            prop_assert!(c.probabilities.iter().all(|&p| p <= c.probability()));
        }
    }
}
