//! Probability helpers for move selection and exploration noise.
//!
//! All randomness comes from a caller-supplied RNG so results are
//! reproducible under a fixed seed.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand_distr::Gamma;

use crate::util::bitset::BitSet;

/// Numerically stable softmax. Non-finite logits get zero mass.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits
        .iter()
        .copied()
        .filter(|x| x.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return uniform(logits.len());
    }

    let mut out: Vec<f32> = logits
        .iter()
        .map(|&x| if x.is_finite() { (x - max).exp() } else { 0.0 })
        .collect();
    normalize_or_uniform(&mut out);
    out
}

/// Sharpens or flattens a non-negative weight vector.
///
/// `temperature == 0` yields a one-hot vector on the largest weight, lowest
/// index first on ties. Positive temperatures raise each weight to
/// `1 / temperature` and renormalize. Negative or non-finite temperatures and
/// all-zero weights give a uniform distribution.
pub fn apply_temperature(weights: &[f32], temperature: f32) -> Vec<f32> {
    if weights.is_empty() {
        return Vec::new();
    }
    if !temperature.is_finite() || temperature < 0.0 {
        return uniform(weights.len());
    }
    if temperature == 0.0 {
        let mut out = vec![0.0; weights.len()];
        out[argmax(weights)] = 1.0;
        return out;
    }

    let inv_t = 1.0 / temperature;
    let mut out: Vec<f32> = weights.iter().map(|&w| w.max(0.0).powf(inv_t)).collect();
    normalize_or_uniform(&mut out);
    out
}

/// Index of the largest entry. Ties go to the lowest index.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Mixes Dirichlet(alpha) noise into `priors` in place.
///
/// `priors = (1 - epsilon) * priors + epsilon * eta`. Leaves the priors
/// untouched when the parameters are out of range.
pub fn add_dirichlet_noise(priors: &mut [f32], alpha: f32, epsilon: f32, rng: &mut impl Rng) {
    if priors.is_empty()
        || !(alpha.is_finite() && alpha > 0.0)
        || !(epsilon.is_finite() && (0.0..=1.0).contains(&epsilon))
    {
        return;
    }
    let Ok(gamma) = Gamma::new(alpha as f64, 1.0) else {
        return;
    };

    let eta: Vec<f64> = (0..priors.len()).map(|_| gamma.sample(rng)).collect();
    let sum: f64 = eta.iter().sum();
    if !(sum.is_finite() && sum > 0.0) {
        return;
    }
    for (p, x) in priors.iter_mut().zip(eta) {
        *p = (1.0 - epsilon) * *p + epsilon * (x / sum) as f32;
    }
}

/// Samples an index proportionally to `weights`.
///
/// Returns `None` when no weight is positive and finite.
pub fn sample_index(weights: &[f32], rng: &mut impl Rng) -> Option<usize> {
    let clean: Vec<f32> = weights
        .iter()
        .map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
        .collect();
    WeightedIndex::new(&clean).ok().map(|dist| dist.sample(rng))
}

/// Samples an index from `probs` restricted to the set bits of `legal`.
///
/// Falls back to a uniform pick over legal indices when the masked mass is
/// zero. Returns `None` when nothing is legal.
pub fn sample_legal(probs: &[f32], legal: &BitSet, rng: &mut impl Rng) -> Option<usize> {
    let masked: Vec<f32> = probs
        .iter()
        .enumerate()
        .map(|(i, &p)| if legal.contains(i) { p } else { 0.0 })
        .collect();
    if let Some(i) = sample_index(&masked, rng) {
        return Some(i);
    }

    let indices: Vec<usize> = legal.iter_ones().collect();
    if indices.is_empty() {
        None
    } else {
        Some(indices[rng.random_range(0..indices.len())])
    }
}

/// Keeps the `k` largest entries and renormalizes.
pub fn top_k(probs: &[f32], k: usize) -> Vec<f32> {
    if k == 0 || k >= probs.len() {
        return probs.to_vec();
    }
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));

    let mut out = vec![0.0; probs.len()];
    for &i in &order[..k] {
        out[i] = probs[i];
    }
    normalize_or_uniform(&mut out);
    out
}

/// Keeps the smallest set of largest entries whose mass reaches `p`.
pub fn nucleus(probs: &[f32], p: f32) -> Vec<f32> {
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));

    let mut out = vec![0.0; probs.len()];
    let mut mass = 0.0;
    for i in order {
        out[i] = probs[i];
        mass += probs[i];
        if mass >= p {
            break;
        }
    }
    normalize_or_uniform(&mut out);
    out
}

fn uniform(n: usize) -> Vec<f32> {
    if n == 0 {
        Vec::new()
    } else {
        vec![1.0 / n as f32; n]
    }
}

fn normalize_or_uniform(values: &mut [f32]) {
    let sum: f32 = values.iter().sum();
    if sum.is_finite() && sum > 0.0 {
        for v in values.iter_mut() {
            *v /= sum;
        }
    } else {
        let u = 1.0 / values.len().max(1) as f32;
        values.fill(u);
    }
}
