//! Sampling: top-p, then temperature, then a seeded draw.
//!
//! Mirrors a sampler chain built once per `generate()` call and applied to
//! the context's logits after every decode.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::Token;

/// Seed value meaning "seed from entropy"
pub const DEFAULT_SEED: u32 = 0xFFFF_FFFF;

/// Parameters for nucleus (top-p) sampling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    /// Logit divisor; `<= 0` means greedy
    pub temperature: f32,
    /// Nucleus probability mass in (0, 1]
    pub top_p: f32,
    /// `DEFAULT_SEED` draws from entropy; anything else is reproducible
    pub seed: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.95,
            seed: DEFAULT_SEED,
        }
    }
}

impl SamplingParams {
    pub fn new(temperature: f32, top_p: f32) -> Self {
        Self {
            temperature,
            top_p,
            ..Self::default()
        }
    }

    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }
}

pub struct Sampler {
    params: SamplingParams,
    rng: StdRng,
}

impl Sampler {
    pub fn new(params: SamplingParams) -> Self {
        let rng = if params.seed == DEFAULT_SEED {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(u64::from(params.seed))
        };
        Self { params, rng }
    }

    pub fn params(&self) -> &SamplingParams {
        &self.params
    }

    /// Pick the next token. `None` for empty logits.
    pub fn sample(&mut self, logits: &[f32]) -> Option<Token> {
        if logits.is_empty() {
            return None;
        }

        // Candidates sorted by logit, descending.
        let mut cands: Vec<(usize, f32)> = logits.iter().copied().enumerate().collect();
        cands.sort_by(|a, b| b.1.total_cmp(&a.1));

        // Top-p over the raw distribution, keeping at least one.
        let probs = softmax(cands.iter().map(|c| c.1));
        let top_p = self.params.top_p.clamp(f32::MIN_POSITIVE, 1.0);
        let mut cumulative = 0.0f32;
        let mut keep = cands.len();
        for (i, p) in probs.iter().enumerate() {
            cumulative += p;
            if cumulative >= top_p {
                keep = i + 1;
                break;
            }
        }
        cands.truncate(keep);

        if self.params.temperature <= 0.0 {
            return Some(cands[0].0 as Token);
        }

        let t = self.params.temperature;
        let probs = softmax(cands.iter().map(|c| c.1 / t));
        let r: f32 = self.rng.gen();
        let mut cumul = 0.0f32;
        for (&(idx, _), p) in cands.iter().zip(&probs) {
            cumul += p;
            if cumul >= r {
                return Some(idx as Token);
            }
        }
        // Rounding left r above the total mass.
        Some(cands[0].0 as Token)
    }
}

fn softmax(logits: impl Iterator<Item = f32> + Clone) -> Vec<f32> {
    let max = logits.clone().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = SamplingParams::default();
        assert_eq!(p.temperature, 0.8);
        assert_eq!(p.top_p, 0.95);
        assert_eq!(p.seed, DEFAULT_SEED);
    }

    #[test]
    fn test_dominant_token_always_wins() {
        let mut s = Sampler::new(SamplingParams::default());
        let mut logits = vec![0.0f32; 32];
        logits[17] = 50.0;
        for _ in 0..20 {
            assert_eq!(s.sample(&logits), Some(17));
        }
    }

    #[test]
    fn test_greedy_when_temperature_zero() {
        let mut s = Sampler::new(SamplingParams::new(0.0, 1.0).seed(1));
        assert_eq!(s.sample(&[0.1, 0.3, 0.2]), Some(1));
    }

    #[test]
    fn test_top_p_excludes_tail() {
        // Token 0 alone carries > 90% of the mass.
        let logits = [5.0f32, 1.0, 1.0, 1.0];
        let mut s = Sampler::new(SamplingParams::new(1.0, 0.5).seed(7));
        for _ in 0..50 {
            assert_eq!(s.sample(&logits), Some(0));
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let logits = [1.0f32, 1.0, 1.0, 1.0, 1.0];
        let mut a = Sampler::new(SamplingParams::new(1.0, 1.0).seed(42));
        let mut b = Sampler::new(SamplingParams::new(1.0, 1.0).seed(42));
        let xs: Vec<_> = (0..16).map(|_| a.sample(&logits)).collect();
        let ys: Vec<_> = (0..16).map(|_| b.sample(&logits)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_empty_logits() {
        let mut s = Sampler::new(SamplingParams::default());
        assert_eq!(s.sample(&[]), None);
    }
}
