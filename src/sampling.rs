use crate::discrete_system::Time;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution as _, Exp1, Gamma, StandardNormal};
use serde::{Deserialize, Serialize};

/// A random variate the station draws durations and amounts from.
///
/// Continuous variates are truncated to whole units; negative draws
/// saturate at zero. Parameters are expected to have passed `validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Distribution {
    /// The event never happens. Only meaningful for pump failures.
    Never,
    Fixed(Time),
    /// Inclusive on both ends.
    Uniform { min: Time, max: Time },
    Exponential { mean: f64 },
    Normal { mean: f64, std_dev: f64 },
    Gamma { shape: f64, scale: f64 },
}

impl Distribution {
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Distribution::Never | Distribution::Fixed(_) => Ok(()),
            Distribution::Uniform { min, max } if min > max => {
                Err(format!("uniform range {}..={} is empty", min, max))
            }
            Distribution::Uniform { .. } => Ok(()),
            Distribution::Exponential { mean } if !(mean.is_finite() && mean > 0.0) => {
                Err(format!("exponential mean {} has to be positive", mean))
            }
            Distribution::Exponential { .. } => Ok(()),
            Distribution::Normal { mean, std_dev } if !(mean.is_finite() && std_dev.is_finite() && std_dev >= 0.0) => {
                Err(format!("normal({}, {}) is not a valid distribution", mean, std_dev))
            }
            Distribution::Normal { .. } => Ok(()),
            Distribution::Gamma { shape, scale } if !(shape > 0.0 && scale > 0.0 && shape.is_finite() && scale.is_finite()) => {
                Err(format!("gamma({}, {}) needs a positive shape and scale", shape, scale))
            }
            Distribution::Gamma { .. } => Ok(()),
        }
    }

    /// Every sample truncates to zero, so a loop waiting on it never lets
    /// the clock move.
    pub fn always_zero(&self) -> bool {
        match *self {
            Distribution::Fixed(value) => value == 0,
            Distribution::Uniform { max, .. } => max == 0,
            Distribution::Normal { mean, std_dev } => std_dev == 0.0 && mean < 1.0,
            Distribution::Never | Distribution::Exponential { .. } | Distribution::Gamma { .. } => false,
        }
    }
}

/// Seeded source of every random decision in a run.
pub struct Sampler {
    rng: ChaCha8Rng,
}

impl Sampler {
    pub fn new(seed: u64) -> Sampler {
        Sampler {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// `None` only for `Distribution::Never`.
    pub fn sample(&mut self, distribution: &Distribution) -> Option<Time> {
        let value: f64 = match *distribution {
            Distribution::Never => return None,
            Distribution::Fixed(value) => return Some(value),
            Distribution::Uniform { min, max } => return Some(self.rng.gen_range(min..=max)),
            Distribution::Exponential { mean } => {
                let unit: f64 = Exp1.sample(&mut self.rng);
                mean * unit
            }
            Distribution::Normal { mean, std_dev } => {
                let unit: f64 = StandardNormal.sample(&mut self.rng);
                mean + std_dev * unit
            }
            Distribution::Gamma { shape, scale } => match Gamma::new(shape, scale) {
                Ok(gamma) => gamma.sample(&mut self.rng),
                // rejected by `validate`
                Err(_) => 0.0,
            },
        };

        // float to int casts saturate, negatives become zero
        Some(value as Time)
    }

    /// A duration that is always finite; `Never` reads as zero.
    pub fn duration(&mut self, distribution: &Distribution) -> Time {
        self.sample(distribution).unwrap_or(0)
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability)
    }
}
