//! Synaptic delays, receptor types and the legality of rate synapses.

use crate::{MultiscaleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// DELAYS
// ============================================================================

/// Delay distribution (ms)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delay {
    Constant(f64),
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std: f64 },
}

impl Delay {
    /// Smallest delay the distribution can produce
    pub fn min(&self) -> Result<f64> {
        match *self {
            Self::Constant(d) => Ok(d),
            Self::Uniform { low, .. } => Ok(low),
            Self::Normal { .. } => Err(MultiscaleError::NonUniformDelay(self.to_string())),
        }
    }

    /// Largest delay the distribution can produce
    pub fn max(&self) -> Result<f64> {
        match *self {
            Self::Constant(d) => Ok(d),
            Self::Uniform { high, .. } => Ok(high),
            Self::Normal { .. } => Err(MultiscaleError::NonUniformDelay(self.to_string())),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(*self, Self::Constant(d) if d == 0.0)
    }

    /// Raise every bound below `floor` up to `floor`
    pub fn clamped(&self, floor: f64) -> Self {
        match *self {
            Self::Constant(d) => Self::Constant(d.max(floor)),
            Self::Uniform { low, high } => Self::Uniform {
                low: low.max(floor),
                high: high.max(floor),
            },
            normal => normal,
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

impl From<f64> for Delay {
    fn from(d: f64) -> Self {
        Self::Constant(d)
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(d) => write!(f, "{}", d),
            Self::Uniform { low, high } => write!(f, "uniform({}, {})", low, high),
            Self::Normal { mean, std } => write!(f, "normal({}, {})", mean, std),
        }
    }
}

// ============================================================================
// RECEPTORS
// ============================================================================

/// Synaptic receptor: a numbered port or a named target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Receptor {
    Index(i64),
    Name(String),
}

impl Default for Receptor {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl From<i64> for Receptor {
    fn from(i: i64) -> Self {
        Self::Index(i)
    }
}

impl From<&str> for Receptor {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

impl fmt::Display for Receptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Name(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// SYNAPSE CLASSES
// ============================================================================

/// Names of the backend's rate synapse models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSynapseNames {
    pub instantaneous: String,
    pub delayed: String,
}

impl Default for RateSynapseNames {
    fn default() -> Self {
        Self {
            instantaneous: "rate_connection_instantaneous".into(),
            delayed: "rate_connection_delayed".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynapseClass {
    Spiking,
    RateInstantaneous,
    RateDelayed,
    /// Rate synapse whose delay handling is chosen from the delay value
    Rate,
}

impl SynapseClass {
    /// Backend names match exactly; other rate models are classified by the
    /// `instantaneous` or `delayed` in their name.
    pub fn classify(model: &str, names: &RateSynapseNames) -> Self {
        if model == names.instantaneous {
            Self::RateInstantaneous
        } else if model == names.delayed {
            Self::RateDelayed
        } else if model.contains("rate") {
            if model.contains("instantaneous") {
                Self::RateInstantaneous
            } else if model.contains("delayed") {
                Self::RateDelayed
            } else {
                Self::Rate
            }
        } else {
            Self::Spiking
        }
    }

    pub fn is_rate(&self) -> bool {
        !matches!(self, Self::Spiking)
    }
}

/// Check a synapse model against its delay and return the model to use.
///
/// A generic rate model becomes the instantaneous one for zero delay and the
/// delayed one otherwise.
pub fn assert_synapse_model(model: &str, delay: &Delay, names: &RateSynapseNames) -> Result<String> {
    let mismatch = |reason| MultiscaleError::SynapseDelayMismatch {
        model: model.to_string(),
        delay: delay.to_string(),
        reason,
    };
    match SynapseClass::classify(model, names) {
        SynapseClass::Spiking => Ok(model.to_string()),
        SynapseClass::RateInstantaneous => {
            if delay.is_zero() {
                Ok(model.to_string())
            } else {
                Err(mismatch("instantaneous rate synapses require a delay of exactly 0"))
            }
        }
        SynapseClass::RateDelayed => {
            if delay.min()? > 0.0 {
                Ok(model.to_string())
            } else {
                Err(mismatch("delayed rate synapses require a strictly positive delay"))
            }
        }
        SynapseClass::Rate => {
            if delay.min()? < 0.0 {
                Err(mismatch("rate synapses cannot have a negative delay"))
            } else if delay.max()? == 0.0 {
                Ok(names.instantaneous.clone())
            } else {
                Ok(names.delayed.clone())
            }
        }
    }
}

/// Validate a delay for an already asserted synapse model.
///
/// Spiking delays only need to be non-negative here; raising them to the
/// kernel resolution is left to the timing rules.
pub fn assert_delay(model: &str, delay: &Delay, names: &RateSynapseNames, context: &str) -> Result<Delay> {
    let min = delay.min()?;
    let class = SynapseClass::classify(model, names);
    if class.is_rate() {
        assert_synapse_model(model, delay, names)?;
    }
    if min < 0.0 || min > delay.max()? {
        return Err(MultiscaleError::InvalidDelay {
            delay: min,
            context: context.to_string(),
        });
    }
    Ok(*delay)
}
