use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::SellerId;

/// Score every seller starts from, in degrees.
pub const BASE_SCORE: f64 = 36.5;

/// Score added per favorite received on any of a seller's listings.
pub const INCREMENT: f64 = 0.1;

// BASE_SCORE and INCREMENT expressed in tenths of a degree. Deriving in
// integer tenths keeps e.g. 36.5 + 3 * 0.1 equal to the literal 36.8.
const BASE_TENTHS: u64 = 365;

/// A seller's "charm temperature" (매력온도), a cosmetic reputation score.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharmTemperature(f64);

impl CharmTemperature {
    /// The floor assigned to sellers without any favorites.
    pub const fn base() -> Self {
        Self(BASE_SCORE)
    }

    /// Wraps a score computed elsewhere (e.g. by the server-side aggregate),
    /// unchanged.
    pub const fn from_value(value: f64) -> Self {
        Self(value)
    }

    /// `BASE_SCORE + INCREMENT * favorite_count`.
    pub fn from_favorite_count(favorite_count: u64) -> Self {
        Self(BASE_TENTHS.saturating_add(favorite_count) as f64 / 10.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for CharmTemperature {
    fn default() -> Self {
        Self::base()
    }
}

/// Renders as `36.5°C`: always exactly one fractional digit.
impl fmt::Display for CharmTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°C", self.0)
    }
}

/// Which path produced a score.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    /// Returned by the server-side aggregation function.
    Aggregate,
    /// Derived locally from the listing lookup and favorite count.
    Fallback,
    /// Degraded to [`BASE_SCORE`] because a lookup failed or the seller id
    /// was unusable.
    Base,
}

impl ScoreSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreSource::Aggregate => "aggregate",
            ScoreSource::Fallback => "fallback",
            ScoreSource::Base => "base",
        }
    }
}

impl fmt::Display for ScoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A computed score together with its provenance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub seller_id: SellerId,
    pub temperature: CharmTemperature,
    pub source: ScoreSource,
}

impl ScoreReport {
    pub fn new(seller_id: SellerId, temperature: CharmTemperature, source: ScoreSource) -> Self {
        Self {
            seller_id,
            temperature,
            source,
        }
    }

    pub fn base(seller_id: SellerId) -> Self {
        Self::new(seller_id, CharmTemperature::base(), ScoreSource::Base)
    }

    /// Formatted temperature, e.g. `37.2°C`.
    pub fn display(&self) -> String {
        self.temperature.to_string()
    }
}
