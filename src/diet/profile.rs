//! Dietary profile types
//!
//! The attribute set the recommendation engine works from.

use serde::{Deserialize, Serialize};

/// Activity level of an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    High,
    Medium,
    Low,
    /// Anything that is not high, medium or low. Not an error.
    Unrecognized,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::High => "high",
            ActivityLevel::Medium => "medium",
            ActivityLevel::Low => "low",
            ActivityLevel::Unrecognized => "unrecognized",
        }
    }

    /// Parse case-insensitively; unknown values map to `Unrecognized`
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => ActivityLevel::High,
            "medium" => ActivityLevel::Medium,
            "low" => ActivityLevel::Low,
            _ => ActivityLevel::Unrecognized,
        }
    }
}

/// Input to the recommendation engine.
///
/// Built transiently from a stored animal. Callers guarantee `weight_kg > 0`
/// and `age_years >= 0`; the engine does not re-validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietaryProfile {
    pub species: String,
    pub weight_kg: f64,
    pub age_years: f64,
    pub activity_level: ActivityLevel,
    pub dietary_needs: Option<String>,
}

impl DietaryProfile {
    pub fn new(
        species: impl Into<String>,
        weight_kg: f64,
        age_years: f64,
        activity_level: &str,
        dietary_needs: Option<&str>,
    ) -> Self {
        Self {
            species: species.into(),
            weight_kg,
            age_years,
            activity_level: ActivityLevel::from_str(activity_level),
            dietary_needs: dietary_needs.map(String::from),
        }
    }
}
