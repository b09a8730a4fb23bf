//! Dietary recommendation module
//!
//! Computes a recommended daily food mass for an animal from its species,
//! weight, age, activity level and dietary needs.

pub mod engine;
pub mod profile;
pub mod rules;

pub use engine::{compute_recommended_food_grams, round_grams, AgeBand, RateSource, Recommendation};
pub use profile::{ActivityLevel, DietaryProfile};
pub use rules::{
    ActivityFactors, AgeRule, DietRulesError, DietaryNeedRule, RuleSet, SpeciesRates,
};
