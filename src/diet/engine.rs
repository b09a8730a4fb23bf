//! Recommendation engine
//!
//! Base rate by species, then age, activity and dietary-need multipliers, in
//! that order, then conversion to whole grams. Pure and total: unknown
//! species or activity levels resolve to the table defaults.

use serde::Serialize;

use super::profile::DietaryProfile;
use super::rules::RuleSet;
pub use super::rules::{AgeBand, RateSource};

/// Grams per kilogram
pub const G_PER_KG: f64 = 1000.0;

/// An evaluated recommendation with every factor that went into it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Recommended daily food mass, whole grams
    pub grams: u64,
    /// Unrounded result in kilograms
    pub quantity_kg: f64,
    pub base_rate: f64,
    pub rate_source: RateSource,
    pub age_band: AgeBand,
    pub age_factor: f64,
    pub activity_factor: f64,
    pub diet_factor: f64,
    /// Pattern of the dietary need rule that applied, if any
    pub matched_need: Option<String>,
}

impl RuleSet {
    /// Evaluate a profile against this rule set
    pub fn evaluate(&self, profile: &DietaryProfile) -> Recommendation {
        let (base_rate, rate_source) = self.species.resolve(&profile.species);
        let mut quantity = profile.weight_kg * base_rate;

        let age_band = self.age.band(profile.age_years);
        let age_factor = self.age.factor(age_band);
        quantity *= age_factor;

        let activity_factor = self.activity.factor(profile.activity_level);
        quantity *= activity_factor;

        let matched = profile
            .dietary_needs
            .as_deref()
            .and_then(|needs| self.match_need(needs));
        let diet_factor = matched.map_or(1.0, |rule| rule.factor);
        quantity *= diet_factor;

        Recommendation {
            grams: round_grams(quantity * G_PER_KG),
            quantity_kg: quantity,
            base_rate,
            rate_source,
            age_band,
            age_factor,
            activity_factor,
            diet_factor,
            matched_need: matched.map(|rule| rule.pattern.clone()),
        }
    }
}

/// Recommended daily food in grams using the standard rule table
pub fn compute_recommended_food_grams(profile: &DietaryProfile) -> u64 {
    RuleSet::default().evaluate(profile).grams
}

/// Round to the nearest whole gram, halves away from zero (2500.5 -> 2501).
///
/// Negative and NaN inputs clamp to 0.
pub fn round_grams(grams: f64) -> u64 {
    let rounded = grams.round();
    if rounded.is_nan() || rounded <= 0.0 {
        0
    } else {
        rounded as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diet::rules::DietaryNeedRule;

    fn profile(species: &str, weight: f64, age: f64, activity: &str, needs: Option<&str>) -> DietaryProfile {
        DietaryProfile::new(species, weight, age, activity, needs)
    }

    #[test]
    fn test_adult_lion() {
        let p = profile("Lion", 100.0, 5.0, "Medium", None);
        assert_eq!(compute_recommended_food_grams(&p), 3000);
    }

    #[test]
    fn test_senior_elephant() {
        let p = profile("Elephant", 1000.0, 15.0, "Medium", None);
        assert_eq!(compute_recommended_food_grams(&p), 12000);
    }

    #[test]
    fn test_juvenile_active_monkey() {
        let p = profile("Monkey", 10.0, 0.5, "High", None);
        assert_eq!(compute_recommended_food_grams(&p), 900);
    }

    #[test]
    fn test_unlisted_species_low_activity_high_protein() {
        let p = profile("Zebra", 300.0, 7.0, "Low", Some("requires high protein diet"));
        assert_eq!(compute_recommended_food_grams(&p), 5280);
    }

    #[test]
    fn test_low_calorie_need() {
        // 200 * 0.02 = 4kg, * 0.9 = 3.6kg
        let p = profile("Camel", 200.0, 6.0, "medium", Some("Low Calorie"));
        assert_eq!(compute_recommended_food_grams(&p), 3600);
    }

    #[test]
    fn test_species_case_does_not_matter() {
        let grams: Vec<u64> = ["LION", "lion", "Lion"]
            .iter()
            .map(|s| compute_recommended_food_grams(&profile(s, 190.5, 5.0, "High", None)))
            .collect();
        assert_eq!(grams[0], grams[1]);
        assert_eq!(grams[1], grams[2]);
        // 190.5 * 0.03 * 1.2 = 6.858kg
        assert_eq!(grams[0], 6858);
    }

    #[test]
    fn test_age_boundaries() {
        let at = |age: f64| compute_recommended_food_grams(&profile("Zebra", 100.0, age, "medium", None));
        assert_eq!(at(1.0), 2000);
        assert_eq!(at(10.0), 2000);
        assert_eq!(at(0.999), 3000);
        assert_eq!(at(10.001), 1600);
    }

    #[test]
    fn test_unrecognized_activity_applies_no_change() {
        let medium = compute_recommended_food_grams(&profile("Tiger", 150.0, 4.0, "medium", None));
        let other = compute_recommended_food_grams(&profile("Tiger", 150.0, 4.0, "frantic", None));
        assert_eq!(medium, other);
        assert_eq!(medium, 4500);
    }

    #[test]
    fn test_unmatched_needs_apply_no_change() {
        let none = compute_recommended_food_grams(&profile("Zebra", 100.0, 5.0, "medium", None));
        let other = compute_recommended_food_grams(&profile("Zebra", 100.0, 5.0, "medium", Some("grain free")));
        assert_eq!(none, other);
    }

    #[test]
    fn test_monotonic_in_weight() {
        let mut previous = 0;
        for step in 1..=500 {
            let weight = step as f64 * 0.7;
            let grams = compute_recommended_food_grams(&profile("Monkey", weight, 12.0, "low", Some("low calorie")));
            assert!(grams >= previous, "weight {} gave {} < {}", weight, grams, previous);
            previous = grams;
        }
    }

    #[test]
    fn test_repeated_evaluation_is_identical() {
        let rules = RuleSet::default();
        let p = profile("Elephant", 4500.0, 15.0, "Medium", Some("high protein"));
        assert_eq!(rules.evaluate(&p), rules.evaluate(&p));
    }

    #[test]
    fn test_breakdown() {
        let rec = RuleSet::default().evaluate(&profile("Zebra", 300.0, 7.0, "Low", Some("requires HIGH protein diet")));
        assert_eq!(rec.rate_source, RateSource::Default);
        assert_eq!(rec.base_rate, 0.020);
        assert_eq!(rec.age_band, AgeBand::Adult);
        assert_eq!(rec.age_factor, 1.0);
        assert_eq!(rec.activity_factor, 0.8);
        assert_eq!(rec.diet_factor, 1.1);
        assert_eq!(rec.matched_need.as_deref(), Some("high protein"));
        assert!((rec.quantity_kg - 5.28).abs() < 1e-9);
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_grams(2500.5), 2501);
        assert_eq!(round_grams(2499.5), 2500);
        assert_eq!(round_grams(2500.4), 2500);
        assert_eq!(round_grams(0.5), 1);
    }

    #[test]
    fn test_round_clamps_to_zero() {
        assert_eq!(round_grams(-3.2), 0);
        assert_eq!(round_grams(f64::NAN), 0);
        assert_eq!(round_grams(0.0), 0);
    }

    #[test]
    fn test_custom_rule_set() {
        let mut rules = RuleSet::default();
        rules.species.rates.insert("zebra".to_string(), 0.025);
        rules.dietary_needs.insert(0, DietaryNeedRule::new("Pregnant", 1.25));

        let rec = rules.evaluate(&profile("Zebra", 400.0, 6.0, "medium", Some("pregnant, high protein")));
        // 400 * 0.025 = 10kg, * 1.25 = 12.5kg
        assert_eq!(rec.grams, 12500);
        assert_eq!(rec.rate_source, RateSource::Species("zebra".to_string()));
    }
}
