//! Recommendation rule tables
//!
//! Immutable lookup tables the engine evaluates against. The built-in
//! `RuleSet::default()` is the standard Arcadia table; a zoo can swap in its
//! own set from a JSON file without touching any call site.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::profile::ActivityLevel;

/// Rule table errors (only raised when loading a custom set)
#[derive(Debug, Error)]
pub enum DietRulesError {
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rule file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid factor for {name}: {value} (must be finite and >= 0)")]
    InvalidFactor { name: String, value: f64 },

    #[error("Species rate table contains an empty species name")]
    EmptySpeciesKey,

    #[error("Species '{0}' appears more than once in the rate table")]
    DuplicateSpecies(String),

    #[error("Juvenile age bound {juvenile_below} is above senior age bound {senior_above}")]
    InvalidAgeBounds { juvenile_below: f64, senior_above: f64 },

    #[error("Dietary need rule has an empty pattern")]
    EmptyPattern,
}

/// Where a base rate came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "species", rename_all = "lowercase")]
pub enum RateSource {
    Species(String),
    Default,
}

/// Age band an animal falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBand {
    Juvenile,
    Adult,
    Senior,
}

// ============================================================================
// Species base rates
// ============================================================================

/// Kilograms of food per kilogram of body weight per day, by species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesRates {
    /// Keyed by lowercase species name
    pub rates: BTreeMap<String, f64>,
    /// Rate for any species not in `rates`
    pub default_rate: f64,
}

impl Default for SpeciesRates {
    fn default() -> Self {
        let rates = [
            ("lion", 0.030),
            ("tiger", 0.030),
            ("elephant", 0.015),
            ("monkey", 0.050),
        ]
        .into_iter()
        .map(|(species, rate)| (species.to_string(), rate))
        .collect();

        Self {
            rates,
            default_rate: 0.020,
        }
    }
}

impl SpeciesRates {
    /// Case-insensitive exact match, falling back to the default entry
    pub fn resolve(&self, species: &str) -> (f64, RateSource) {
        let key = species.trim().to_lowercase();
        match self.rates.get(&key) {
            Some(rate) => (*rate, RateSource::Species(key)),
            None => (self.default_rate, RateSource::Default),
        }
    }

    fn normalized(self) -> Result<Self, DietRulesError> {
        let mut rates = BTreeMap::new();
        for (species, rate) in self.rates {
            let key = species.trim().to_lowercase();
            if rates.insert(key.clone(), rate).is_some() {
                return Err(DietRulesError::DuplicateSpecies(key));
            }
        }
        Ok(Self {
            rates,
            default_rate: self.default_rate,
        })
    }
}

// ============================================================================
// Age
// ============================================================================

/// Juvenile/senior multipliers. Both bounds are strict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeRule {
    pub juvenile_below: f64,
    pub juvenile_factor: f64,
    pub senior_above: f64,
    pub senior_factor: f64,
}

impl Default for AgeRule {
    fn default() -> Self {
        Self {
            juvenile_below: 1.0,
            juvenile_factor: 1.5,
            senior_above: 10.0,
            senior_factor: 0.8,
        }
    }
}

impl AgeRule {
    pub fn band(&self, age_years: f64) -> AgeBand {
        if age_years < self.juvenile_below {
            AgeBand::Juvenile
        } else if age_years > self.senior_above {
            AgeBand::Senior
        } else {
            AgeBand::Adult
        }
    }

    pub fn factor(&self, band: AgeBand) -> f64 {
        match band {
            AgeBand::Juvenile => self.juvenile_factor,
            AgeBand::Adult => 1.0,
            AgeBand::Senior => self.senior_factor,
        }
    }
}

// ============================================================================
// Activity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityFactors {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
    /// Applied to activity levels outside high/medium/low
    pub unrecognized: f64,
}

impl Default for ActivityFactors {
    fn default() -> Self {
        Self {
            high: 1.2,
            medium: 1.0,
            low: 0.8,
            unrecognized: 1.0,
        }
    }
}

impl ActivityFactors {
    pub fn factor(&self, level: ActivityLevel) -> f64 {
        match level {
            ActivityLevel::High => self.high,
            ActivityLevel::Medium => self.medium,
            ActivityLevel::Low => self.low,
            ActivityLevel::Unrecognized => self.unrecognized,
        }
    }
}

// ============================================================================
// Dietary needs
// ============================================================================

/// Substring rule on the free-text dietary needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietaryNeedRule {
    /// Lowercase substring to look for
    pub pattern: String,
    pub factor: f64,
}

impl DietaryNeedRule {
    pub fn new(pattern: &str, factor: f64) -> Self {
        Self {
            pattern: pattern.trim().to_lowercase(),
            factor,
        }
    }
}

fn default_dietary_needs() -> Vec<DietaryNeedRule> {
    vec![
        DietaryNeedRule::new("high protein", 1.1),
        DietaryNeedRule::new("low calorie", 0.9),
    ]
}

// ============================================================================
// Rule set
// ============================================================================

/// The complete, immutable rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub species: SpeciesRates,
    pub age: AgeRule,
    pub activity: ActivityFactors,
    /// Evaluated in order; the first matching pattern wins
    pub dietary_needs: Vec<DietaryNeedRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            species: SpeciesRates::default(),
            age: AgeRule::default(),
            activity: ActivityFactors::default(),
            dietary_needs: default_dietary_needs(),
        }
    }
}

impl RuleSet {
    /// Load a rule set from a JSON file.
    ///
    /// Omitted sections and fields keep their defaults. A `species.rates`
    /// object replaces the built-in species table as a whole, so a file that
    /// lists only some species leaves every other one on `default_rate`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DietRulesError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DietRulesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parse, normalize and validate a JSON rule set
    pub fn from_json(raw: &str) -> Result<Self, DietRulesError> {
        let rules: RuleSet = serde_json::from_str(raw)?;
        let rules = rules.normalized()?;
        rules.validate()?;
        Ok(rules)
    }

    /// First dietary need rule whose pattern occurs in `needs`
    pub fn match_need(&self, needs: &str) -> Option<&DietaryNeedRule> {
        let needs = needs.to_lowercase();
        self.dietary_needs
            .iter()
            .find(|rule| needs.contains(rule.pattern.as_str()))
    }

    pub fn validate(&self) -> Result<(), DietRulesError> {
        for (species, rate) in &self.species.rates {
            if species.is_empty() {
                return Err(DietRulesError::EmptySpeciesKey);
            }
            check_factor(&format!("species '{}'", species), *rate)?;
        }
        check_factor("default species rate", self.species.default_rate)?;

        check_factor("juvenile age factor", self.age.juvenile_factor)?;
        check_factor("senior age factor", self.age.senior_factor)?;
        check_factor("juvenile age bound", self.age.juvenile_below)?;
        check_factor("senior age bound", self.age.senior_above)?;
        if self.age.juvenile_below > self.age.senior_above {
            return Err(DietRulesError::InvalidAgeBounds {
                juvenile_below: self.age.juvenile_below,
                senior_above: self.age.senior_above,
            });
        }

        check_factor("high activity", self.activity.high)?;
        check_factor("medium activity", self.activity.medium)?;
        check_factor("low activity", self.activity.low)?;
        check_factor("unrecognized activity", self.activity.unrecognized)?;

        for rule in &self.dietary_needs {
            if rule.pattern.is_empty() {
                return Err(DietRulesError::EmptyPattern);
            }
            check_factor(&format!("dietary need '{}'", rule.pattern), rule.factor)?;
        }

        Ok(())
    }

    fn normalized(self) -> Result<Self, DietRulesError> {
        Ok(Self {
            species: self.species.normalized()?,
            age: self.age,
            activity: self.activity,
            dietary_needs: self
                .dietary_needs
                .into_iter()
                .map(|rule| DietaryNeedRule::new(&rule.pattern, rule.factor))
                .collect(),
        })
    }
}

fn check_factor(name: &str, value: f64) -> Result<(), DietRulesError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DietRulesError::InvalidFactor {
            name: name.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_lookup_is_case_insensitive() {
        let rates = SpeciesRates::default();
        for name in ["lion", "LION", "Lion", " Lion "] {
            let (rate, source) = rates.resolve(name);
            assert_eq!(rate, 0.030);
            assert_eq!(source, RateSource::Species("lion".to_string()));
        }
    }

    #[test]
    fn test_unknown_species_uses_default_entry() {
        let rates = SpeciesRates::default();
        assert_eq!(rates.resolve("Zebra"), (0.020, RateSource::Default));
        assert_eq!(rates.resolve(""), (0.020, RateSource::Default));
    }

    #[test]
    fn test_default_species_table() {
        let rates = SpeciesRates::default();
        assert_eq!(rates.resolve("tiger").0, 0.030);
        assert_eq!(rates.resolve("elephant").0, 0.015);
        assert_eq!(rates.resolve("monkey").0, 0.050);
    }

    #[test]
    fn test_age_band_bounds_are_strict() {
        let age = AgeRule::default();
        assert_eq!(age.band(0.0), AgeBand::Juvenile);
        assert_eq!(age.band(0.999), AgeBand::Juvenile);
        assert_eq!(age.band(1.0), AgeBand::Adult);
        assert_eq!(age.band(10.0), AgeBand::Adult);
        assert_eq!(age.band(10.001), AgeBand::Senior);
    }

    #[test]
    fn test_activity_factors() {
        let activity = ActivityFactors::default();
        assert_eq!(activity.factor(ActivityLevel::High), 1.2);
        assert_eq!(activity.factor(ActivityLevel::Medium), 1.0);
        assert_eq!(activity.factor(ActivityLevel::Low), 0.8);
        assert_eq!(activity.factor(ActivityLevel::Unrecognized), 1.0);
    }

    #[test]
    fn test_first_matching_need_wins() {
        let rules = RuleSet::default();
        let rule = rules
            .match_need("Low Calorie, but also HIGH PROTEIN")
            .map(|r| r.pattern.as_str());
        assert_eq!(rule, Some("high protein"));
        assert_eq!(rules.match_need("low calorie only").map(|r| r.factor), Some(0.9));
        assert!(rules.match_need("grain free").is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let rules = RuleSet::from_json(r#"{"species": {"rates": {"Zebra": 0.025}}}"#).unwrap();
        assert_eq!(rules.species.resolve("zebra").0, 0.025);
        // a rates object replaces the whole built-in table
        assert_eq!(rules.species.resolve("lion"), (0.020, RateSource::Default));
        assert_eq!(rules.age, AgeRule::default());
        assert_eq!(rules.dietary_needs, default_dietary_needs());
    }

    #[test]
    fn test_json_patterns_are_normalized() {
        let rules =
            RuleSet::from_json(r#"{"dietary_needs": [{"pattern": "Grain Free", "factor": 0.95}]}"#)
                .unwrap();
        assert_eq!(rules.dietary_needs[0].pattern, "grain free");
        assert!(rules.match_need("strictly GRAIN FREE").is_some());
    }

    #[test]
    fn test_validate_rejects_negative_factor() {
        let err = RuleSet::from_json(r#"{"activity": {"high": -1.0}}"#).unwrap_err();
        assert!(matches!(err, DietRulesError::InvalidFactor { .. }));
    }

    #[test]
    fn test_validate_rejects_empty_pattern() {
        let err =
            RuleSet::from_json(r#"{"dietary_needs": [{"pattern": "  ", "factor": 1.0}]}"#)
                .unwrap_err();
        assert!(matches!(err, DietRulesError::EmptyPattern));
    }

    #[test]
    fn test_validate_rejects_empty_species() {
        let err = RuleSet::from_json(r#"{"species": {"rates": {"": 0.01}}}"#).unwrap_err();
        assert!(matches!(err, DietRulesError::EmptySpeciesKey));
    }

    #[test]
    fn test_validate_rejects_inverted_age_bounds() {
        let err = RuleSet::from_json(r#"{"age": {"juvenile_below": 12.0, "senior_above": 10.0}}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            DietRulesError::InvalidAgeBounds { juvenile_below, senior_above }
                if juvenile_below == 12.0 && senior_above == 10.0
        ));

        // Equal bounds leave no adult band but are still consistent
        let rules =
            RuleSet::from_json(r#"{"age": {"juvenile_below": 5.0, "senior_above": 5.0}}"#).unwrap();
        assert_eq!(rules.age.band(4.0), AgeBand::Juvenile);
        assert_eq!(rules.age.band(5.0), AgeBand::Adult);
        assert_eq!(rules.age.band(11.0), AgeBand::Senior);
    }

    #[test]
    fn test_species_differing_only_by_case_are_rejected() {
        let err = RuleSet::from_json(r#"{"species": {"rates": {"Lion": 0.01, "lion": 0.09}}}"#)
            .unwrap_err();
        assert!(matches!(err, DietRulesError::DuplicateSpecies(ref name) if name == "lion"));

        let err = RuleSet::from_json(r#"{"species": {"rates": {"tiger": 0.03, " Tiger ": 0.03}}}"#)
            .unwrap_err();
        assert!(matches!(err, DietRulesError::DuplicateSpecies(ref name) if name == "tiger"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            RuleSet::from_json("{not json").unwrap_err(),
            DietRulesError::Parse(_)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = RuleSet::load("/nonexistent/arcadia-rules.json").unwrap_err();
        assert!(matches!(err, DietRulesError::Io { .. }));
    }

    #[test]
    fn test_default_rule_set_is_valid() {
        assert!(RuleSet::default().validate().is_ok());
    }
}
