//! Feeding MCP Tools
//!
//! Daily food recommendations from the diet rule set, and the veterinarian's
//! stored override on each animal.

use serde::Serialize;
use tracing::{debug, info};

use crate::access::{Caller, Permission};
use crate::db::Database;
use crate::diet::{DietaryProfile, Recommendation, RuleSet};
use crate::models::Animal;

use super::{authorize, ToolResult};

/// Response for recommend_food
#[derive(Debug, Serialize)]
pub struct FoodRecommendationResponse {
    pub animal_id: i64,
    pub name: String,
    pub species: String,
    /// Computed by the rule set, grams per day
    pub computed_grams: u64,
    /// Veterinarian override, grams per day
    pub stored_grams: Option<f64>,
    /// The override when present, otherwise the computed value
    pub effective_grams: f64,
    pub breakdown: Recommendation,
}

/// One row of list_food_recommendations
#[derive(Debug, Serialize)]
pub struct FoodRecommendationSummary {
    pub animal_id: i64,
    pub name: String,
    pub species: String,
    pub computed_grams: u64,
    pub stored_grams: Option<f64>,
    pub effective_grams: f64,
}

/// Response for list_food_recommendations
#[derive(Debug, Serialize)]
pub struct ListFoodRecommendationsResponse {
    pub recommendations: Vec<FoodRecommendationSummary>,
    pub total: usize,
    pub total_effective_grams: f64,
    pub overridden_count: usize,
}

/// Response for set/clear_recommended_food_quantity
#[derive(Debug, Serialize)]
pub struct SetFoodQuantityResponse {
    pub success: bool,
    pub animal_id: i64,
    pub name: String,
    pub previous_grams: Option<f64>,
    pub stored_grams: Option<f64>,
    pub computed_grams: u64,
}

fn evaluate(rules: &RuleSet, animal: &Animal) -> Recommendation {
    let recommendation = rules.evaluate(&animal.dietary_profile());
    debug!(
        animal_id = animal.id,
        species = %animal.species,
        grams = recommendation.grams,
        "Evaluated food recommendation"
    );
    recommendation
}

fn get_animal(conn: &rusqlite::Connection, id: i64) -> Result<Animal, String> {
    Animal::get_by_id(conn, id)
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| format!("Animal not found with id: {}", id))
}

// ============================================================================
// Tool Functions
// ============================================================================

/// Recommended daily food for one animal
pub fn recommend_food(
    db: &Database,
    rules: &RuleSet,
    caller: &Caller,
    animal_id: i64,
) -> ToolResult<FoodRecommendationResponse> {
    authorize(caller, Permission::ViewFeeding)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let animal = get_animal(&conn, animal_id)?;
    let breakdown = evaluate(rules, &animal);

    Ok(FoodRecommendationResponse {
        animal_id: animal.id,
        effective_grams: animal
            .recommended_food_quantity
            .unwrap_or(breakdown.grams as f64),
        computed_grams: breakdown.grams,
        stored_grams: animal.recommended_food_quantity,
        name: animal.name,
        species: animal.species,
        breakdown,
    })
}

/// Recommended daily food for every animal
pub fn list_food_recommendations(
    db: &Database,
    rules: &RuleSet,
    caller: &Caller,
) -> ToolResult<ListFoodRecommendationsResponse> {
    authorize(caller, Permission::ViewFeeding)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let animals = Animal::list(&conn, None)
        .map_err(|e| format!("Failed to list animals: {}", e))?;

    let recommendations: Vec<FoodRecommendationSummary> = animals
        .into_iter()
        .map(|animal| {
            let computed = evaluate(rules, &animal).grams;
            FoodRecommendationSummary {
                animal_id: animal.id,
                name: animal.name,
                species: animal.species,
                computed_grams: computed,
                stored_grams: animal.recommended_food_quantity,
                effective_grams: animal.recommended_food_quantity.unwrap_or(computed as f64),
            }
        })
        .collect();

    let total = recommendations.len();
    let total_effective_grams = recommendations.iter().map(|r| r.effective_grams).sum();
    let overridden_count = recommendations.iter().filter(|r| r.stored_grams.is_some()).count();

    Ok(ListFoodRecommendationsResponse {
        recommendations,
        total,
        total_effective_grams,
        overridden_count,
    })
}

/// Evaluate a profile that is not (yet) stored as an animal
pub fn preview_food_recommendation(
    rules: &RuleSet,
    caller: &Caller,
    profile: &DietaryProfile,
) -> ToolResult<Recommendation> {
    authorize(caller, Permission::ViewFeeding)?;

    if profile.species.trim().is_empty() {
        return Err("Species cannot be empty".into());
    }
    if !profile.weight_kg.is_finite() || profile.weight_kg <= 0.0 {
        return Err("Weight must be a positive number of kilograms".into());
    }
    if !profile.age_years.is_finite() || profile.age_years < 0.0 {
        return Err("Age must be zero or more years".into());
    }

    Ok(rules.evaluate(profile))
}

/// Persist a veterinarian's recommended food quantity
pub fn set_recommended_food_quantity(
    db: &Database,
    rules: &RuleSet,
    caller: &Caller,
    animal_id: i64,
    grams: f64,
) -> ToolResult<SetFoodQuantityResponse> {
    authorize(caller, Permission::OverrideFeeding)?;

    if !grams.is_finite() || grams < 0.0 {
        return Err("Recommended food quantity must be zero or more grams".into());
    }

    store_quantity(db, rules, animal_id, Some(grams))
}

/// Drop the stored override so the computed value applies again
pub fn clear_recommended_food_quantity(
    db: &Database,
    rules: &RuleSet,
    caller: &Caller,
    animal_id: i64,
) -> ToolResult<SetFoodQuantityResponse> {
    authorize(caller, Permission::OverrideFeeding)?;

    store_quantity(db, rules, animal_id, None)
}

fn store_quantity(
    db: &Database,
    rules: &RuleSet,
    animal_id: i64,
    grams: Option<f64>,
) -> ToolResult<SetFoodQuantityResponse> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let existing = get_animal(&conn, animal_id)?;

    let updated = Animal::set_recommended_food_quantity(&conn, animal_id, grams)
        .map_err(|e| format!("Failed to store food quantity: {}", e))?
        .ok_or_else(|| format!("Animal not found with id: {}", animal_id))?;

    info!(
        animal_id,
        previous = ?existing.recommended_food_quantity,
        stored = ?grams,
        "Recommended food quantity updated"
    );

    Ok(SetFoodQuantityResponse {
        success: true,
        animal_id,
        computed_grams: evaluate(rules, &updated).grams,
        previous_grams: existing.recommended_food_quantity,
        stored_grams: updated.recommended_food_quantity,
        name: updated.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::diet::DietaryNeedRule;
    use crate::models::AnimalCreate;
    use crate::tools::ToolError;

    fn vet() -> Caller {
        Caller::new(Some(2), Role::Veterinarian)
    }

    fn insert(db: &Database, name: &str, species: &str, weight: f64, age: f64, activity: &str) -> i64 {
        db.with_conn(|conn| {
            Animal::create(
                conn,
                &AnimalCreate {
                    name: name.to_string(),
                    species: species.to_string(),
                    image: String::new(),
                    status: "Healthy".to_string(),
                    age,
                    weight,
                    activity_level: activity.to_string(),
                    dietary_needs: None,
                    habitat_id: None,
                },
            )
        })
        .unwrap()
        .id
    }

    #[test]
    fn test_recommend_food() {
        let db = Database::in_memory().unwrap();
        let ella = insert(&db, "Ella", "Elephant", 4500.0, 15.0, "Medium");

        let rec = recommend_food(&db, &RuleSet::default(), &vet(), ella).unwrap();
        // 4500 * 0.015 * 0.8 = 54kg
        assert_eq!(rec.computed_grams, 54000);
        assert_eq!(rec.stored_grams, None);
        assert_eq!(rec.effective_grams, 54000.0);
        assert_eq!(rec.breakdown.age_factor, 0.8);
    }

    #[test]
    fn test_override_round_trip() {
        let db = Database::in_memory().unwrap();
        let rules = RuleSet::default();
        let leo = insert(&db, "Leo", "Lion", 190.5, 5.0, "High");

        let set = set_recommended_food_quantity(&db, &rules, &vet(), leo, 7000.0).unwrap();
        assert_eq!(set.previous_grams, None);
        assert_eq!(set.stored_grams, Some(7000.0));
        assert_eq!(set.computed_grams, 6858);

        let rec = recommend_food(&db, &rules, &vet(), leo).unwrap();
        assert_eq!(rec.effective_grams, 7000.0);
        assert_eq!(rec.computed_grams, 6858);

        let cleared = clear_recommended_food_quantity(&db, &rules, &vet(), leo).unwrap();
        assert_eq!(cleared.previous_grams, Some(7000.0));
        assert_eq!(cleared.stored_grams, None);
    }

    #[test]
    fn test_override_needs_veterinarian() {
        let db = Database::in_memory().unwrap();
        let rules = RuleSet::default();
        let leo = insert(&db, "Leo", "Lion", 190.5, 5.0, "High");

        let admin = Caller::new(Some(1), Role::Administrator);
        assert!(recommend_food(&db, &rules, &admin, leo).is_ok());
        assert!(matches!(
            set_recommended_food_quantity(&db, &rules, &admin, leo, 100.0),
            Err(ToolError::Denied(_))
        ));

        let employee = Caller::new(Some(3), Role::Employee);
        assert!(matches!(recommend_food(&db, &rules, &employee, leo), Err(ToolError::Denied(_))));
    }

    #[test]
    fn test_override_rejects_negative() {
        let db = Database::in_memory().unwrap();
        let leo = insert(&db, "Leo", "Lion", 190.5, 5.0, "High");
        let err = set_recommended_food_quantity(&db, &RuleSet::default(), &vet(), leo, -5.0).unwrap_err();
        assert_eq!(err.to_string(), "Recommended food quantity must be zero or more grams");
        assert!(set_recommended_food_quantity(&db, &RuleSet::default(), &vet(), leo, 0.0).is_ok());
        assert!(set_recommended_food_quantity(&db, &RuleSet::default(), &vet(), leo + 9, 10.0).is_err());
    }

    #[test]
    fn test_preview() {
        let rules = RuleSet::default();
        let profile = DietaryProfile::new("Monkey", 10.0, 0.5, "High", None);
        assert_eq!(preview_food_recommendation(&rules, &vet(), &profile).unwrap().grams, 900);

        let weightless = DietaryProfile::new("Monkey", 0.0, 0.5, "High", None);
        assert!(preview_food_recommendation(&rules, &vet(), &weightless).is_err());

        let visitor = Caller::new(None, Role::Visitor);
        assert!(matches!(
            preview_food_recommendation(&rules, &visitor, &profile),
            Err(ToolError::Denied(_))
        ));
    }

    #[test]
    fn test_list_uses_injected_rules() {
        let db = Database::in_memory().unwrap();
        insert(&db, "Zara", "Zebra", 300.0, 7.0, "Low");
        let sandy = insert(&db, "Sandy", "Camel", 500.0, 6.0, "Medium");

        let mut rules = RuleSet::default();
        rules.species.rates.insert("camel".to_string(), 0.01);
        rules.dietary_needs.push(DietaryNeedRule::new("pregnant", 1.3));

        set_recommended_food_quantity(&db, &rules, &vet(), sandy, 6000.0).unwrap();

        let listed = list_food_recommendations(&db, &rules, &vet()).unwrap();
        assert_eq!(listed.total, 2);
        assert_eq!(listed.overridden_count, 1);

        let sandy_row = &listed.recommendations[0];
        assert_eq!(sandy_row.name, "Sandy");
        assert_eq!(sandy_row.computed_grams, 5000);
        assert_eq!(sandy_row.effective_grams, 6000.0);

        // 300 * 0.02 * 0.8
        assert_eq!(listed.recommendations[1].computed_grams, 4800);
        assert_eq!(listed.total_effective_grams, 10800.0);
    }
}
