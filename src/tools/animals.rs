//! Animal MCP Tools
//!
//! Tools for registering animals, editing their records and moving them
//! between habitats.

use serde::Serialize;
use tracing::info;

use crate::access::{Caller, Permission};
use crate::db::Database;
use crate::diet::ActivityLevel;
use crate::models::{Animal, AnimalCreate, AnimalUpdate, Habitat};

use super::{authorize, ToolResult};

/// Animal summary for listing
#[derive(Debug, Serialize)]
pub struct AnimalSummary {
    pub id: i64,
    pub name: String,
    pub species: String,
    pub status: String,
    pub habitat_id: Option<i64>,
}

impl From<&Animal> for AnimalSummary {
    fn from(animal: &Animal) -> Self {
        Self {
            id: animal.id,
            name: animal.name.clone(),
            species: animal.species.clone(),
            status: animal.status.clone(),
            habitat_id: animal.habitat_id,
        }
    }
}

/// Full animal detail
#[derive(Debug, Serialize)]
pub struct AnimalDetail {
    #[serde(flatten)]
    pub animal: Animal,
    pub habitat_name: Option<String>,
}

/// Response for list_animals
#[derive(Debug, Serialize)]
pub struct ListAnimalsResponse {
    pub animals: Vec<AnimalSummary>,
    pub total: usize,
}

/// Response for move_animal
#[derive(Debug, Serialize)]
pub struct MoveAnimalResponse {
    pub success: bool,
    pub id: i64,
    pub name: String,
    pub from_habitat_id: Option<i64>,
    pub to_habitat_id: Option<i64>,
}

/// Response for delete_animal
#[derive(Debug, Serialize)]
pub struct DeleteAnimalResponse {
    pub success: bool,
    pub deleted_id: i64,
}

fn validate_name(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("Animal {} cannot be empty", field));
    }
    Ok(())
}

fn validate_weight(weight: f64) -> Result<(), String> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err("Weight must be a positive number of kilograms".to_string());
    }
    Ok(())
}

fn validate_age(age: f64) -> Result<(), String> {
    if !age.is_finite() || age < 0.0 {
        return Err("Age must be zero or more years".to_string());
    }
    Ok(())
}

fn habitat_name(conn: &rusqlite::Connection, habitat_id: Option<i64>) -> Result<Option<String>, String> {
    match habitat_id {
        Some(id) => Ok(Habitat::get_by_id(conn, id)
            .map_err(|e| format!("Database error: {}", e))?
            .map(|h| h.name)),
        None => Ok(None),
    }
}

fn ensure_habitat(conn: &rusqlite::Connection, habitat_id: Option<i64>) -> Result<(), String> {
    if let Some(id) = habitat_id {
        let exists = Habitat::get_by_id(conn, id)
            .map_err(|e| format!("Database error: {}", e))?
            .is_some();
        if !exists {
            return Err(format!("Habitat not found with id: {}", id));
        }
    }
    Ok(())
}

// ============================================================================
// Tool Functions
// ============================================================================

/// Register a new animal
pub fn add_animal(db: &Database, caller: &Caller, mut data: AnimalCreate) -> ToolResult<AnimalDetail> {
    authorize(caller, Permission::ManageAnimals)?;

    validate_name("name", &data.name)?;
    validate_name("species", &data.species)?;
    validate_weight(data.weight)?;
    validate_age(data.age)?;

    data.name = data.name.trim().to_string();
    data.species = data.species.trim().to_string();
    if data.status.trim().is_empty() {
        data.status = "Healthy".to_string();
    }
    if data.activity_level.trim().is_empty() {
        data.activity_level = ActivityLevel::Medium.as_str().to_string();
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    ensure_habitat(&conn, data.habitat_id)?;

    let animal = Animal::create(&conn, &data)
        .map_err(|e| format!("Failed to create animal: {}", e))?;

    info!(id = animal.id, name = %animal.name, species = %animal.species, "Animal added");

    let habitat_name = habitat_name(&conn, animal.habitat_id)?;
    Ok(AnimalDetail { animal, habitat_name })
}

/// Get an animal by ID
pub fn get_animal(db: &Database, caller: &Caller, id: i64) -> ToolResult<Option<AnimalDetail>> {
    authorize(caller, Permission::ViewAnimals)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let animal = Animal::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get animal: {}", e))?;

    match animal {
        Some(animal) => {
            let habitat_name = habitat_name(&conn, animal.habitat_id)?;
            Ok(Some(AnimalDetail { animal, habitat_name }))
        }
        None => Ok(None),
    }
}

/// List animals, optionally only those in one habitat
pub fn list_animals(db: &Database, caller: &Caller, habitat_id: Option<i64>) -> ToolResult<ListAnimalsResponse> {
    authorize(caller, Permission::ViewAnimals)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let animals = Animal::list(&conn, habitat_id)
        .map_err(|e| format!("Failed to list animals: {}", e))?;

    let summaries: Vec<AnimalSummary> = animals.iter().map(AnimalSummary::from).collect();
    let total = summaries.len();

    Ok(ListAnimalsResponse { animals: summaries, total })
}

/// Update an animal's attributes
pub fn update_animal(db: &Database, caller: &Caller, id: i64, data: AnimalUpdate) -> ToolResult<AnimalDetail> {
    authorize(caller, Permission::ManageAnimals)?;

    if let Some(ref name) = data.name {
        validate_name("name", name)?;
    }
    if let Some(ref species) = data.species {
        validate_name("species", species)?;
    }
    if let Some(weight) = data.weight {
        validate_weight(weight)?;
    }
    if let Some(age) = data.age {
        validate_age(age)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = Animal::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update animal: {}", e))?
        .ok_or_else(|| format!("Animal not found with id: {}", id))?;

    info!(id, name = %updated.name, "Animal updated");

    let habitat_name = habitat_name(&conn, updated.habitat_id)?;
    Ok(AnimalDetail { animal: updated, habitat_name })
}

/// Move an animal to another habitat, or out of any habitat
pub fn move_animal(
    db: &Database,
    caller: &Caller,
    id: i64,
    habitat_id: Option<i64>,
) -> ToolResult<MoveAnimalResponse> {
    authorize(caller, Permission::ManageHabitats)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let existing = Animal::get_by_id(&conn, id)
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| format!("Animal not found with id: {}", id))?;

    ensure_habitat(&conn, habitat_id)?;

    let moved = Animal::set_habitat(&conn, id, habitat_id)
        .map_err(|e| format!("Failed to move animal: {}", e))?
        .ok_or_else(|| format!("Animal not found with id: {}", id))?;

    info!(id, from = ?existing.habitat_id, to = ?habitat_id, "Animal moved");

    Ok(MoveAnimalResponse {
        success: true,
        id: moved.id,
        name: moved.name,
        from_habitat_id: existing.habitat_id,
        to_habitat_id: moved.habitat_id,
    })
}

/// Delete an animal together with its health history
pub fn delete_animal(db: &Database, caller: &Caller, id: i64) -> ToolResult<DeleteAnimalResponse> {
    authorize(caller, Permission::ManageAnimals)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = Animal::delete(&conn, id)
        .map_err(|e| format!("Failed to delete animal: {}", e))?;

    if !deleted {
        return Err(format!("Animal not found with id: {}", id).into());
    }

    info!(id, "Animal deleted");

    Ok(DeleteAnimalResponse { success: true, deleted_id: id })
}
