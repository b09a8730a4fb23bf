//! Habitat MCP Tools
//!
//! Administrators create, edit and remove habitats; veterinarians leave
//! comments on them.

use serde::Serialize;
use tracing::info;

use crate::access::{Caller, Permission};
use crate::db::Database;
use crate::models::{Animal, Habitat, HabitatCreate, HabitatUpdate};

use super::animals::AnimalSummary;
use super::{authorize, ToolResult};

/// Habitat summary for listing
#[derive(Debug, Serialize)]
pub struct HabitatSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub comment: Option<String>,
    pub animal_count: i64,
}

/// Response for list_habitats
#[derive(Debug, Serialize)]
pub struct ListHabitatsResponse {
    pub habitats: Vec<HabitatSummary>,
    pub total: usize,
}

/// Response for delete_habitat when animals still live there
#[derive(Debug, Serialize)]
pub struct DeleteHabitatBlockedResponse {
    pub error: String,
    pub animals: Vec<AnimalSummary>,
    pub recommendation: String,
}

/// Response for successful delete_habitat
#[derive(Debug, Serialize)]
pub struct DeleteHabitatSuccessResponse {
    pub success: bool,
    pub deleted_id: i64,
}

// ============================================================================
// Tool Functions
// ============================================================================

/// Create a habitat
pub fn add_habitat(db: &Database, caller: &Caller, data: HabitatCreate) -> ToolResult<Habitat> {
    authorize(caller, Permission::ManageHabitats)?;

    let name = data.name.trim();
    if name.is_empty() {
        return Err("Habitat name cannot be empty".into());
    }

    let data = HabitatCreate {
        name: name.to_string(),
        ..data
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let habitat = Habitat::create(&conn, &data)
        .map_err(|e| format!("Failed to create habitat: {}", e))?;

    info!(id = habitat.id, name = %habitat.name, "Habitat added");

    Ok(habitat)
}

/// List habitats with their animal counts
pub fn list_habitats(db: &Database, caller: &Caller) -> ToolResult<ListHabitatsResponse> {
    authorize(caller, Permission::ViewAnimals)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let habitats = Habitat::list(&conn)
        .map_err(|e| format!("Failed to list habitats: {}", e))?;

    let mut summaries = Vec::with_capacity(habitats.len());
    for habitat in habitats {
        let animal_count = Habitat::animal_count(&conn, habitat.id)
            .map_err(|e| format!("Failed to count animals: {}", e))?;
        summaries.push(HabitatSummary {
            id: habitat.id,
            name: habitat.name,
            description: habitat.description,
            comment: habitat.comment,
            animal_count,
        });
    }

    let total = summaries.len();
    Ok(ListHabitatsResponse { habitats: summaries, total })
}

/// Edit a habitat's name, description or image
pub fn update_habitat(db: &Database, caller: &Caller, id: i64, data: HabitatUpdate) -> ToolResult<Habitat> {
    authorize(caller, Permission::ManageHabitats)?;

    if matches!(data.name.as_deref(), Some(name) if name.trim().is_empty()) {
        return Err("Habitat name cannot be empty".into());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let habitat = Habitat::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update habitat: {}", e))?
        .ok_or_else(|| format!("Habitat not found with id: {}", id))?;

    info!(id, name = %habitat.name, "Habitat updated");

    Ok(habitat)
}

/// Set or clear the veterinarian comment on a habitat
pub fn comment_habitat(db: &Database, caller: &Caller, id: i64, comment: Option<&str>) -> ToolResult<Habitat> {
    authorize(caller, Permission::CommentHabitat)?;

    let comment = comment.map(str::trim).filter(|c| !c.is_empty());

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let habitat = Habitat::set_comment(&conn, id, comment)
        .map_err(|e| format!("Failed to comment on habitat: {}", e))?
        .ok_or_else(|| format!("Habitat not found with id: {}", id))?;

    info!(id, cleared = comment.is_none(), "Habitat comment set");

    Ok(habitat)
}

/// Delete a habitat. Blocked while animals still live there.
pub fn delete_habitat(
    db: &Database,
    caller: &Caller,
    id: i64,
) -> ToolResult<Result<DeleteHabitatSuccessResponse, DeleteHabitatBlockedResponse>> {
    authorize(caller, Permission::ManageHabitats)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let habitat = Habitat::get_by_id(&conn, id)
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| format!("Habitat not found with id: {}", id))?;

    let residents = Animal::list(&conn, Some(id))
        .map_err(|e| format!("Failed to list animals: {}", e))?;

    if !residents.is_empty() {
        return Ok(Err(DeleteHabitatBlockedResponse {
            error: format!(
                "Habitat '{}' still has {} animal(s) assigned",
                habitat.name,
                residents.len()
            ),
            animals: residents.iter().map(AnimalSummary::from).collect(),
            recommendation: "Move these animals to another habitat (move_animal) before deleting.".to_string(),
        }));
    }

    Habitat::delete(&conn, id)
        .map_err(|e| format!("Failed to delete habitat: {}", e))?;

    info!(id, name = %habitat.name, "Habitat deleted");

    Ok(Ok(DeleteHabitatSuccessResponse { success: true, deleted_id: id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::models::AnimalCreate;
    use crate::tools::ToolError;

    fn admin() -> Caller {
        Caller::new(Some(1), Role::Administrator)
    }

    fn vet() -> Caller {
        Caller::new(Some(2), Role::Veterinarian)
    }

    fn rainforest() -> HabitatCreate {
        HabitatCreate {
            name: "Rainforest".to_string(),
            description: "Dense tropical forest".to_string(),
            image: "rainforest.jpg".to_string(),
        }
    }

    #[test]
    fn test_only_admins_manage_habitats() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(add_habitat(&db, &vet(), rainforest()), Err(ToolError::Denied(_))));
        let habitat = add_habitat(&db, &admin(), rainforest()).unwrap();
        assert!(matches!(delete_habitat(&db, &vet(), habitat.id), Err(ToolError::Denied(_))));
    }

    #[test]
    fn test_vet_comment() {
        let db = Database::in_memory().unwrap();
        let habitat = add_habitat(&db, &admin(), rainforest()).unwrap();

        let commented = comment_habitat(&db, &vet(), habitat.id, Some(" Humidity too low ")).unwrap();
        assert_eq!(commented.comment.as_deref(), Some("Humidity too low"));

        let cleared = comment_habitat(&db, &vet(), habitat.id, Some("")).unwrap();
        assert_eq!(cleared.comment, None);

        assert!(matches!(
            comment_habitat(&db, &admin(), habitat.id, Some("x")),
            Err(ToolError::Denied(_))
        ));
    }

    #[test]
    fn test_delete_blocked_while_occupied() {
        let db = Database::in_memory().unwrap();
        let habitat = add_habitat(&db, &admin(), rainforest()).unwrap();
        let tina = db
            .with_conn(|conn| {
                Animal::create(
                    conn,
                    &AnimalCreate {
                        name: "Tina".to_string(),
                        species: "Toucan".to_string(),
                        image: String::new(),
                        status: "Healthy".to_string(),
                        age: 3.0,
                        weight: 0.5,
                        activity_level: "Medium".to_string(),
                        dietary_needs: None,
                        habitat_id: Some(habitat.id),
                    },
                )
            })
            .unwrap();

        let listed = list_habitats(&db, &admin()).unwrap();
        assert_eq!(listed.habitats[0].animal_count, 1);

        let blocked = delete_habitat(&db, &admin(), habitat.id).unwrap().unwrap_err();
        assert_eq!(blocked.animals.len(), 1);
        assert_eq!(blocked.animals[0].name, "Tina");

        db.with_conn(|conn| Animal::set_habitat(conn, tina.id, None)).unwrap();
        let deleted = delete_habitat(&db, &admin(), habitat.id).unwrap().unwrap();
        assert_eq!(deleted.deleted_id, habitat.id);
    }

    #[test]
    fn test_update_rejects_empty_name() {
        let db = Database::in_memory().unwrap();
        let habitat = add_habitat(&db, &admin(), rainforest()).unwrap();
        let update = HabitatUpdate { name: Some(" ".to_string()), ..Default::default() };
        assert!(update_habitat(&db, &admin(), habitat.id, update).is_err());
        assert!(update_habitat(&db, &admin(), habitat.id + 1, HabitatUpdate::default()).is_err());
    }
}
