//! Animal model
//!
//! An animal in the zoo's care, including the attributes that drive the
//! food recommendation and the veterinarian's stored override.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::diet::DietaryProfile;

/// An animal record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animal {
    pub id: i64,
    pub name: String,
    pub species: String,
    pub image: String,
    pub status: String,
    /// Years
    pub age: f64,
    /// Kilograms
    pub weight: f64,
    pub activity_level: String,
    pub dietary_needs: Option<String>,
    pub habitat_id: Option<i64>,
    /// Grams per day, as stored by a veterinarian
    pub recommended_food_quantity: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new animal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimalCreate {
    pub name: String,
    pub species: String,
    pub image: String,
    pub status: String,
    pub age: f64,
    pub weight: f64,
    pub activity_level: String,
    pub dietary_needs: Option<String>,
    pub habitat_id: Option<i64>,
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimalUpdate {
    pub name: Option<String>,
    pub species: Option<String>,
    pub image: Option<String>,
    pub status: Option<String>,
    pub age: Option<f64>,
    pub weight: Option<f64>,
    pub activity_level: Option<String>,
    pub dietary_needs: Option<String>,
}

/// Number of animals sharing a health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

impl Animal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            species: row.get("species")?,
            image: row.get("image")?,
            status: row.get("status")?,
            age: row.get("age")?,
            weight: row.get("weight")?,
            activity_level: row.get("activity_level")?,
            dietary_needs: row.get("dietary_needs")?,
            habitat_id: row.get("habitat_id")?,
            recommended_food_quantity: row.get("recommended_food_quantity")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Input for the recommendation engine
    pub fn dietary_profile(&self) -> DietaryProfile {
        DietaryProfile::new(
            self.species.clone(),
            self.weight,
            self.age,
            &self.activity_level,
            self.dietary_needs.as_deref(),
        )
    }

    pub fn create(conn: &Connection, data: &AnimalCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO animals (
                name, species, image, status, age, weight,
                activity_level, dietary_needs, habitat_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                data.name,
                data.species,
                data.image,
                data.status,
                data.age,
                data.weight,
                data.activity_level,
                data.dietary_needs,
                data.habitat_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::MissingAfterWrite {
            table: "animals",
            id,
        })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM animals WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(animal) => Ok(Some(animal)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List animals, optionally only those living in one habitat
    pub fn list(conn: &Connection, habitat_id: Option<i64>) -> DbResult<Vec<Self>> {
        let animals = match habitat_id {
            Some(habitat_id) => {
                let mut stmt = conn
                    .prepare("SELECT * FROM animals WHERE habitat_id = ?1 ORDER BY name, id")?;
                let rows = stmt.query_map([habitat_id], Self::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM animals ORDER BY name, id")?;
                let rows = stmt.query_map([], Self::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(animals)
    }

    pub fn update(conn: &Connection, id: i64, data: &AnimalUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.clone()));
        }
        if let Some(ref species) = data.species {
            updates.push(format!("species = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(species.clone()));
        }
        if let Some(ref image) = data.image {
            updates.push(format!("image = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(image.clone()));
        }
        if let Some(ref status) = data.status {
            updates.push(format!("status = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(status.clone()));
        }
        if let Some(age) = data.age {
            updates.push(format!("age = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(age));
        }
        if let Some(weight) = data.weight {
            updates.push(format!("weight = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(weight));
        }
        if let Some(ref activity_level) = data.activity_level {
            updates.push(format!("activity_level = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(activity_level.clone()));
        }
        if let Some(ref needs) = data.dietary_needs {
            // An empty string clears the field
            let needs = Some(needs.trim()).filter(|n| !n.is_empty()).map(String::from);
            updates.push(format!("dietary_needs = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(needs));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE animals SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Move an animal to a habitat, or out of any habitat with `None`
    pub fn set_habitat(conn: &Connection, id: i64, habitat_id: Option<i64>) -> DbResult<Option<Self>> {
        conn.execute(
            "UPDATE animals SET habitat_id = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![habitat_id, id],
        )?;
        Self::get_by_id(conn, id)
    }

    /// Store or clear the veterinarian's recommended food quantity
    pub fn set_recommended_food_quantity(
        conn: &Connection,
        id: i64,
        grams: Option<f64>,
    ) -> DbResult<Option<Self>> {
        conn.execute(
            "UPDATE animals SET recommended_food_quantity = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![grams, id],
        )?;
        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM animals WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Animal count per health status, most common first
    pub fn count_by_status(conn: &Connection) -> DbResult<Vec<StatusCount>> {
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) AS count FROM animals GROUP BY status ORDER BY count DESC, status",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok(StatusCount {
                    status: row.get("status")?,
                    count: row.get("count")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}
