//! Habitat model
//!
//! Enclosures animals live in. Veterinarians may leave a comment on a habitat.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habitat {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub comment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitatCreate {
    pub name: String,
    pub description: String,
    pub image: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HabitatUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl Habitat {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            image: row.get("image")?,
            comment: row.get("comment")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &HabitatCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO habitats (name, description, image) VALUES (?1, ?2, ?3)",
            params![data.name, data.description, data.image],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::MissingAfterWrite {
            table: "habitats",
            id,
        })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM habitats WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(habitat) => Ok(Some(habitat)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM habitats ORDER BY name, id")?;
        let habitats = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(habitats)
    }

    pub fn update(conn: &Connection, id: i64, data: &HabitatUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.clone()));
        }
        if let Some(ref description) = data.description {
            updates.push(format!("description = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(description.clone()));
        }
        if let Some(ref image) = data.image {
            updates.push(format!("image = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(image.clone()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE habitats SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Set or clear the veterinarian comment
    pub fn set_comment(conn: &Connection, id: i64, comment: Option<&str>) -> DbResult<Option<Self>> {
        conn.execute(
            "UPDATE habitats SET comment = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![comment, id],
        )?;
        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM habitats WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    pub fn animal_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM animals WHERE habitat_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
