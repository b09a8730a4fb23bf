//! Health record model
//!
//! A veterinarian's visit report: what the animal ate, how much, and any
//! clinical findings.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: i64,
    pub animal_id: i64,
    /// YYYY-MM-DD
    pub date: String,
    pub status: String,
    pub food: String,
    /// Grams
    pub quantity: f64,
    pub details: Option<String>,
    pub weight: Option<f64>,
    pub temperature: Option<f64>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub medications: Option<String>,
    pub follow_up_date: Option<String>,
    pub veterinarian_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthRecordCreate {
    pub animal_id: i64,
    pub date: String,
    pub status: String,
    pub food: String,
    pub quantity: f64,
    pub details: Option<String>,
    pub weight: Option<f64>,
    pub temperature: Option<f64>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub medications: Option<String>,
    pub follow_up_date: Option<String>,
    pub veterinarian_id: i64,
}

/// Health record joined with the animal's name
#[derive(Debug, Clone, Serialize)]
pub struct HealthRecordDetail {
    #[serde(flatten)]
    pub record: HealthRecord,
    pub animal_name: String,
}

impl HealthRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            animal_id: row.get("animal_id")?,
            date: row.get("date")?,
            status: row.get("status")?,
            food: row.get("food")?,
            quantity: row.get("quantity")?,
            details: row.get("details")?,
            weight: row.get("weight")?,
            temperature: row.get("temperature")?,
            symptoms: row.get("symptoms")?,
            diagnosis: row.get("diagnosis")?,
            treatment: row.get("treatment")?,
            medications: row.get("medications")?,
            follow_up_date: row.get("follow_up_date")?,
            veterinarian_id: row.get("veterinarian_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn detail_from_row(row: &Row) -> rusqlite::Result<HealthRecordDetail> {
        Ok(HealthRecordDetail {
            record: Self::from_row(row)?,
            animal_name: row.get("animal_name")?,
        })
    }

    pub fn create(conn: &Connection, data: &HealthRecordCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO health_records (
                animal_id, date, status, food, quantity, details, weight,
                temperature, symptoms, diagnosis, treatment, medications,
                follow_up_date, veterinarian_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                data.animal_id,
                data.date,
                data.status,
                data.food,
                data.quantity,
                data.details,
                data.weight,
                data.temperature,
                data.symptoms,
                data.diagnosis,
                data.treatment,
                data.medications,
                data.follow_up_date,
                data.veterinarian_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::MissingAfterWrite {
            table: "health_records",
            id,
        })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM health_records WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Records written by one veterinarian, newest first
    pub fn list_for_veterinarian(
        conn: &Connection,
        veterinarian_id: i64,
        limit: u32,
    ) -> DbResult<Vec<HealthRecordDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT hr.*, a.name AS animal_name
            FROM health_records hr
            JOIN animals a ON a.id = hr.animal_id
            WHERE hr.veterinarian_id = ?1
            ORDER BY hr.date DESC, hr.id DESC
            LIMIT ?2
            "#,
        )?;
        let records = stmt
            .query_map(params![veterinarian_id, limit], Self::detail_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Full history of one animal, newest first
    pub fn list_for_animal(conn: &Connection, animal_id: i64) -> DbResult<Vec<HealthRecordDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT hr.*, a.name AS animal_name
            FROM health_records hr
            JOIN animals a ON a.id = hr.animal_id
            WHERE hr.animal_id = ?1
            ORDER BY hr.date DESC, hr.id DESC
            "#,
        )?;
        let records = stmt
            .query_map([animal_id], Self::detail_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn record(animal_id: i64, date: &str, vet: i64) -> HealthRecordCreate {
        HealthRecordCreate {
            animal_id,
            date: date.to_string(),
            status: "Healthy".to_string(),
            food: "Meat".to_string(),
            quantity: 7000.0,
            veterinarian_id: vet,
            ..Default::default()
        }
    }

    #[test]
    fn test_list_for_veterinarian_is_newest_first_and_limited() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO animals (name, species, age, weight) VALUES ('Leo', 'Lion', 5, 190.5)",
                [],
            )?;
            let leo = conn.last_insert_rowid();

            HealthRecord::create(conn, &record(leo, "2024-03-01", 7))?;
            HealthRecord::create(conn, &record(leo, "2024-05-01", 7))?;
            HealthRecord::create(conn, &record(leo, "2024-04-01", 7))?;
            HealthRecord::create(conn, &record(leo, "2024-06-01", 8))?;

            let mine = HealthRecord::list_for_veterinarian(conn, 7, 2)?;
            let dates: Vec<&str> = mine.iter().map(|r| r.record.date.as_str()).collect();
            assert_eq!(dates, vec!["2024-05-01", "2024-04-01"]);
            assert_eq!(mine[0].animal_name, "Leo");

            assert_eq!(HealthRecord::list_for_animal(conn, leo)?.len(), 4);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_records_follow_animal_deletion() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO animals (name, species, age, weight) VALUES ('Rex', 'Crocodile', 12, 450)",
                [],
            )?;
            let rex = conn.last_insert_rowid();
            let created = HealthRecord::create(conn, &record(rex, "2024-01-10", 1))?;

            conn.execute("DELETE FROM animals WHERE id = ?1", [rex])?;
            assert!(HealthRecord::get_by_id(conn, created.id)?.is_none());
            Ok(())
        })
        .unwrap();
    }
}
