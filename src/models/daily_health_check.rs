//! Daily health check model
//!
//! Short rounds notes, one per animal per visit, dated the day they are taken.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyHealthCheck {
    pub id: i64,
    pub animal_id: i64,
    pub date: String,
    pub status: String,
    pub notes: String,
    pub veterinarian_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyHealthCheckCreate {
    pub animal_id: i64,
    pub status: String,
    pub notes: String,
    pub veterinarian_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyHealthCheckDetail {
    #[serde(flatten)]
    pub check: DailyHealthCheck,
    pub animal_name: String,
}

impl DailyHealthCheck {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            animal_id: row.get("animal_id")?,
            date: row.get("date")?,
            status: row.get("status")?,
            notes: row.get("notes")?,
            veterinarian_id: row.get("veterinarian_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Record a check dated `date` (callers pass today's date)
    pub fn create(conn: &Connection, data: &DailyHealthCheckCreate, date: &str) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO daily_health_checks (animal_id, date, status, notes, veterinarian_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![data.animal_id, date, data.status, data.notes, data.veterinarian_id],
        )?;

        let id = conn.last_insert_rowid();
        let mut stmt = conn.prepare("SELECT * FROM daily_health_checks WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(check) => Ok(check),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(DbError::MissingAfterWrite {
                table: "daily_health_checks",
                id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Checks one veterinarian took on a given day
    pub fn list_for_day(
        conn: &Connection,
        veterinarian_id: i64,
        date: &str,
    ) -> DbResult<Vec<DailyHealthCheckDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT c.*, a.name AS animal_name
            FROM daily_health_checks c
            JOIN animals a ON a.id = c.animal_id
            WHERE c.veterinarian_id = ?1 AND c.date = ?2
            ORDER BY c.id
            "#,
        )?;
        let rows = stmt
            .query_map(params![veterinarian_id, date], |row| {
                Ok(DailyHealthCheckDetail {
                    check: Self::from_row(row)?,
                    animal_name: row.get("animal_name")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_list_for_day_filters_date_and_vet() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO animals (name, species, age, weight) VALUES ('Tina', 'Toucan', 3, 0.5)",
                [],
            )?;
            let tina = conn.last_insert_rowid();
            let check = |vet: i64| DailyHealthCheckCreate {
                animal_id: tina,
                status: "Healthy".to_string(),
                notes: "Eating well".to_string(),
                veterinarian_id: vet,
            };

            DailyHealthCheck::create(conn, &check(2), "2024-07-01")?;
            DailyHealthCheck::create(conn, &check(2), "2024-07-02")?;
            DailyHealthCheck::create(conn, &check(5), "2024-07-02")?;

            let today = DailyHealthCheck::list_for_day(conn, 2, "2024-07-02")?;
            assert_eq!(today.len(), 1);
            assert_eq!(today[0].animal_name, "Tina");
            assert_eq!(today[0].check.date, "2024-07-02");
            Ok(())
        })
        .unwrap();
    }
}
