//! Vaccination model

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vaccination {
    pub id: i64,
    pub animal_id: i64,
    pub vaccine_name: String,
    pub date_administered: String,
    pub expiration_date: Option<String>,
    pub veterinarian_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaccinationCreate {
    pub animal_id: i64,
    pub vaccine_name: String,
    pub date_administered: String,
    pub expiration_date: Option<String>,
    pub veterinarian_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VaccinationDetail {
    #[serde(flatten)]
    pub vaccination: Vaccination,
    pub animal_name: String,
}

/// Vaccinated and unvaccinated animal counts for one species
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesCoverage {
    pub species: String,
    pub vaccinated: i64,
    pub not_vaccinated: i64,
}

impl Vaccination {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            animal_id: row.get("animal_id")?,
            vaccine_name: row.get("vaccine_name")?,
            date_administered: row.get("date_administered")?,
            expiration_date: row.get("expiration_date")?,
            veterinarian_id: row.get("veterinarian_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn detail_from_row(row: &Row) -> rusqlite::Result<VaccinationDetail> {
        Ok(VaccinationDetail {
            vaccination: Self::from_row(row)?,
            animal_name: row.get("animal_name")?,
        })
    }

    pub fn create(conn: &Connection, data: &VaccinationCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO vaccinations (
                animal_id, vaccine_name, date_administered, expiration_date, veterinarian_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                data.animal_id,
                data.vaccine_name,
                data.date_administered,
                data.expiration_date,
                data.veterinarian_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        let mut stmt = conn.prepare("SELECT * FROM vaccinations WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(vaccination) => Ok(vaccination),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(DbError::MissingAfterWrite {
                table: "vaccinations",
                id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Vaccinations given by one veterinarian, most recent first
    pub fn list_for_veterinarian(conn: &Connection, veterinarian_id: i64) -> DbResult<Vec<VaccinationDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT v.*, a.name AS animal_name
            FROM vaccinations v
            JOIN animals a ON a.id = v.animal_id
            WHERE v.veterinarian_id = ?1
            ORDER BY v.date_administered DESC, v.id DESC
            "#,
        )?;
        let rows = stmt
            .query_map([veterinarian_id], Self::detail_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_for_animal(conn: &Connection, animal_id: i64) -> DbResult<Vec<VaccinationDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT v.*, a.name AS animal_name
            FROM vaccinations v
            JOIN animals a ON a.id = v.animal_id
            WHERE v.animal_id = ?1
            ORDER BY v.date_administered DESC, v.id DESC
            "#,
        )?;
        let rows = stmt
            .query_map([animal_id], Self::detail_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Per species, how many animals have at least one vaccination
    pub fn coverage_by_species(conn: &Connection) -> DbResult<Vec<SpeciesCoverage>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT
                a.species AS species,
                SUM(CASE WHEN EXISTS (SELECT 1 FROM vaccinations v WHERE v.animal_id = a.id)
                    THEN 1 ELSE 0 END) AS vaccinated,
                SUM(CASE WHEN EXISTS (SELECT 1 FROM vaccinations v WHERE v.animal_id = a.id)
                    THEN 0 ELSE 1 END) AS not_vaccinated
            FROM animals a
            GROUP BY a.species
            ORDER BY a.species
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SpeciesCoverage {
                    species: row.get("species")?,
                    vaccinated: row.get("vaccinated")?,
                    not_vaccinated: row.get("not_vaccinated")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
