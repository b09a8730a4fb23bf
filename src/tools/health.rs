//! Health MCP Tools
//!
//! Veterinary records: visit reports, vaccinations and daily rounds checks.
//! Records are always attributed to the calling veterinarian.

use serde::Serialize;
use tracing::info;

use crate::access::{Caller, Permission};
use crate::db::Database;
use crate::models::{
    Animal, DailyHealthCheck, DailyHealthCheckCreate, DailyHealthCheckDetail, HealthRecord,
    HealthRecordCreate, HealthRecordDetail, Vaccination, VaccinationCreate, VaccinationDetail,
};

use super::{authorize, authorize_identified, parse_date, ToolResult};

/// Default number of records returned by list_health_records
pub const DEFAULT_RECORD_LIMIT: u32 = 50;

/// Response for list_health_records
#[derive(Debug, Serialize)]
pub struct ListHealthRecordsResponse {
    pub records: Vec<HealthRecordDetail>,
    pub total: usize,
}

/// Response for list_vaccinations
#[derive(Debug, Serialize)]
pub struct ListVaccinationsResponse {
    pub vaccinations: Vec<VaccinationDetail>,
    pub total: usize,
}

/// Response for list_daily_health_checks
#[derive(Debug, Serialize)]
pub struct ListDailyChecksResponse {
    pub date: String,
    pub checks: Vec<DailyHealthCheckDetail>,
    pub total: usize,
}

fn ensure_animal(conn: &rusqlite::Connection, animal_id: i64) -> Result<Animal, String> {
    Animal::get_by_id(conn, animal_id)
        .map_err(|e| format!("Database error: {}", e))?
        .ok_or_else(|| format!("Animal not found with id: {}", animal_id))
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    Ok(())
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

// ============================================================================
// Health Records
// ============================================================================

/// Write a visit report for an animal
pub fn add_health_record(db: &Database, caller: &Caller, mut data: HealthRecordCreate) -> ToolResult<HealthRecord> {
    let vet_id = authorize_identified(caller, Permission::RecordHealth)?;

    require_text("Status", &data.status)?;
    require_text("Food", &data.food)?;
    if !data.quantity.is_finite() || data.quantity < 0.0 {
        return Err("Food quantity must be zero or more grams".into());
    }
    let visit = parse_date("date", &data.date)?;
    if let Some(ref follow_up) = data.follow_up_date {
        if parse_date("follow_up_date", follow_up)? < visit {
            return Err("Follow-up date cannot be before the visit date".into());
        }
    }
    if matches!(data.weight, Some(w) if !w.is_finite() || w <= 0.0) {
        return Err("Weight must be a positive number of kilograms".into());
    }

    data.date = visit.format("%Y-%m-%d").to_string();
    data.veterinarian_id = vet_id;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let animal = ensure_animal(&conn, data.animal_id)?;

    let record = HealthRecord::create(&conn, &data)
        .map_err(|e| format!("Failed to create health record: {}", e))?;

    info!(id = record.id, animal = %animal.name, vet_id, "Health record added");

    Ok(record)
}

/// Health records for one animal, or the caller's own most recent records
pub fn list_health_records(
    db: &Database,
    caller: &Caller,
    animal_id: Option<i64>,
    limit: Option<u32>,
) -> ToolResult<ListHealthRecordsResponse> {
    let records = match animal_id {
        Some(animal_id) => {
            authorize(caller, Permission::ViewReports)?;
            let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
            ensure_animal(&conn, animal_id)?;
            HealthRecord::list_for_animal(&conn, animal_id)
                .map_err(|e| format!("Failed to list health records: {}", e))?
        }
        None => {
            let vet_id = authorize_identified(caller, Permission::RecordHealth)?;
            let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
            HealthRecord::list_for_veterinarian(&conn, vet_id, limit.unwrap_or(DEFAULT_RECORD_LIMIT))
                .map_err(|e| format!("Failed to list health records: {}", e))?
        }
    };

    let total = records.len();
    Ok(ListHealthRecordsResponse { records, total })
}

// ============================================================================
// Vaccinations
// ============================================================================

/// Record a vaccination given by the caller
pub fn add_vaccination(db: &Database, caller: &Caller, mut data: VaccinationCreate) -> ToolResult<Vaccination> {
    let vet_id = authorize_identified(caller, Permission::RecordHealth)?;

    require_text("Vaccine name", &data.vaccine_name)?;
    let administered = parse_date("date_administered", &data.date_administered)?;
    if let Some(ref expiration) = data.expiration_date {
        if parse_date("expiration_date", expiration)? < administered {
            return Err("Expiration date cannot be before the administration date".into());
        }
    }

    data.vaccine_name = data.vaccine_name.trim().to_string();
    data.date_administered = administered.format("%Y-%m-%d").to_string();
    data.veterinarian_id = vet_id;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let animal = ensure_animal(&conn, data.animal_id)?;

    let vaccination = Vaccination::create(&conn, &data)
        .map_err(|e| format!("Failed to create vaccination: {}", e))?;

    info!(
        id = vaccination.id,
        animal = %animal.name,
        vaccine = %vaccination.vaccine_name,
        "Vaccination recorded"
    );

    Ok(vaccination)
}

/// Vaccinations for one animal, or those the caller administered
pub fn list_vaccinations(db: &Database, caller: &Caller, animal_id: Option<i64>) -> ToolResult<ListVaccinationsResponse> {
    let vaccinations = match animal_id {
        Some(animal_id) => {
            authorize(caller, Permission::ViewReports)?;
            let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
            ensure_animal(&conn, animal_id)?;
            Vaccination::list_for_animal(&conn, animal_id)
                .map_err(|e| format!("Failed to list vaccinations: {}", e))?
        }
        None => {
            let vet_id = authorize_identified(caller, Permission::RecordHealth)?;
            let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
            Vaccination::list_for_veterinarian(&conn, vet_id)
                .map_err(|e| format!("Failed to list vaccinations: {}", e))?
        }
    };

    let total = vaccinations.len();
    Ok(ListVaccinationsResponse { vaccinations, total })
}

// ============================================================================
// Daily Health Checks
// ============================================================================

/// Record today's rounds check for an animal
pub fn add_daily_health_check(
    db: &Database,
    caller: &Caller,
    mut data: DailyHealthCheckCreate,
) -> ToolResult<DailyHealthCheck> {
    let vet_id = authorize_identified(caller, Permission::RecordHealth)?;

    require_text("Status", &data.status)?;
    require_text("Notes", &data.notes)?;
    data.veterinarian_id = vet_id;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let animal = ensure_animal(&conn, data.animal_id)?;

    let check = DailyHealthCheck::create(&conn, &data, &today())
        .map_err(|e| format!("Failed to create daily health check: {}", e))?;

    info!(id = check.id, animal = %animal.name, date = %check.date, "Daily health check added");

    Ok(check)
}

/// The caller's checks for a day (today when omitted)
pub fn list_daily_health_checks(
    db: &Database,
    caller: &Caller,
    date: Option<&str>,
) -> ToolResult<ListDailyChecksResponse> {
    let vet_id = authorize_identified(caller, Permission::RecordHealth)?;

    let date = match date {
        Some(date) => parse_date("date", date)?.format("%Y-%m-%d").to_string(),
        None => today(),
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let checks = DailyHealthCheck::list_for_day(&conn, vet_id, &date)
        .map_err(|e| format!("Failed to list daily health checks: {}", e))?;

    let total = checks.len();
    Ok(ListDailyChecksResponse { date, checks, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::models::AnimalCreate;
    use crate::tools::ToolError;

    fn vet(id: i64) -> Caller {
        Caller::new(Some(id), Role::Veterinarian)
    }

    fn insert_rex(db: &Database) -> i64 {
        db.with_conn(|conn| {
            Animal::create(
                conn,
                &AnimalCreate {
                    name: "Rex".to_string(),
                    species: "Crocodile".to_string(),
                    image: String::new(),
                    status: "Healthy".to_string(),
                    age: 12.0,
                    weight: 450.0,
                    activity_level: "Low".to_string(),
                    dietary_needs: None,
                    habitat_id: None,
                },
            )
        })
        .unwrap()
        .id
    }

    fn visit(animal_id: i64, date: &str) -> HealthRecordCreate {
        HealthRecordCreate {
            animal_id,
            date: date.to_string(),
            status: "Healthy".to_string(),
            food: "Fish".to_string(),
            quantity: 7200.0,
            // Overwritten with the caller's id
            veterinarian_id: 999,
            ..Default::default()
        }
    }

    #[test]
    fn test_health_record_is_attributed_to_caller() {
        let db = Database::in_memory().unwrap();
        let rex = insert_rex(&db);

        let record = add_health_record(&db, &vet(4), visit(rex, "2024-05-01")).unwrap();
        assert_eq!(record.veterinarian_id, 4);

        add_health_record(&db, &vet(4), visit(rex, "2024-06-01")).unwrap();
        add_health_record(&db, &vet(5), visit(rex, "2024-07-01")).unwrap();

        let mine = list_health_records(&db, &vet(4), None, Some(1)).unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.records[0].record.date, "2024-06-01");

        let admin = Caller::new(Some(1), Role::Administrator);
        assert_eq!(list_health_records(&db, &admin, Some(rex), None).unwrap().total, 3);
        assert!(matches!(list_health_records(&db, &admin, None, None), Err(ToolError::Denied(_))));
    }

    #[test]
    fn test_own_records_default_limit() {
        let db = Database::in_memory().unwrap();
        let rex = insert_rex(&db);

        for day in 0..(DEFAULT_RECORD_LIMIT + 5) {
            let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                + chrono::Duration::days(day as i64);
            add_health_record(&db, &vet(4), visit(rex, &date.format("%Y-%m-%d").to_string()))
                .unwrap();
        }

        let mine = list_health_records(&db, &vet(4), None, None).unwrap();
        assert_eq!(mine.total, DEFAULT_RECORD_LIMIT as usize);
        assert_eq!(mine.records[0].record.date, "2024-02-24");
    }

    #[test]
    fn test_health_record_validation() {
        let db = Database::in_memory().unwrap();
        let rex = insert_rex(&db);

        assert!(add_health_record(&db, &vet(4), visit(rex, "05/01/2024")).is_err());

        let mut early_follow_up = visit(rex, "2024-05-01");
        early_follow_up.follow_up_date = Some("2024-04-01".to_string());
        assert!(add_health_record(&db, &vet(4), early_follow_up).is_err());

        let mut no_food = visit(rex, "2024-05-01");
        no_food.food = " ".to_string();
        assert_eq!(
            add_health_record(&db, &vet(4), no_food).unwrap_err().to_string(),
            "Food cannot be empty"
        );

        assert!(add_health_record(&db, &vet(4), visit(rex + 1, "2024-05-01")).is_err());
        assert!(matches!(
            add_health_record(&db, &Caller::new(None, Role::Veterinarian), visit(rex, "2024-05-01")),
            Err(ToolError::Denied(_))
        ));
    }

    #[test]
    fn test_vaccinations() {
        let db = Database::in_memory().unwrap();
        let rex = insert_rex(&db);

        let shot = VaccinationCreate {
            animal_id: rex,
            vaccine_name: " Tetanus ".to_string(),
            date_administered: "2024-03-10".to_string(),
            expiration_date: Some("2025-03-10".to_string()),
            veterinarian_id: 0,
        };
        let given = add_vaccination(&db, &vet(6), shot.clone()).unwrap();
        assert_eq!(given.vaccine_name, "Tetanus");
        assert_eq!(given.veterinarian_id, 6);

        let expired_first = VaccinationCreate {
            expiration_date: Some("2024-01-01".to_string()),
            ..shot
        };
        assert!(add_vaccination(&db, &vet(6), expired_first).is_err());

        assert_eq!(list_vaccinations(&db, &vet(6), None).unwrap().total, 1);
        assert_eq!(list_vaccinations(&db, &vet(7), None).unwrap().total, 0);
        assert_eq!(list_vaccinations(&db, &vet(7), Some(rex)).unwrap().total, 1);
    }

    #[test]
    fn test_daily_checks_are_dated_today() {
        let db = Database::in_memory().unwrap();
        let rex = insert_rex(&db);

        let check = add_daily_health_check(
            &db,
            &vet(3),
            DailyHealthCheckCreate {
                animal_id: rex,
                status: "Healthy".to_string(),
                notes: "Basking, good appetite".to_string(),
                veterinarian_id: 0,
            },
        )
        .unwrap();
        assert_eq!(check.date, today());

        let listed = list_daily_health_checks(&db, &vet(3), None).unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.checks[0].animal_name, "Rex");

        assert_eq!(list_daily_health_checks(&db, &vet(3), Some("2000-01-01")).unwrap().total, 0);
        assert!(list_daily_health_checks(&db, &vet(3), Some("yesterday")).is_err());
    }
}
