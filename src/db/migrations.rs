//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version.
///
/// Each version's DDL and its `schema_migrations` row commit together.
pub fn run_migrations(conn: &mut Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        let tx = conn.transaction()?;
        migrate_v1(&tx)?;
        tx.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- HABITATS
        -- ============================================
        CREATE TABLE habitats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            image TEXT NOT NULL,
            comment TEXT,                        -- veterinarian's note on the habitat
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_habitats_name ON habitats(name);

        -- ============================================
        -- ANIMALS
        -- ============================================
        CREATE TABLE animals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            species TEXT NOT NULL,
            image TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'Healthy',
            age REAL NOT NULL,                   -- years
            weight REAL NOT NULL,                -- kilograms
            activity_level TEXT NOT NULL DEFAULT 'Medium',
            dietary_needs TEXT,
            habitat_id INTEGER REFERENCES habitats(id) ON DELETE SET NULL,
            recommended_food_quantity REAL,      -- grams/day, veterinarian override
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_animals_habitat ON animals(habitat_id);
        CREATE INDEX idx_animals_species ON animals(species);
        CREATE INDEX idx_animals_status ON animals(status);

        -- ============================================
        -- HEALTH RECORDS
        -- ============================================
        CREATE TABLE health_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            animal_id INTEGER NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
            date TEXT NOT NULL,                  -- ISO date
            status TEXT NOT NULL,
            food TEXT NOT NULL,
            quantity REAL NOT NULL,              -- grams
            details TEXT,
            weight REAL,                         -- kilograms
            temperature REAL,                    -- degrees Celsius
            symptoms TEXT,
            diagnosis TEXT,
            treatment TEXT,
            medications TEXT,
            follow_up_date TEXT,
            veterinarian_id INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_health_records_animal ON health_records(animal_id);
        CREATE INDEX idx_health_records_vet_date ON health_records(veterinarian_id, date);

        -- ============================================
        -- VACCINATIONS
        -- ============================================
        CREATE TABLE vaccinations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            animal_id INTEGER NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
            vaccine_name TEXT NOT NULL,
            date_administered TEXT NOT NULL,
            expiration_date TEXT,
            veterinarian_id INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_vaccinations_animal ON vaccinations(animal_id);
        CREATE INDEX idx_vaccinations_vet ON vaccinations(veterinarian_id);

        -- ============================================
        -- DAILY HEALTH CHECKS
        -- ============================================
        CREATE TABLE daily_health_checks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            animal_id INTEGER NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            notes TEXT NOT NULL,
            veterinarian_id INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_daily_checks_vet_date ON daily_health_checks(veterinarian_id, date);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_fresh_database_needs_migration() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT)",
            [],
        )
        .unwrap();
        assert!(needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        // Clashes with the last table v1 creates
        conn.execute("CREATE TABLE daily_health_checks (id INTEGER PRIMARY KEY)", [])
            .unwrap();

        assert!(run_migrations(&mut conn).is_err());

        let animals_tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'animals'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(animals_tables, 0);
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
        assert!(needs_migration(&conn).unwrap());
    }
}
