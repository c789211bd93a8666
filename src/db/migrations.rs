//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (2)", [])?;
    }

    Ok(())
}

/// Migration v1: operator accounts and submitted intake responses
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- USERS
        -- Operators allowed to submit intake forms
        -- ============================================
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,         -- Argon2 PHC string
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- RESPONSES
        -- One row per form submission, never read back by report generation
        -- ============================================
        CREATE TABLE responses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            submitted_by TEXT,                   -- operator username

            -- Dates: ISO when parseable, NULL otherwise
            collection_date TEXT,
            report_date TEXT,

            -- Identity
            report_id INTEGER,
            patient_id INTEGER,
            patient_name TEXT NOT NULL DEFAULT '',
            patient_age_gender TEXT NOT NULL DEFAULT '',
            patient_referee TEXT NOT NULL DEFAULT '',
            patient_phone TEXT NOT NULL DEFAULT '',
            email TEXT,

            -- Vitals as entered; bmi derived at submission time
            weight REAL,                         -- kg
            height REAL,                         -- cm
            bmi REAL,
            pulse_rate TEXT NOT NULL DEFAULT '',
            blood_pressure TEXT NOT NULL DEFAULT '',
            o2_level TEXT NOT NULL DEFAULT '',
            temperature TEXT NOT NULL DEFAULT '',

            -- Questionnaire, one column per question
            vision TEXT NOT NULL DEFAULT '',
            breathing TEXT NOT NULL DEFAULT '',
            hearing TEXT NOT NULL DEFAULT '',
            skin_condition TEXT NOT NULL DEFAULT '',
            oral_health TEXT NOT NULL DEFAULT '',
            urine_color TEXT NOT NULL DEFAULT '',
            hair_loss TEXT NOT NULL DEFAULT '',
            nail_changes TEXT NOT NULL DEFAULT '',
            cataract TEXT NOT NULL DEFAULT '',
            disabilities TEXT NOT NULL DEFAULT '',

            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_responses_patient ON responses(patient_id);
        "#,
    )?;

    Ok(())
}

/// Migration v2: keep weight and height as entered next to the parsed values
fn migrate_v2(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE responses ADD COLUMN weight_raw TEXT NOT NULL DEFAULT '';
        ALTER TABLE responses ADD COLUMN height_raw TEXT NOT NULL DEFAULT '';

        UPDATE responses
        SET weight_raw = COALESCE(CAST(weight AS TEXT), ''),
            height_raw = COALESCE(CAST(height AS TEXT), '');
        "#,
    )?;

    Ok(())
}

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
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_v2_backfills_raw_measurements() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL DEFAULT (datetime('now')))",
            [],
        )
        .unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", []).unwrap();
        conn.execute("INSERT INTO responses (weight, height) VALUES (70.5, NULL)", []).unwrap();

        run_migrations(&conn).unwrap();

        let (weight_raw, height_raw): (String, String) = conn
            .query_row("SELECT weight_raw, height_raw FROM responses", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(weight_raw, "70.5");
        assert_eq!(height_raw, "");
        assert_eq!(get_schema_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_responses_table_has_questionnaire_columns() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('responses')").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        for expected in ["hair_loss", "nail_changes", "urine_color", "oral_health", "bmi", "weight_raw", "height_raw"] {
            assert!(columns.iter().any(|c| c == expected), "missing column {}", expected);
        }
    }
}
