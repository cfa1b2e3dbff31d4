// 🗃️ SQLite Store - document-collection style table (imc_entries)
// Each record is a row keyed by its timestamp id.

use super::RecordStore;
use crate::error::StoreError;
use crate::record::{BmiCategory, Habits, Record, RiskLevel, YesNo};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }
}

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    // WAL for crash recovery (in-memory databases answer "memory")
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS imc_entries (
            id INTEGER PRIMARY KEY,
            sexo TEXT NOT NULL,
            idade INTEGER NOT NULL,
            peso REAL NOT NULL,
            altura REAL NOT NULL,
            diabetes TEXT NOT NULL,
            hipertensao TEXT NOT NULL,
            habitos TEXT NOT NULL,
            imc REAL NOT NULL,
            categoria TEXT NOT NULL,
            risco TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

impl RecordStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn submit(&self, record: &Record) -> Result<Option<usize>, StoreError> {
        let conn = self.conn.lock()?;

        conn.execute(
            "INSERT INTO imc_entries (
                id, sexo, idade, peso, altura, diabetes, hipertensao, habitos, imc, categoria, risco
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id,
                record.sex.as_str(),
                record.age,
                record.weight,
                record.height,
                record.diabetes.as_str(),
                record.hypertension.as_str(),
                record.habits.as_str(),
                record.bmi,
                record.category.as_str(),
                record.risk.as_str(),
            ],
        )?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM imc_entries", [], |row| row.get(0))?;
        Ok(Some(total as usize))
    }

    fn fetch_all(&self, limit: usize) -> Result<Vec<Record>, StoreError> {
        let conn = self.conn.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, sexo, idade, peso, altura, diabetes, hipertensao, habitos, imc, categoria, risco
             FROM imc_entries
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map([limit], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        sex: parse_column(row, 1)?,
        age: row.get(2)?,
        weight: row.get(3)?,
        height: row.get(4)?,
        diabetes: parse_column::<YesNo>(row, 5)?,
        hypertension: parse_column::<YesNo>(row, 6)?,
        habits: parse_column::<Habits>(row, 7)?,
        bmi: row.get(8)?,
        category: category_column(row, 9)?,
        risk: risk_column(row, 10)?,
    })
}

fn parse_column<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

// Category and risk labels only ever come from `as_str`, match them exactly
fn category_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<BmiCategory> {
    let text: String = row.get(idx)?;
    [
        BmiCategory::Underweight,
        BmiCategory::Normal,
        BmiCategory::Overweight,
        BmiCategory::Obese,
    ]
    .into_iter()
    .find(|c| c.as_str() == text)
    .ok_or_else(|| unknown_label(idx, &text))
}

fn risk_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<RiskLevel> {
    let text: String = row.get(idx)?;
    RiskLevel::ALL
        .into_iter()
        .find(|r| r.as_str() == text)
        .ok_or_else(|| unknown_label(idx, &text))
}

fn unknown_label(idx: usize, text: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unknown label '{}'", text).into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{HealthInput, Sex};

    #[test]
    fn test_insert_and_fetch_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let input = HealthInput {
            sex: Sex::Female,
            age: 70,
            weight: 90.0,
            height: 1.70,
            diabetes: YesNo::Yes,
            hypertension: YesNo::No,
            habits: Habits::Poor,
        };

        store.submit(&Record::new(10, &HealthInput::default())).unwrap();
        let total = store.submit(&Record::new(20, &input)).unwrap();
        assert_eq!(total, Some(2));

        let records = store.fetch_all(5000).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::new(20, &input));
        assert_eq!(records[1].id, 10);
    }

    #[test]
    fn test_fetch_limit() {
        let store = SqliteStore::open_in_memory().unwrap();
        for id in 1..=4 {
            store.submit(&Record::new(id, &HealthInput::default())).unwrap();
        }

        let ids: Vec<i64> = store.fetch_all(2).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = Record::new(1, &HealthInput::default());

        store.submit(&record).unwrap();
        assert!(matches!(store.submit(&record), Err(StoreError::Sqlite(_))));
    }
}
