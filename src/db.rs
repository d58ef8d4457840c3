use crate::catalog::{DiamondInput, DiamondRecord, Grade};
use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const TABLE_NAME: &str = "diamonds";

// "table" is a keyword in SQL, so the column is always quoted.
// Columns are nullable; the writers here always bind all ten values.
const CREATE_DIAMONDS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS diamonds (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        carat REAL,
        cut TEXT,
        color TEXT,
        clarity TEXT,
        depth REAL,
        "table" REAL,
        price REAL,
        x REAL,
        y REAL,
        z REAL
    )"#;

const INSERT_DIAMOND: &str = r#"
    INSERT INTO diamonds (carat, cut, color, clarity, depth, "table", price, x, y, z)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#;

const SELECT_COLUMNS: &str = r#"id, carat, cut, color, clarity, depth, "table", price, x, y, z"#;

/// Whether `ensure_schema` had to create the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Created,
    Existing,
}

// ============================================================================
// Schema
// ============================================================================

/// Create the diamonds table if it does not exist yet.
///
/// The existence check and the CREATE run inside one IMMEDIATE transaction,
/// so two processes bootstrapping the same file agree on who created it.
pub fn ensure_schema(conn: &mut Connection) -> Result<SchemaState> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existed: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [TABLE_NAME],
        |row| row.get(0),
    )?;

    tx.execute(CREATE_DIAMONDS_TABLE, [])
        .context("Failed to create diamonds table")?;
    tx.commit()?;

    let state = if existed {
        SchemaState::Existing
    } else {
        SchemaState::Created
    };
    debug!(?state, "Schema ensured");

    Ok(state)
}

// ============================================================================
// Writes
// ============================================================================

/// Insert one record, returning the key the store assigned to it.
pub fn insert_diamond(conn: &Connection, record: &DiamondRecord) -> Result<i64> {
    let input = &record.input;

    conn.execute(
        INSERT_DIAMOND,
        params![
            input.carat,
            input.cut.label(),
            input.color.label(),
            input.clarity.label(),
            input.depth,
            input.table,
            record.price,
            input.x,
            input.y,
            input.z,
        ],
    )
    .context("Failed to insert diamond")?;

    Ok(conn.last_insert_rowid())
}

/// Append many records in a single transaction (all or nothing).
pub fn insert_diamonds(conn: &mut Connection, records: &[DiamondRecord]) -> Result<usize> {
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare(INSERT_DIAMOND)?;
        for record in records {
            let input = &record.input;
            stmt.execute(params![
                input.carat,
                input.cut.label(),
                input.color.label(),
                input.clarity.label(),
                input.depth,
                input.table,
                record.price,
                input.x,
                input.y,
                input.z,
            ])?;
        }
    }

    tx.commit()?;

    Ok(records.len())
}

// ============================================================================
// Reads
// ============================================================================

/// Every record, in primary-key order.
pub fn get_all_diamonds(conn: &Connection) -> Result<Vec<DiamondRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM diamonds ORDER BY id ASC",
        SELECT_COLUMNS
    ))?;

    let records = stmt
        .query_map([], diamond_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// The last `limit` records, still in primary-key order.
pub fn get_recent_diamonds(conn: &Connection, limit: usize) -> Result<Vec<DiamondRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM diamonds ORDER BY id DESC LIMIT ?1",
        SELECT_COLUMNS
    ))?;

    let mut records = stmt
        .query_map([limit as i64], diamond_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    records.reverse();

    Ok(records)
}

pub fn count_diamonds(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM diamonds", [], |row| row.get(0))?;

    Ok(count)
}

fn diamond_from_row(row: &Row) -> rusqlite::Result<DiamondRecord> {
    Ok(DiamondRecord {
        id: Some(row.get(0)?),
        input: DiamondInput {
            carat: row.get(1)?,
            cut: grade_from_row(row, 2)?,
            color: grade_from_row(row, 3)?,
            clarity: grade_from_row(row, 4)?,
            depth: row.get(5)?,
            table: row.get(6)?,
            x: row.get(8)?,
            y: row.get(9)?,
            z: row.get(10)?,
        },
        price: row.get(7)?,
    })
}

fn grade_from_row<G: Grade>(row: &Row, idx: usize) -> rusqlite::Result<G> {
    let label: String = row.get(idx)?;
    G::from_label(&label)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ============================================================================
// Store handle
// ============================================================================

/// Path-only handle to the diamonds database.
///
/// Each operation opens its own connection and closes it on return; there is
/// no pooling and no state shared between calls.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Store { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .with_context(|| format!("Failed to open database {}", self.path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Insert one record and return its assigned key
    pub fn save(&self, record: &DiamondRecord) -> Result<i64> {
        let conn = self.connect()?;
        let id = insert_diamond(&conn, record)?;
        debug!(id, price = record.price, "Diamond saved");
        Ok(id)
    }

    pub fn load_all(&self) -> Result<Vec<DiamondRecord>> {
        let conn = self.connect()?;
        get_all_diamonds(&conn)
    }

    pub fn load_recent(&self, limit: usize) -> Result<Vec<DiamondRecord>> {
        let conn = self.connect()?;
        get_recent_diamonds(&conn, limit)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.connect()?;
        count_diamonds(&conn)
    }
}
