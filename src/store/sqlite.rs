//! SQLite Store - local table store
//!
//! Holds the three tables in one SQLite database. Each trait call runs on
//! the blocking thread pool and takes the connection lock for a single
//! statement or transaction.
//!
//! Timestamps are stored as RFC 3339 text and partner lists as JSON text.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, types::Type, Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::{StoreError, StoreResult};
use super::types::{Document, InvestmentBatch, InvestmentDetails, NewDocument};
use super::{single_row, Store};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS investment_batches (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        secured_applicants INTEGER NOT NULL DEFAULT 0,
        total_positions INTEGER NOT NULL DEFAULT 100,
        base_price REAL NOT NULL DEFAULT 1.0,
        current_price REAL NOT NULL DEFAULT 1.0,
        batch_number INTEGER NOT NULL DEFAULT 1,
        is_active INTEGER NOT NULL DEFAULT 1,
        last_updated TEXT NOT NULL,
        CHECK (secured_applicants >= 0 AND secured_applicants <= total_positions)
    );

    CREATE TABLE IF NOT EXISTS investment_details (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        total_micro_shares INTEGER NOT NULL,
        current_share_price REAL NOT NULL,
        post_launch_price REAL NOT NULL,
        minimum_to_qualify INTEGER NOT NULL,
        minimum_investment_amount REAL NOT NULL,
        holding_period_years INTEGER NOT NULL,
        launch_date TEXT NOT NULL,
        withdrawal_date TEXT NOT NULL,
        partners TEXT NOT NULL DEFAULT '[]',
        withdrawal_guarantee TEXT NOT NULL DEFAULT '',
        is_active INTEGER NOT NULL DEFAULT 1,
        last_updated TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        file_url TEXT NOT NULL,
        file_name TEXT NOT NULL,
        display_order INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_documents_active_order
        ON documents(is_active, display_order);
";

const BATCH_COLUMNS: &str = "id, secured_applicants, total_positions, base_price, current_price, \
     batch_number, is_active, last_updated";

const DETAILS_COLUMNS: &str = "id, total_micro_shares, current_share_price, post_launch_price, \
     minimum_to_qualify, minimum_investment_amount, holding_period_years, launch_date, \
     withdrawal_date, partners, withdrawal_guarantee, is_active, last_updated";

const DOCUMENT_COLUMNS: &str =
    "id, title, description, file_url, file_name, display_order, is_active, created_at";

/// SQLite-backed table store
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Create or open a store at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Create a private in-memory store
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = ?path, "SQLite store ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Run `f` against the connection on the blocking thread pool
    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| StoreError::Lock(e.to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Lock(format!("blocking task failed: {}", e)))?
    }

    /// Insert the first batch and details rows if their tables are empty
    ///
    /// Returns true if anything was inserted.
    pub fn seed_defaults(&self) -> StoreResult<bool> {
        let conn = self.lock()?;
        let now = Utc::now();
        let mut seeded = false;

        let batches: i64 =
            conn.query_row("SELECT COUNT(*) FROM investment_batches", [], |r| r.get(0))?;
        if batches == 0 {
            conn.execute(
                "INSERT INTO investment_batches
                    (secured_applicants, total_positions, base_price, current_price,
                     batch_number, is_active, last_updated)
                 VALUES (0, 100, 1.0, 1.0, 1, 1, ?1)",
                params![now.to_rfc3339()],
            )?;
            seeded = true;
        }

        let details: i64 =
            conn.query_row("SELECT COUNT(*) FROM investment_details", [], |r| r.get(0))?;
        if details == 0 {
            let partners = serde_json::to_string(&Vec::<String>::new())?;
            conn.execute(
                "INSERT INTO investment_details
                    (total_micro_shares, current_share_price, post_launch_price,
                     minimum_to_qualify, minimum_investment_amount, holding_period_years,
                     launch_date, withdrawal_date, partners, withdrawal_guarantee,
                     is_active, last_updated)
                 VALUES (1000000, 1.0, 1.5, 1000, 1000.0, 1, ?1, ?2, ?3, '', 1, ?4)",
                params![
                    now.to_rfc3339(),
                    (now + Duration::days(365)).to_rfc3339(),
                    partners,
                    now.to_rfc3339(),
                ],
            )?;
            seeded = true;
        }

        if seeded {
            tracing::info!("Seeded default investment rows");
        }
        Ok(seeded)
    }

    #[cfg(test)]
    pub(crate) fn insert_batch(
        &self,
        secured_applicants: i64,
        total_positions: i64,
        current_price: f64,
        batch_number: i64,
    ) -> StoreResult<InvestmentBatch> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO investment_batches
                (secured_applicants, total_positions, base_price, current_price,
                 batch_number, is_active, last_updated)
             VALUES (?1, ?2, ?3, ?3, ?4, 1, ?5)",
            params![
                secured_applicants,
                total_positions,
                current_price,
                batch_number,
                Utc::now().to_rfc3339()
            ],
        )?;
        let id = conn.last_insert_rowid();
        batch_by_id(&conn, id)
    }

    /// Insert a details row, deactivating the others when it is active
    #[cfg(test)]
    pub(crate) fn put_details(&self, details: &InvestmentDetails) -> StoreResult<InvestmentDetails> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if details.is_active {
            tx.execute("UPDATE investment_details SET is_active = 0", [])?;
        }
        tx.execute(
            "INSERT INTO investment_details
                (total_micro_shares, current_share_price, post_launch_price,
                 minimum_to_qualify, minimum_investment_amount, holding_period_years,
                 launch_date, withdrawal_date, partners, withdrawal_guarantee,
                 is_active, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                details.total_micro_shares,
                details.current_share_price,
                details.post_launch_price,
                details.minimum_to_qualify,
                details.minimum_investment_amount,
                details.holding_period_years,
                details.launch_date.to_rfc3339(),
                details.withdrawal_date.to_rfc3339(),
                serde_json::to_string(&details.partners)?,
                details.withdrawal_guarantee,
                details.is_active,
                Utc::now().to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        let sql = format!("SELECT {} FROM investment_details WHERE id = ?1", DETAILS_COLUMNS);
        conn.query_row(&sql, params![id], details_from_row)
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    async fn active_batch(&self) -> StoreResult<InvestmentBatch> {
        self.run(|conn| {
            let sql = format!(
                "SELECT {} FROM investment_batches WHERE is_active = 1 ORDER BY id LIMIT 2",
                BATCH_COLUMNS
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map([], batch_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            single_row(rows, "active investment batch")
        })
        .await
    }

    async fn active_details(&self) -> StoreResult<InvestmentDetails> {
        self.run(|conn| {
            let sql = format!(
                "SELECT {} FROM investment_details WHERE is_active = 1 ORDER BY id LIMIT 2",
                DETAILS_COLUMNS
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map([], details_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            single_row(rows, "active investment details")
        })
        .await
    }

    async fn active_documents(&self) -> StoreResult<Vec<Document>> {
        self.run(|conn| {
            let sql = format!(
                "SELECT {} FROM documents WHERE is_active = 1 ORDER BY display_order ASC, id ASC",
                DOCUMENT_COLUMNS
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map([], document_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn document(&self, id: i64) -> StoreResult<Document> {
        self.run(move |conn| document_by_id(conn, id)).await
    }

    async fn update_secured_applicants(
        &self,
        batch_id: i64,
        count: i64,
    ) -> StoreResult<InvestmentBatch> {
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE investment_batches SET secured_applicants = ?1, last_updated = ?2 WHERE id = ?3",
                params![count, Utc::now().to_rfc3339(), batch_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("investment batch {}", batch_id)));
            }
            batch_by_id(conn, batch_id)
        })
        .await
    }

    async fn insert_document(&self, document: &NewDocument) -> StoreResult<Document> {
        let document = document.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO documents
                    (title, description, file_url, file_name, display_order, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    document.title,
                    document.description,
                    document.file_url,
                    document.file_name,
                    document.display_order,
                    document.is_active,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            document_by_id(conn, id)
        })
        .await
    }

    async fn set_document_active(&self, id: i64, active: bool) -> StoreResult<Document> {
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE documents SET is_active = ?1 WHERE id = ?2",
                params![active, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("document {}", id)));
            }
            document_by_id(conn, id)
        })
        .await
    }

    async fn set_display_order(&self, id: i64, display_order: i64) -> StoreResult<Document> {
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE documents SET display_order = ?1 WHERE id = ?2",
                params![display_order, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("document {}", id)));
            }
            document_by_id(conn, id)
        })
        .await
    }

    async fn swap_display_orders(
        &self,
        first: &Document,
        second: &Document,
    ) -> StoreResult<(Document, Document)> {
        let updates = [
            (first.id, second.display_order),
            (second.id, first.display_order),
        ];
        self.run(move |conn| {
            let tx = conn.transaction()?;
            for (id, order) in updates {
                let changed = tx.execute(
                    "UPDATE documents SET display_order = ?1 WHERE id = ?2",
                    params![order, id],
                )?;
                if changed == 0 {
                    // Dropping the transaction rolls back the first update
                    return Err(StoreError::NotFound(format!("document {}", id)));
                }
            }
            tx.commit()?;

            Ok((
                document_by_id(conn, updates[0].0)?,
                document_by_id(conn, updates[1].0)?,
            ))
        })
        .await
    }
}

fn batch_by_id(conn: &Connection, id: i64) -> StoreResult<InvestmentBatch> {
    let sql = format!("SELECT {} FROM investment_batches WHERE id = ?1", BATCH_COLUMNS);
    conn.query_row(&sql, params![id], batch_from_row)
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("investment batch {}", id)))
}

fn document_by_id(conn: &Connection, id: i64) -> StoreResult<Document> {
    let sql = format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS);
    conn.query_row(&sql, params![id], document_from_row)
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("document {}", id)))
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<InvestmentBatch> {
    Ok(InvestmentBatch {
        id: row.get(0)?,
        secured_applicants: row.get(1)?,
        total_positions: row.get(2)?,
        base_price: row.get(3)?,
        current_price: row.get(4)?,
        batch_number: row.get(5)?,
        is_active: row.get(6)?,
        last_updated: timestamp(row, 7)?,
    })
}

fn details_from_row(row: &Row<'_>) -> rusqlite::Result<InvestmentDetails> {
    let partners_json: String = row.get(9)?;
    let partners: Vec<String> = serde_json::from_str(&partners_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

    Ok(InvestmentDetails {
        id: row.get(0)?,
        total_micro_shares: row.get(1)?,
        current_share_price: row.get(2)?,
        post_launch_price: row.get(3)?,
        minimum_to_qualify: row.get(4)?,
        minimum_investment_amount: row.get(5)?,
        holding_period_years: row.get(6)?,
        launch_date: timestamp(row, 7)?,
        withdrawal_date: timestamp(row, 8)?,
        partners,
        withdrawal_guarantee: row.get(10)?,
        is_active: row.get(11)?,
        last_updated: timestamp(row, 12)?,
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        file_url: row.get(3)?,
        file_name: row.get(4)?,
        display_order: row.get(5)?,
        is_active: row.get(6)?,
        created_at: timestamp(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.seed_defaults().unwrap();
        store
    }

    fn new_doc(title: &str, order: i64) -> NewDocument {
        NewDocument::from_input(title, None, &format!("https://example.com/{}.pdf", title), order)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_calls_share_one_connection() {
        let store = Arc::new(seeded());
        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.insert_document(&new_doc(&format!("doc{}", i), i)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let docs = store.active_documents().await.unwrap();
        let orders: Vec<i64> = docs.iter().map(|d| d.display_order).collect();
        assert_eq!(orders, (0..8).collect::<Vec<_>>());
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.seed_defaults().unwrap());
        assert!(!store.seed_defaults().unwrap());

        let batch = store.active_batch().await.unwrap();
        assert_eq!(batch.secured_applicants, 0);
        assert_eq!(batch.total_positions, 100);
        assert_eq!(batch.batch_number, 1);
    }

    #[tokio::test]
    async fn test_missing_active_batch_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.active_batch().await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_two_active_batches_is_ambiguous() {
        let store = seeded();
        store.insert_batch(0, 50, 1.0, 2).unwrap();
        let err = store.active_batch().await.unwrap_err();
        assert!(matches!(err, StoreError::Ambiguous(_)));
    }

    #[tokio::test]
    async fn test_update_secured_applicants() {
        let store = seeded();
        let batch = store.active_batch().await.unwrap();

        let updated = store.update_secured_applicants(batch.id, 63).await.unwrap();
        assert_eq!(updated.secured_applicants, 63);
        assert_eq!(updated.remaining(), 37);

        let err = store.update_secured_applicants(999, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_check_constraint_rejects_out_of_range() {
        let store = seeded();
        let batch = store.active_batch().await.unwrap();
        let err = store
            .update_secured_applicants(batch.id, batch.total_positions + 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[tokio::test]
    async fn test_documents_ordered_and_soft_deleted() {
        let store = seeded();
        let b = store.insert_document(&new_doc("b", 1)).await.unwrap();
        let a = store.insert_document(&new_doc("a", 0)).await.unwrap();

        let docs = store.active_documents().await.unwrap();
        let titles: Vec<_> = docs.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);

        let deleted = store.set_document_active(a.id, false).await.unwrap();
        assert!(!deleted.is_active);

        let docs = store.active_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, b.id);

        // Row is still there
        let row = store.document(a.id).await.unwrap();
        assert_eq!(row.title, "a");
    }

    #[tokio::test]
    async fn test_swap_display_orders_is_transactional() {
        let store = seeded();
        let a = store.insert_document(&new_doc("a", 0)).await.unwrap();
        let b = store.insert_document(&new_doc("b", 1)).await.unwrap();

        let (a2, b2) = store.swap_display_orders(&a, &b).await.unwrap();
        assert_eq!(a2.display_order, 1);
        assert_eq!(b2.display_order, 0);

        // Second row missing: first update must roll back
        let ghost = Document { id: 999, ..b2.clone() };
        assert!(store.swap_display_orders(&a2, &ghost).await.is_err());
        assert_eq!(store.document(a2.id).await.unwrap().display_order, 1);
    }

    #[tokio::test]
    async fn test_details_round_trip_partners() {
        let store = seeded();
        let mut details = store.active_details().await.unwrap();
        details.partners = vec!["Alpha".to_string(), "Beta".to_string()];
        details.withdrawal_guarantee = "Full capital returned".to_string();

        let stored = store.put_details(&details).unwrap();
        assert_eq!(stored.partners, vec!["Alpha", "Beta"]);

        let active = store.active_details().await.unwrap();
        assert_eq!(active.id, stored.id);
        assert_eq!(active.withdrawal_guarantee, "Full capital returned");
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("batchboard.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.seed_defaults().unwrap();
            let batch = store.active_batch().await.unwrap();
            store.update_secured_applicants(batch.id, 12).await.unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.active_batch().await.unwrap().secured_applicants, 12);
    }
}
