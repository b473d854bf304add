//! Audit Store - SQLite 감사 로그 저장소
//!
//! 감사 엔트리를 추가 전용으로 저장하고 인덱스 기반으로 조회합니다.
//!
//! ## Migration System
//!
//! Schema is versioned in `schema_version`. Migrations run automatically on open.
//! - Version 1: `audit_logs` table and indexes
//! - Version 2: Normalize legacy `YYYY-MM-DD HH:MM:SS` timestamps to RFC 3339
//!
//! Columns added after the first release (`error_type`, `error_code`,
//! `stack_trace`, `session_id`) are checked on every open and added if missing.

use super::types::{
    AuditEntry, AuditId, AuditQuery, ErrorDetails, NewAuditEntry, OperationType, Outcome,
    ResultStatus,
};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Columns introduced by schema evolution: (name, type)
const EVOLVED_COLUMNS: &[(&str, &str)] = &[
    ("error_type", "TEXT"),
    ("error_code", "TEXT"),
    ("stack_trace", "TEXT"),
    ("session_id", "TEXT"),
];

/// Indexed columns: (index name, column)
const INDEXES: &[(&str, &str)] = &[
    ("idx_timestamp", "timestamp"),
    ("idx_user_id", "user_id"),
    ("idx_customer_id", "customer_id"),
    ("idx_operation_type", "operation_type"),
    ("idx_resource_type", "resource_type"),
];

/// Stored timestamp text (UTC, millisecond precision, lexically ordered)
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse stored timestamp text (RFC 3339 or legacy SQLite `CURRENT_TIMESTAMP`)
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// 감사 로그 저장소
///
/// 하나의 연결을 뮤텍스로 보호해서 쓰기를 직렬화합니다.
pub struct AuditStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for AuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditStore").field("path", &self.path).finish()
    }
}

impl AuditStore {
    /// Open (or create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create data directory: {}", e))
            })?;
        }

        let conn = Connection::open(&path)
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        // Enable WAL mode so readers don't block the writer
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| Error::Storage(format!("Failed to set pragmas: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            path,
        };
        store.initialize()?;

        info!(db_path = %store.path.display(), "Audit store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Storage(format!("Failed to create in-memory database: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Internal("Lock poisoned".to_string()))
    }

    /// Create tables, evolve columns, create indexes and run migrations.
    ///
    /// Safe to call any number of times.
    pub fn initialize(&self) -> Result<()> {
        self.initialize_schema()?;
        self.run_migrations()
    }

    /// Get current schema version from database
    pub fn schema_version(&self) -> Result<i32> {
        let conn = self.lock()?;
        Self::read_schema_version(&conn)
    }

    fn read_schema_version(conn: &Connection) -> Result<i32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::Storage(format!("Failed to get schema version: {}", e)))
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS audit_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                user_id TEXT NOT NULL,
                customer_id TEXT NOT NULL,
                operation_type TEXT NOT NULL,
                resource_type TEXT NOT NULL,
                resource_id TEXT,
                function_name TEXT NOT NULL,
                parameters TEXT,
                result_status TEXT,
                result_data TEXT,
                error_message TEXT,
                execution_time_ms INTEGER
            );

            INSERT OR IGNORE INTO schema_version (version) VALUES (1);
            "#,
        )
        .map_err(|e| Error::Storage(format!("Failed to initialize schema: {}", e)))?;

        Self::ensure_columns(&conn)?;

        for (name, column) in INDEXES {
            conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {} ON audit_logs({})",
                    name, column
                ),
                [],
            )
            .map_err(|e| Error::Storage(format!("Failed to create index {}: {}", name, e)))?;
        }

        Ok(())
    }

    /// Add evolved columns that are missing from an existing table
    fn ensure_columns(conn: &Connection) -> Result<()> {
        let existing: Vec<String> = {
            let mut stmt = conn.prepare("PRAGMA table_info(audit_logs)")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>("name"))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            names
        };

        for (name, ty) in EVOLVED_COLUMNS {
            if existing.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                continue;
            }
            match conn.execute(&format!("ALTER TABLE audit_logs ADD COLUMN {} {}", name, ty), []) {
                Ok(_) => debug!(column = name, "Added audit_logs column"),
                // Another connection may have added it in between
                Err(e) if e.to_string().contains("duplicate column") => {}
                Err(e) => {
                    return Err(Error::Storage(format!(
                        "Failed to add column {}: {}",
                        name, e
                    )))
                }
            }
        }

        Ok(())
    }

    /// Run all pending migrations
    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.lock()?;
        let current_version = Self::read_schema_version(&conn)?;

        if current_version >= CURRENT_SCHEMA_VERSION {
            debug!(
                "Audit schema is up to date (version {})",
                current_version
            );
            return Ok(());
        }

        info!(
            "Running audit schema migrations from version {} to {}",
            current_version, CURRENT_SCHEMA_VERSION
        );

        let tx = conn.transaction()?;
        for version in (current_version + 1)..=CURRENT_SCHEMA_VERSION {
            match version {
                2 => Self::migrate_v2(&tx)?,
                _ => {
                    warn!("Unknown migration version: {}", version);
                }
            }

            tx.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![version],
            )
            .map_err(|e| Error::Storage(format!("Failed to record migration: {}", e)))?;

            info!("Applied audit migration to version {}", version);
        }
        tx.commit()?;

        Ok(())
    }

    /// Migration to version 2: rewrite `CURRENT_TIMESTAMP` style rows
    fn migrate_v2(conn: &Connection) -> Result<()> {
        let updated = conn
            .execute(
                r#"
                UPDATE audit_logs
                SET timestamp = strftime('%Y-%m-%dT%H:%M:%fZ', timestamp)
                WHERE timestamp NOT LIKE '%T%'
                  AND strftime('%Y-%m-%dT%H:%M:%fZ', timestamp) IS NOT NULL
                "#,
                [],
            )
            .map_err(|e| Error::Storage(format!("Failed to normalize timestamps: {}", e)))?;

        if updated > 0 {
            info!(rows = updated, "Normalized legacy audit timestamps");
        }
        Ok(())
    }

    // ========================================================================
    // Write
    // ========================================================================

    /// 감사 엔트리 저장 (실패해도 에러를 전파하지 않음)
    ///
    /// 감사 로그 실패가 감사 대상 작업을 중단시키면 안 되므로
    /// 저장 실패는 로그로 남기고 `None`을 반환합니다.
    pub fn insert(&self, entry: &NewAuditEntry) -> Option<AuditId> {
        match self.try_insert(entry) {
            Ok(id) => Some(id),
            Err(e) => {
                error!(
                    error = %e,
                    function = %entry.function_name,
                    operation = %entry.operation_type,
                    "Failed to write audit entry"
                );
                None
            }
        }
    }

    /// 감사 엔트리 저장
    pub fn try_insert(&self, entry: &NewAuditEntry) -> Result<AuditId> {
        validate(entry)?;

        let timestamp = format_timestamp(&entry.timestamp.unwrap_or_else(Utc::now));
        let parameters = entry.parameters.as_ref().map(to_json_text);
        let execution_time_ms = entry
            .execution_time_ms
            .map(|ms| i64::try_from(ms).unwrap_or(i64::MAX));

        let (result_data, error) = match &entry.outcome {
            Outcome::Success { result_data } => (result_data.as_ref().map(to_json_text), None),
            Outcome::Error(details) => (None, Some(details)),
        };

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO audit_logs (
                timestamp, user_id, customer_id, operation_type, resource_type,
                resource_id, function_name, parameters, result_status, result_data,
                error_message, error_type, error_code, stack_trace,
                execution_time_ms, session_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                timestamp,
                entry.user_id,
                entry.customer_id,
                entry.operation_type.as_str(),
                entry.resource_type,
                entry.resource_id,
                entry.function_name,
                parameters,
                entry.outcome.status().as_str(),
                result_data,
                error.map(|d| d.message.as_str()),
                error.and_then(|d| d.error_type.as_deref()),
                error.and_then(|d| d.code.as_deref()),
                error.and_then(|d| d.stack_trace.as_deref()),
                execution_time_ms,
                entry.session_id,
            ],
        )?;

        let id = AuditId(conn.last_insert_rowid());
        debug!(
            audit_id = %id,
            operation = %entry.operation_type,
            resource = %entry.resource_type,
            status = entry.outcome.status().as_str(),
            "Audit entry logged"
        );

        Ok(id)
    }

    /// 모든 감사 로그 삭제 (되돌릴 수 없음)
    ///
    /// 호출 전에 호출자가 확인 절차를 거쳐야 합니다.
    pub fn clear_all(&self) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM audit_logs", [])
            .map_err(|e| Error::Storage(format!("Failed to clear audit log: {}", e)))?;

        warn!(deleted = deleted, "Cleared all audit entries");
        Ok(deleted as u64)
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// ID로 감사 로그 조회
    pub fn get(&self, id: AuditId) -> Result<Option<AuditEntry>> {
        let conn = self.lock()?;

        let entry = conn
            .query_row(
                "SELECT * FROM audit_logs WHERE id = ?1",
                params![id.0],
                row_to_entry,
            )
            .optional()?;

        Ok(entry)
    }

    /// 필터로 감사 로그 조회 (최신순, 최대 `limit`개)
    pub fn query(&self, query: &AuditQuery, limit: usize) -> Result<Vec<AuditEntry>> {
        let conn = self.lock()?;

        let mut sql = String::from("SELECT * FROM audit_logs WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref user_id) = query.user_id {
            sql.push_str(" AND user_id = ?");
            params_vec.push(Box::new(user_id.clone()));
        }
        if let Some(ref customer_id) = query.customer_id {
            sql.push_str(" AND customer_id = ?");
            params_vec.push(Box::new(customer_id.clone()));
        }
        if let Some(ref operation_type) = query.operation_type {
            sql.push_str(" AND operation_type = ?");
            params_vec.push(Box::new(operation_type.as_str().to_string()));
        }
        if let Some(ref resource_type) = query.resource_type {
            sql.push_str(" AND resource_type = ?");
            params_vec.push(Box::new(resource_type.clone()));
        }

        // 시간 범위 필터
        if let Some(ref from) = query.from {
            sql.push_str(" AND timestamp >= ?");
            params_vec.push(Box::new(format_timestamp(from)));
        }
        if let Some(ref to) = query.to {
            sql.push_str(" AND timestamp <= ?");
            params_vec.push(Box::new(format_timestamp(to)));
        }

        sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ?");
        params_vec.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_refs.as_slice(), row_to_entry)?
            .filter_map(|r| match r {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable audit row");
                    None
                }
            })
            .collect();

        Ok(entries)
    }

    // ========================================================================
    // Aggregation primitives
    // ========================================================================

    /// 전체 엔트리 수
    pub fn count_all(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM audit_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    /// `since` 이후 엔트리 수 (상태 지정 시 해당 상태만)
    pub fn count_since(&self, since: DateTime<Utc>, status: Option<ResultStatus>) -> Result<u64> {
        let conn = self.lock()?;
        let since = format_timestamp(&since);

        let count = match status {
            Some(status) => conn.query_row(
                "SELECT COUNT(*) FROM audit_logs WHERE timestamp >= ?1 AND result_status = ?2",
                params![since, status.as_str()],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM audit_logs WHERE timestamp >= ?1",
                params![since],
                |row| row.get(0),
            )?,
        };

        Ok(count)
    }

    /// 컬럼 값별 개수 (개수 내림차순, 값 오름차순)
    ///
    /// `column`은 호출자가 고정된 목록에서 고른 이름이어야 합니다.
    pub(crate) fn group_counts(
        &self,
        column: &'static str,
        errors_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<(String, u64)>> {
        let conn = self.lock()?;

        let mut sql = format!(
            "SELECT {col}, COUNT(*) AS count FROM audit_logs WHERE {col} IS NOT NULL",
            col = column
        );
        if errors_only {
            sql.push_str(" AND result_status = 'ERROR'");
        }
        sql.push_str(&format!(" GROUP BY {col} ORDER BY count DESC, {col} ASC", col = column));
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            let count: u64 = row.get(1)?;
            counts.push((value, count));
        }

        Ok(counts)
    }
}

// ============================================================================
// 헬퍼 함수
// ============================================================================

fn validate(entry: &NewAuditEntry) -> Result<()> {
    let required = [
        ("user_id", &entry.user_id),
        ("customer_id", &entry.customer_id),
        ("session_id", &entry.session_id),
        ("resource_type", &entry.resource_type),
        ("function_name", &entry.function_name),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(Error::InvalidInput(format!("{} must not be empty", field)));
        }
    }
    Ok(())
}

// `Value`의 Display는 압축 JSON 직렬화
fn to_json_text(value: &Value) -> String {
    value.to_string()
}

/// JSON 텍스트 복원 (형식이 깨진 레거시 값은 원문 그대로)
fn from_json_text(text: Option<String>) -> Option<Value> {
    text.map(|raw| serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
}

/// 행을 AuditEntry로 변환
fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<AuditEntry> {
    let id: i64 = row.get("id")?;
    let timestamp: String = row.get("timestamp")?;
    let status: Option<String> = row.get("result_status")?;
    let execution_time_ms: Option<i64> = row.get("execution_time_ms")?;
    let operation_type: String = row.get("operation_type")?;

    let outcome = if status.as_deref() == Some(ResultStatus::Error.as_str()) {
        Outcome::Error(ErrorDetails {
            message: row
                .get::<_, Option<String>>("error_message")?
                .unwrap_or_default(),
            error_type: row.get("error_type")?,
            code: row.get("error_code")?,
            stack_trace: row.get("stack_trace")?,
        })
    } else {
        Outcome::Success {
            result_data: from_json_text(row.get("result_data")?),
        }
    };

    Ok(AuditEntry {
        id: AuditId(id),
        timestamp: parse_timestamp(&timestamp).unwrap_or_else(|| {
            warn!(audit_id = id, timestamp = %timestamp, "Unparseable audit timestamp");
            DateTime::<Utc>::UNIX_EPOCH
        }),
        user_id: row.get("user_id")?,
        customer_id: row.get("customer_id")?,
        session_id: row
            .get::<_, Option<String>>("session_id")?
            .unwrap_or_default(),
        operation_type: OperationType::from(operation_type),
        resource_type: row.get("resource_type")?,
        resource_id: row.get("resource_id")?,
        function_name: row.get("function_name")?,
        parameters: from_json_text(row.get("parameters")?),
        outcome,
        execution_time_ms: execution_time_ms.and_then(|ms| u64::try_from(ms).ok()),
    })
}

// ============================================================================
// 테스트
// ============================================================================
