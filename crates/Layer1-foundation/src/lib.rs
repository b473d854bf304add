//! # adaudit-foundation
//!
//! Foundation layer for AdAudit:
//! - Audit: 작업 감사 (Interceptor → Recorder → Store, Dashboard)
//! - Storage: JsonStore (설정 파일)
//! - Config: 감사 설정 (AuditConfig, 환경 변수)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Host (CLI / ads tooling)                               │
//! │                     │                                   │
//! │                     ▼                                   │
//! │          Interceptor (call / call_async / wrap)         │
//! │                     │                                   │
//! │          ┌─────────┴─────────┐                         │
//! │          ▼                   ▼                         │
//! │   OperationContext      AuditRecorder                  │
//! │   (user/customer)            │                         │
//! │                              ▼                         │
//! │                  AuditStore (SQLite) ◄── AuditDashboard│
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod storage;
pub mod strings;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Audit
// ============================================================================
pub use audit::{
    AuditDashboard, AuditEntry, AuditId, AuditParams, AuditQuery, AuditRecorder, AuditStore,
    AuditableError, ErrorDetails, Interceptor, NewAuditEntry, OperationContext, OperationMeta,
    OperationStats, OperationType, Outcome, ResultStatus, ResultSummary, StatField,
};

// ============================================================================
// Config & Storage
// ============================================================================
pub use config::AuditConfig;
pub use storage::JsonStore;
