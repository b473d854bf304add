//! Audit System - 광고 API 작업 감사 로깅
//!
//! 캠페인/광고그룹/키워드 등 계정 변경 작업과 API 호출을 기록합니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Interceptor.call(meta, params, op)                          │
//! │     │  Instant 시작, 파라미터 정제                            │
//! │     ▼                                                       │
//! │  op() ──► Ok(value) ──► AuditRecorder.record_success        │
//! │       └─► Err(error) ─► AuditRecorder.record_error          │
//! │                             │  OperationContext (user/cust) │
//! │                             ▼                               │
//! │                        AuditStore ──► SQLite (audit_logs)   │
//! │                             ▲                               │
//! │  AuditDashboard ────────────┘  (읽기 전용 집계/조회)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 사용법
//!
//! ```ignore
//! use adaudit_foundation::audit::{
//!     AuditDashboard, AuditParams, AuditRecorder, AuditStore, Interceptor,
//!     OperationContext, OperationMeta, OperationType,
//! };
//!
//! // 1. 저장소/컨텍스트 생성
//! let store = Arc::new(AuditStore::open(config.resolved_db_path())?);
//! let context = Arc::new(OperationContext::from_config(&config));
//!
//! // 2. 작업 감싸기
//! let interceptor = Interceptor::new(AuditRecorder::new(store.clone(), context));
//! let meta = OperationMeta::new(OperationType::Update, resource::CAMPAIGN, "pause_campaign");
//! interceptor.call(&meta, AuditParams::new().arg("campaign_id", &id), || api.pause(&id))?;
//!
//! // 3. 통계
//! let stats = AuditDashboard::new(store).snapshot()?;
//! println!("Total entries: {}", stats.total);
//! ```

mod identity;
mod interceptor;
mod recorder;
mod sanitize;
mod stats;
mod store;
mod types;
mod vendor;

pub use identity::{ContextSnapshot, OperationContext, UNKNOWN_CUSTOMER};
pub use interceptor::{Interceptor, PanicError};
pub use recorder::{decompose_error, AuditRecorder, UNKNOWN_ERROR_CODE, VENDOR_ERROR_PREFIX};
pub use sanitize::{is_sensitive_key, AuditParams, Sanitizer};
pub use stats::{AuditDashboard, OperationStats, StatField, TOP_N};
pub use store::{format_timestamp, parse_timestamp, AuditStore};
pub use types::{
    AuditEntry, AuditId, AuditQuery, ErrorDetails, NewAuditEntry, OperationMeta, OperationType,
    Outcome, ResultStatus,
};
pub use vendor::{
    AuditableError, ErrorShape, MutateResponse, MutateResult, ResultSummary, StatusError,
    VendorError, VendorErrorDetail, VendorFailure,
};
