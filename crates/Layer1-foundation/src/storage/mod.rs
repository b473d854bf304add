//! Storage module for AdAudit
//!
//! - `json`: JSON - 설정 파일 저장/로드
//!
//! 감사 로그 SQLite 저장소는 `audit::store`에서 관리

mod json;

// JSON Storage (설정)
pub use json::JsonStore;
