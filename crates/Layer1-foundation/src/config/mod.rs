//! Config - 설정 관리
//!
//! - `audit.rs` - AuditConfig 감사 로그 설정

mod audit;

pub use audit::{
    AuditConfig, AUDIT_CONFIG_FILE, AUDIT_DB_FILE, ENV_CUSTOMER_ID, ENV_DB_PATH, ENV_USER_ID,
};
