//! Identity Resolver - 작업 컨텍스트 (사용자/고객/세션)
//!
//! 논리 세션마다 한 번 생성해서 `Arc`로 공유합니다.
//! 생성된 사용자 ID와 세션 ID는 컨텍스트가 살아 있는 동안 변하지 않습니다.

use crate::config::AuditConfig;
use serde::{Deserialize, Serialize};
use std::sync::{OnceLock, RwLock};
use tracing::debug;

/// 고객 ID가 없을 때 사용하는 값
pub const UNKNOWN_CUSTOMER: &str = "unknown";

/// 작업 컨텍스트
#[derive(Debug, Default)]
pub struct OperationContext {
    /// 세션 중 명시적으로 지정된 사용자
    user_override: RwLock<Option<String>>,

    /// 설정/환경 변수에서 온 사용자
    configured_user: Option<String>,

    /// 호스트 애플리케이션이 지정한 고객
    customer_id: RwLock<Option<String>>,

    generated_user: OnceLock<String>,
    session_id: OnceLock<String>,
}

/// 표시용 컨텍스트 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub user_id: String,
    pub customer_id: String,
    pub session_id: String,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 설정에서 사용자/고객 ID를 가져와 생성
    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            configured_user: non_empty(config.user_id.clone()),
            customer_id: RwLock::new(non_empty(config.customer_id.clone())),
            ..Self::default()
        }
    }

    pub fn with_configured_user(mut self, user_id: impl Into<String>) -> Self {
        self.configured_user = non_empty(Some(user_id.into()));
        self
    }

    pub fn with_customer(self, customer_id: impl Into<String>) -> Self {
        self.set_customer(customer_id);
        self
    }

    /// 세션 사용자 지정 (빈 문자열이면 해제)
    pub fn set_user(&self, user_id: impl Into<String>) {
        let user_id = non_empty(Some(user_id.into()));
        debug!(user_id = ?user_id, "Operation context user override changed");
        write_slot(&self.user_override, user_id);
    }

    /// 현재 고객 지정 (빈 문자열이면 해제)
    pub fn set_customer(&self, customer_id: impl Into<String>) {
        write_slot(&self.customer_id, non_empty(Some(customer_id.into())));
    }

    /// 사용자 ID: 세션 지정 → 설정 → 생성된 `user_<epoch>`
    pub fn resolve_user(&self) -> String {
        if let Some(user) = read_slot(&self.user_override) {
            return user;
        }
        if let Some(user) = &self.configured_user {
            return user.clone();
        }
        self.generated_user
            .get_or_init(|| format!("user_{}", epoch_seconds()))
            .clone()
    }

    /// 고객 ID (없으면 `unknown`)
    pub fn resolve_customer(&self) -> String {
        read_slot(&self.customer_id).unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string())
    }

    /// 세션 ID: 처음 사용할 때 `session_<epoch>` 생성
    pub fn resolve_session(&self) -> String {
        self.session_id
            .get_or_init(|| format!("session_{}", epoch_seconds()))
            .clone()
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            user_id: self.resolve_user(),
            customer_id: self.resolve_customer(),
            session_id: self.resolve_session(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// 잠금이 오염되어도 값은 그대로 사용
fn read_slot(slot: &RwLock<Option<String>>) -> Option<String> {
    match slot.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn write_slot(slot: &RwLock<Option<String>>, value: Option<String>) {
    match slot.write() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

fn epoch_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_epoch_suffix(value: &str, prefix: &str) -> bool {
        value
            .strip_prefix(prefix)
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
    }

    #[test]
    fn test_generated_ids_are_cached() {
        let ctx = OperationContext::new();

        let user = ctx.resolve_user();
        let session = ctx.resolve_session();
        assert!(has_epoch_suffix(&user, "user_"), "{}", user);
        assert!(has_epoch_suffix(&session, "session_"), "{}", session);

        assert_eq!(ctx.resolve_user(), user);
        assert_eq!(ctx.resolve_session(), session);
    }

    #[test]
    fn test_user_precedence() {
        let ctx = OperationContext::new().with_configured_user("configured");
        assert_eq!(ctx.resolve_user(), "configured");

        ctx.set_user("explicit");
        assert_eq!(ctx.resolve_user(), "explicit");

        ctx.set_user("");
        assert_eq!(ctx.resolve_user(), "configured");
    }

    #[test]
    fn test_generated_user_survives_override() {
        let ctx = OperationContext::new();
        let generated = ctx.resolve_user();

        ctx.set_user("bob");
        assert_eq!(ctx.resolve_user(), "bob");
        ctx.set_user(" ");
        assert_eq!(ctx.resolve_user(), generated);
    }

    #[test]
    fn test_customer_defaults_to_unknown() {
        let ctx = OperationContext::new();
        assert_eq!(ctx.resolve_customer(), UNKNOWN_CUSTOMER);

        ctx.set_customer("123-456-7890");
        assert_eq!(ctx.resolve_customer(), "123-456-7890");
    }

    #[test]
    fn test_from_config() {
        let config = AuditConfig::new().user_id("ops@example.com").customer_id("42");
        let snapshot = OperationContext::from_config(&config).snapshot();

        assert_eq!(snapshot.user_id, "ops@example.com");
        assert_eq!(snapshot.customer_id, "42");
        assert!(snapshot.session_id.starts_with("session_"));
    }
}
