//! Audit Config - 감사 로그 설정
//!
//! 글로벌 → 프로젝트 → 환경 변수 순서로 병합됩니다.

use crate::audit::Sanitizer;
use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 설정 파일명
pub const AUDIT_CONFIG_FILE: &str = "audit.json";

/// 기본 데이터베이스 파일명
pub const AUDIT_DB_FILE: &str = "audit_log.db";

/// 데이터베이스 경로 환경 변수
pub const ENV_DB_PATH: &str = "ADAUDIT_DB_PATH";

/// 외부에서 지정된 사용자 ID 환경 변수
pub const ENV_USER_ID: &str = "GOOGLE_ADS_USER_ID";

/// 고객 ID 환경 변수
pub const ENV_CUSTOMER_ID: &str = "GOOGLE_ADS_CUSTOMER_ID";

fn default_limit() -> usize {
    100
}

// ============================================================================
// Audit Config
// ============================================================================

/// 감사 로그 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    /// 데이터베이스 경로 (없으면 플랫폼 데이터 디렉토리)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    /// 외부에서 지정된 사용자 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// 고객 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    /// 조회 기본 개수
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// 추가로 제외할 민감 파라미터 이름
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_sensitive_keys: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            user_id: None,
            customer_id: None,
            default_limit: default_limit(),
            extra_sensitive_keys: Vec::new(),
        }
    }
}

/// 설정 파일 한 층 (지정되지 않은 값은 `None`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditConfigLayer {
    db_path: Option<PathBuf>,
    user_id: Option<String>,
    customer_id: Option<String>,
    default_limit: Option<usize>,
    #[serde(default)]
    extra_sensitive_keys: Vec<String>,
}

impl AuditConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 + 환경 변수 병합 로드
    pub fn load() -> Result<Self> {
        let global = JsonStore::global();
        let project = JsonStore::current_project();
        Self::load_with(global.as_ref(), project.as_ref(), |key| {
            std::env::var(key).ok()
        })
    }

    /// 주어진 저장소와 환경 조회 함수로 로드
    pub fn load_with(
        global: Option<&JsonStore>,
        project: Option<&JsonStore>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::new();

        for store in [global, project].into_iter().flatten() {
            if let Some(layer) = store.load_optional::<AuditConfigLayer>(AUDIT_CONFIG_FILE)? {
                config.merge(layer);
            }
        }

        config.apply_env(env);
        Ok(config)
    }

    /// 설정 병합 (지정된 값만 덮어씀)
    fn merge(&mut self, other: AuditConfigLayer) {
        if other.db_path.is_some() {
            self.db_path = other.db_path;
        }
        if other.user_id.is_some() {
            self.user_id = other.user_id;
        }
        if other.customer_id.is_some() {
            self.customer_id = other.customer_id;
        }
        if let Some(limit) = other.default_limit {
            self.default_limit = limit;
        }
        for key in other.extra_sensitive_keys {
            if !self.extra_sensitive_keys.contains(&key) {
                self.extra_sensitive_keys.push(key);
            }
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty(ENV_DB_PATH) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(user) = non_empty(ENV_USER_ID) {
            self.user_id = Some(user);
        }
        if let Some(customer) = non_empty(ENV_CUSTOMER_ID) {
            self.customer_id = Some(customer);
        }
    }

    /// 실제 사용할 데이터베이스 경로
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("adaudit")
                .join(AUDIT_DB_FILE)
        })
    }

    /// 추가 제외 키가 반영된 파라미터 정제기
    pub fn sanitizer(&self) -> Sanitizer {
        Sanitizer::new().with_extra_keys(&self.extra_sensitive_keys)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}
