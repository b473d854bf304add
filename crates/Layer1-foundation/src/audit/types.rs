//! Audit Log Types - 감사 로그 타입 정의
//!
//! 광고 API에 대한 변경 작업(생성/수정/삭제/호출)의 감사 기록 타입입니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// Audit Entry ID
// ============================================================================

/// 감사 로그 엔트리 ID (저장소가 삽입 시 부여, 단조 증가)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditId(pub i64);

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ============================================================================
// Operation Type
// ============================================================================

/// 감사 대상 작업 종류
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationType {
    /// 리소스 생성
    Create,
    /// 리소스 수정
    Update,
    /// 리소스 삭제
    Remove,
    /// 일반 API 호출
    ApiCall,
    /// 확장용 사용자 정의 종류
    Other(String),
}

impl OperationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Remove => "REMOVE",
            Self::ApiCall => "API_CALL",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for OperationType {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => Self::Create,
            "UPDATE" => Self::Update,
            "REMOVE" => Self::Remove,
            "API_CALL" => Self::ApiCall,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for OperationType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<OperationType> for String {
    fn from(op: OperationType) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ============================================================================
// Result Status
// ============================================================================

/// 작업 결과 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Success,
    Error,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ============================================================================
// Operation Meta
// ============================================================================

/// 감사 대상 작업의 메타데이터 (작업 종류, 리소스 종류, 함수 이름)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMeta {
    pub operation_type: OperationType,
    pub resource_type: String,
    pub function_name: String,
}

impl OperationMeta {
    pub fn new(
        operation_type: OperationType,
        resource_type: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            operation_type,
            resource_type: resource_type.into(),
            function_name: function_name.into(),
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// 실패한 작업의 에러 상세
///
/// 직렬화 필드 이름은 저장소 컬럼 이름과 같습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// 에러 메시지
    #[serde(rename = "error_message")]
    pub message: String,

    /// 에러 종류 이름
    pub error_type: Option<String>,

    /// 에러 코드 (벤더 에러 또는 상태 코드에서 추출)
    #[serde(rename = "error_code")]
    pub code: Option<String>,

    /// 스택 트레이스
    pub stack_trace: Option<String>,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }
}

/// 작업 결과
///
/// 에러 관련 필드는 `Error` 변형에만 존재합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success { result_data: Option<Value> },
    Error(ErrorDetails),
}

impl Outcome {
    pub fn status(&self) -> ResultStatus {
        match self {
            Self::Success { .. } => ResultStatus::Success,
            Self::Error(_) => ResultStatus::Error,
        }
    }

    pub fn result_data(&self) -> Option<&Value> {
        match self {
            Self::Success { result_data } => result_data.as_ref(),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorDetails> {
        match self {
            Self::Success { .. } => None,
            Self::Error(details) => Some(details),
        }
    }
}

// ============================================================================
// New Audit Entry (삽입 전)
// ============================================================================

/// 저장 전 감사 엔트리
///
/// `id`는 저장소가 부여하며, `timestamp`가 없으면 삽입 시각을 사용합니다.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub user_id: String,
    pub customer_id: String,
    pub session_id: String,
    pub operation_type: OperationType,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub function_name: String,
    pub parameters: Option<Value>,
    pub outcome: Outcome,
    pub execution_time_ms: Option<u64>,
}

impl NewAuditEntry {
    /// 성공 엔트리 생성 (식별 정보는 `with_identity`로 설정)
    pub fn new(meta: &OperationMeta) -> Self {
        Self {
            timestamp: None,
            user_id: String::new(),
            customer_id: String::new(),
            session_id: String::new(),
            operation_type: meta.operation_type.clone(),
            resource_type: meta.resource_type.clone(),
            resource_id: None,
            function_name: meta.function_name.clone(),
            parameters: None,
            outcome: Outcome::Success { result_data: None },
            execution_time_ms: None,
        }
    }

    pub fn with_identity(
        mut self,
        user_id: impl Into<String>,
        customer_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        self.user_id = user_id.into();
        self.customer_id = customer_id.into();
        self.session_id = session_id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_result_data(mut self, result_data: Value) -> Self {
        self.outcome = Outcome::Success {
            result_data: Some(result_data),
        };
        self
    }

    pub fn with_error(mut self, details: ErrorDetails) -> Self {
        self.outcome = Outcome::Error(details);
        self
    }

    pub fn with_duration(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = Some(execution_time_ms);
        self
    }
}

// ============================================================================
// Audit Entry (저장됨)
// ============================================================================

/// 감사 로그 엔트리
///
/// 저장 이후에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub customer_id: String,
    pub session_id: String,
    pub operation_type: OperationType,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub function_name: String,
    pub parameters: Option<Value>,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub execution_time_ms: Option<u64>,
}

impl AuditEntry {
    pub fn result_status(&self) -> ResultStatus {
        self.outcome.status()
    }

    pub fn is_success(&self) -> bool {
        self.result_status().is_success()
    }
}

// ============================================================================
// Audit Query
// ============================================================================

/// 감사 로그 조회 필터 (모든 조건은 AND)
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub operation_type: Option<OperationType>,
    pub resource_type: Option<String>,

    /// 시작 시간 (포함)
    pub from: Option<DateTime<Utc>>,

    /// 종료 시간 (포함)
    pub to: Option<DateTime<Utc>>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_operation(mut self, operation_type: OperationType) -> Self {
        self.operation_type = Some(operation_type);
        self
    }

    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_time_range(self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.with_from(from).with_to(to)
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_type_strings() {
        assert_eq!(OperationType::Create.as_str(), "CREATE");
        assert_eq!(OperationType::from("api_call"), OperationType::ApiCall);
        assert_eq!(
            OperationType::from("PAUSE"),
            OperationType::Other("PAUSE".to_string())
        );
        assert_eq!(String::from(OperationType::Remove), "REMOVE");
    }

    #[test]
    fn test_new_entry_builder() {
        let meta = OperationMeta::new(OperationType::Create, "CAMPAIGN", "create_campaign");
        let entry = NewAuditEntry::new(&meta)
            .with_identity("alice", "1234567890", "session_1")
            .with_resource_id("customers/1234567890/campaigns/9")
            .with_parameters(json!({ "name": "Spring Sale" }))
            .with_result_data(json!({ "resource_count": 1 }))
            .with_duration(42);

        assert_eq!(entry.function_name, "create_campaign");
        assert_eq!(entry.outcome.status(), ResultStatus::Success);
        assert_eq!(
            entry.outcome.result_data(),
            Some(&json!({ "resource_count": 1 }))
        );
        assert_eq!(entry.execution_time_ms, Some(42));
    }

    #[test]
    fn test_error_outcome_has_no_result_data() {
        let meta = OperationMeta::new(OperationType::Update, "KEYWORD", "update_keyword");
        let entry = NewAuditEntry::new(&meta)
            .with_result_data(json!({ "resource_count": 3 }))
            .with_error(ErrorDetails::new("boom").with_code("INVALID_ARGUMENT"));

        assert_eq!(entry.outcome.status(), ResultStatus::Error);
        assert!(entry.outcome.result_data().is_none());
        assert_eq!(
            entry.outcome.error().and_then(|e| e.code.as_deref()),
            Some("INVALID_ARGUMENT")
        );
    }

    #[test]
    fn test_entry_serializes_flat_status() {
        let entry = AuditEntry {
            id: AuditId(7),
            timestamp: Utc::now(),
            user_id: "alice".to_string(),
            customer_id: "123".to_string(),
            session_id: "session_1".to_string(),
            operation_type: OperationType::Remove,
            resource_type: "AD".to_string(),
            resource_id: None,
            function_name: "remove_ad".to_string(),
            parameters: None,
            outcome: Outcome::Error(ErrorDetails::new("not found").with_code("404")),
            execution_time_ms: Some(5),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["result_status"], "ERROR");
        assert_eq!(value["operation_type"], "REMOVE");
        assert_eq!(value["error_message"], "not found");
        assert_eq!(value["error_code"], "404");
        assert!(value.get("message").is_none());
        assert!(value.get("code").is_none());

        let back: AuditEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
