//! Vendor Shapes - 광고 API 응답/에러 형태
//!
//! 감사 대상 작업의 결과와 에러에서 정보를 꺼내기 위한 능력(capability) 트레이트입니다.
//!
//! - [`ResultSummary`]: 결과에서 리소스 ID와 요약 데이터 추출
//! - [`AuditableError`]: 에러를 [`ErrorShape`]로 분류

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

// ============================================================================
// Vendor Failure
// ============================================================================

/// 벤더 에러 상세 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorErrorDetail {
    /// 에러 코드 이름 (예: `DUPLICATE_CAMPAIGN_NAME`)
    pub error_code: Option<String>,

    /// 에러 메시지
    pub message: String,

    /// 문제가 된 필드 경로
    pub location: Option<String>,
}

impl VendorErrorDetail {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: Some(error_code.into()),
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// 벤더 실패 상세 목록
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorFailure {
    pub errors: Vec<VendorErrorDetail>,
}

impl VendorFailure {
    pub fn new(errors: Vec<VendorErrorDetail>) -> Self {
        Self { errors }
    }
}

/// 벤더 API 에러
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct VendorError {
    pub message: String,
    pub request_id: Option<String>,
    pub failure: VendorFailure,
}

impl VendorError {
    pub fn new(message: impl Into<String>, failure: VendorFailure) -> Self {
        Self {
            message: message.into(),
            request_id: None,
            failure,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// 상태 코드를 가진 에러 (HTTP, gRPC 등)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct StatusError {
    pub code: String,
    pub message: String,
}

impl StatusError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Shape
// ============================================================================

/// 에러 분류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorShape<'a> {
    /// 벤더 실패 상세 목록을 가진 에러
    Vendor(&'a VendorFailure),
    /// 일반 상태 코드를 가진 에러
    Status(String),
    /// 추가 정보 없음
    Plain,
}

/// 감사 기록이 가능한 에러
pub trait AuditableError: fmt::Display {
    /// 에러 형태
    fn shape(&self) -> ErrorShape<'_> {
        ErrorShape::Plain
    }

    /// 에러 종류 이름
    fn kind(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// 에러가 직접 가진 백트레이스
    fn backtrace_text(&self) -> Option<String> {
        None
    }
}

/// `a::b::Name` → `Name`
pub(crate) fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

impl AuditableError for VendorError {
    fn shape(&self) -> ErrorShape<'_> {
        ErrorShape::Vendor(&self.failure)
    }
}

impl AuditableError for StatusError {
    fn shape(&self) -> ErrorShape<'_> {
        ErrorShape::Status(self.code.clone())
    }
}

impl AuditableError for std::io::Error {
    fn shape(&self) -> ErrorShape<'_> {
        match self.raw_os_error() {
            Some(code) => ErrorShape::Status(code.to_string()),
            None => ErrorShape::Plain,
        }
    }
}

impl AuditableError for crate::Error {
    fn kind(&self) -> String {
        let kind = match self {
            crate::Error::Config(_) => "Config",
            crate::Error::Storage(_) => "Storage",
            crate::Error::NotFound(_) => "NotFound",
            crate::Error::InvalidInput(_) => "InvalidInput",
            crate::Error::Io(_) => "Io",
            crate::Error::Json(_) => "Json",
            crate::Error::Sqlite(_) => "Sqlite",
            crate::Error::Internal(_) => "Internal",
        };
        format!("Error::{}", kind)
    }
}

impl AuditableError for anyhow::Error {
    fn shape(&self) -> ErrorShape<'_> {
        if let Some(vendor) = self.downcast_ref::<VendorError>() {
            return ErrorShape::Vendor(&vendor.failure);
        }
        if let Some(status) = self.downcast_ref::<StatusError>() {
            return ErrorShape::Status(status.code.clone());
        }
        ErrorShape::Plain
    }

    fn kind(&self) -> String {
        if self.downcast_ref::<VendorError>().is_some() {
            "VendorError".to_string()
        } else if self.downcast_ref::<StatusError>().is_some() {
            "StatusError".to_string()
        } else {
            "anyhow::Error".to_string()
        }
    }

    fn backtrace_text(&self) -> Option<String> {
        let backtrace = self.backtrace();
        match backtrace.status() {
            std::backtrace::BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        }
    }
}

// ============================================================================
// Mutate Response
// ============================================================================

/// 변경 요청 결과 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutateResult {
    /// 리소스 이름 (예: `customers/123/campaigns/456`)
    pub resource_name: String,
}

/// 변경 요청 응답
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutateResponse {
    pub results: Vec<MutateResult>,
}

impl MutateResponse {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            results: names
                .into_iter()
                .map(|name| MutateResult {
                    resource_name: name.into(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Result Summary
// ============================================================================

/// 작업 결과에서 감사 정보 추출
///
/// 리소스 ID를 알 수 없으면 `None`을 반환합니다. 이는 에러가 아닙니다.
pub trait ResultSummary {
    /// 영향받은 리소스 ID
    fn resource_id(&self) -> Option<String> {
        None
    }

    /// 결과 요약 데이터
    fn result_data(&self) -> Option<Value> {
        None
    }
}

fn path_like(s: &str) -> Option<String> {
    s.contains('/').then(|| s.to_string())
}

impl ResultSummary for String {
    fn resource_id(&self) -> Option<String> {
        path_like(self)
    }
}

impl ResultSummary for &str {
    fn resource_id(&self) -> Option<String> {
        path_like(self)
    }
}

impl ResultSummary for MutateResponse {
    fn resource_id(&self) -> Option<String> {
        self.results.first().map(|r| r.resource_name.clone())
    }

    fn result_data(&self) -> Option<Value> {
        Some(json!({ "resource_count": self.results.len() }))
    }
}

impl ResultSummary for Value {
    fn resource_id(&self) -> Option<String> {
        match self {
            Value::String(s) => path_like(s),
            Value::Object(map) => map
                .get("results")
                .and_then(Value::as_array)
                .and_then(|results| results.first())
                .and_then(|first| first.get("resource_name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }

    fn result_data(&self) -> Option<Value> {
        self.get("results")
            .and_then(Value::as_array)
            .map(|results| json!({ "resource_count": results.len() }))
    }
}

impl<T: ResultSummary> ResultSummary for Option<T> {
    fn resource_id(&self) -> Option<String> {
        self.as_ref().and_then(ResultSummary::resource_id)
    }

    fn result_data(&self) -> Option<Value> {
        self.as_ref().and_then(ResultSummary::result_data)
    }
}

macro_rules! opaque_result {
    ($($ty:ty),*) => {
        $(impl ResultSummary for $ty {})*
    };
}

opaque_result!((), bool, i32, i64, u32, u64, usize);

// ============================================================================
// 테스트
// ============================================================================
