//! Audit Recorder - 작업 결과를 감사 엔트리로 기록
//!
//! 성공/실패 결과를 현재 [`OperationContext`]와 합쳐 저장소에 넘깁니다.
//! 저장 실패는 로그로만 남고 호출자에게 전파되지 않습니다.

use super::identity::OperationContext;
use super::sanitize::Sanitizer;
use super::store::AuditStore;
use super::types::{AuditId, ErrorDetails, NewAuditEntry, OperationMeta};
use super::vendor::{AuditableError, ErrorShape, VendorFailure};
use crate::config::AuditConfig;
use serde_json::{json, Value};
use std::backtrace::Backtrace;
use std::sync::Arc;

/// 벤더 에러 메시지 접두사
pub const VENDOR_ERROR_PREFIX: &str = "Google Ads API Error";

/// 벤더 에러 코드가 없을 때 사용하는 값
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN";

/// 감사 기록기
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    store: Arc<AuditStore>,
    context: Arc<OperationContext>,
    sanitizer: Sanitizer,
}

impl AuditRecorder {
    pub fn new(store: Arc<AuditStore>, context: Arc<OperationContext>) -> Self {
        Self {
            store,
            context,
            sanitizer: Sanitizer::new(),
        }
    }

    /// 설정의 추가 민감 키를 반영한 기록기
    pub fn from_config(
        store: Arc<AuditStore>,
        context: Arc<OperationContext>,
        config: &AuditConfig,
    ) -> Self {
        Self::new(store, context).with_sanitizer(config.sanitizer())
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn store(&self) -> &Arc<AuditStore> {
        &self.store
    }

    pub fn context(&self) -> &Arc<OperationContext> {
        &self.context
    }

    /// 성공 엔트리 기록
    pub fn record_success(
        &self,
        meta: &OperationMeta,
        parameters: Option<Value>,
        resource_id: Option<String>,
        result_data: Option<Value>,
        execution_time_ms: u64,
    ) -> Option<AuditId> {
        let mut entry = self.base_entry(meta, parameters, resource_id, execution_time_ms);
        if let Some(data) = result_data {
            entry = entry.with_result_data(data);
        }
        self.store.insert(&entry)
    }

    /// 실패 엔트리 기록
    pub fn record_error<E>(
        &self,
        meta: &OperationMeta,
        error: &E,
        parameters: Option<Value>,
        resource_id: Option<String>,
        execution_time_ms: u64,
    ) -> Option<AuditId>
    where
        E: AuditableError + ?Sized,
    {
        let details = decompose_error(error);
        let entry = self
            .base_entry(meta, parameters, resource_id, execution_time_ms)
            .with_error(details);
        self.store.insert(&entry)
    }

    fn base_entry(
        &self,
        meta: &OperationMeta,
        parameters: Option<Value>,
        resource_id: Option<String>,
        execution_time_ms: u64,
    ) -> NewAuditEntry {
        let mut entry = NewAuditEntry::new(meta)
            .with_identity(
                self.context.resolve_user(),
                self.context.resolve_customer(),
                self.context.resolve_session(),
            )
            .with_duration(execution_time_ms);

        if let Some(params) = parameters.map(|p| self.sanitizer.sanitize(p)) {
            if !is_empty_object(&params) {
                entry = entry.with_parameters(params);
            }
        }
        if let Some(id) = resource_id {
            entry = entry.with_resource_id(id);
        }
        entry
    }
}

fn is_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(|m| m.is_empty())
}

/// 에러를 감사용 상세 정보로 분해
///
/// 1. 벤더 실패 목록: 각 항목의 코드/메시지/위치를 JSON으로 묶고 첫 코드를 대표 코드로 사용
/// 2. 상태 코드: 그대로 대표 코드로 사용
/// 3. 그 외: 코드 없이 메시지만
pub fn decompose_error<E: AuditableError + ?Sized>(error: &E) -> ErrorDetails {
    let stack_trace = error
        .backtrace_text()
        .unwrap_or_else(|| Backtrace::force_capture().to_string());

    let details = match error.shape() {
        ErrorShape::Vendor(failure) => {
            let (message, code) = vendor_message(failure);
            let details = ErrorDetails::new(message);
            match code {
                Some(code) => details.with_code(code),
                None => details,
            }
        }
        ErrorShape::Status(code) => ErrorDetails::new(error.to_string()).with_code(code),
        ErrorShape::Plain => ErrorDetails::new(error.to_string()),
    };

    details
        .with_type(error.kind())
        .with_stack_trace(stack_trace)
}

fn vendor_message(failure: &VendorFailure) -> (String, Option<String>) {
    let errors: Vec<Value> = failure
        .errors
        .iter()
        .map(|e| {
            json!({
                "error_code": e.error_code.as_deref().unwrap_or(UNKNOWN_ERROR_CODE),
                "message": e.message,
                "location": e.location,
            })
        })
        .collect();

    let code = failure.errors.first().map(|e| {
        e.error_code
            .clone()
            .unwrap_or_else(|| UNKNOWN_ERROR_CODE.to_string())
    });

    (
        format!("{}: {}", VENDOR_ERROR_PREFIX, Value::Array(errors)),
        code,
    )
}
