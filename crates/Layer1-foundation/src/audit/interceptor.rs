//! Operation Interceptor - 비즈니스 작업 래핑
//!
//! 작업 실행 시간을 재고, 파라미터를 정제해서 기록하고, 결과/에러를 그대로 돌려줍니다.
//! 감사는 관찰만 합니다. 반환값과 에러는 바뀌지 않습니다.
//!
//! ```ignore
//! let interceptor = Interceptor::new(recorder);
//! let meta = OperationMeta::new(OperationType::Create, resource::CAMPAIGN, "create_campaign");
//!
//! let name = interceptor.call(&meta, AuditParams::new().arg("name", &name), || {
//!     api.create_campaign(&name)
//! })?;
//! ```

use super::recorder::AuditRecorder;
use super::sanitize::AuditParams;
use super::types::OperationMeta;
use super::vendor::{AuditableError, ResultSummary};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// 작업 도중 발생한 패닉
#[derive(Debug, Clone, thiserror::Error)]
#[error("panic: {message}")]
pub struct PanicError {
    pub message: String,
}

impl PanicError {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self { message }
    }
}

impl AuditableError for PanicError {
    fn kind(&self) -> String {
        "panic".to_string()
    }
}

/// 작업 인터셉터
#[derive(Debug, Clone)]
pub struct Interceptor {
    recorder: AuditRecorder,
}

impl Interceptor {
    pub fn new(recorder: AuditRecorder) -> Self {
        Self { recorder }
    }

    pub fn recorder(&self) -> &AuditRecorder {
        &self.recorder
    }

    /// 동기 작업 실행 및 기록
    ///
    /// 작업이 패닉하면 ERROR 엔트리를 남긴 뒤 같은 패닉을 다시 일으킵니다.
    pub fn call<T, E, F>(&self, meta: &OperationMeta, params: AuditParams, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: ResultSummary,
        E: AuditableError,
    {
        let started = Instant::now();
        let parameters = params.into_value();

        match panic::catch_unwind(AssertUnwindSafe(op)) {
            Ok(result) => {
                self.finish(meta, parameters, &result, started);
                result
            }
            Err(payload) => {
                let error = PanicError::from_payload(payload.as_ref());
                self.recorder
                    .record_error(meta, &error, parameters, None, elapsed_ms(started));
                panic::resume_unwind(payload)
            }
        }
    }

    /// 비동기 작업 실행 및 기록
    pub async fn call_async<T, E, Fut>(
        &self,
        meta: &OperationMeta,
        params: AuditParams,
        fut: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        T: ResultSummary,
        E: AuditableError,
    {
        let started = Instant::now();
        let parameters = params.into_value();

        let result = fut.await;
        self.finish(meta, parameters, &result, started);
        result
    }

    /// 함수를 감사 대상 함수로 감싸기
    ///
    /// 이름 있는 필드를 가진 인자만 파라미터 스냅샷이 됩니다.
    /// 튜플 같은 위치 인자는 개수(`args_count`)만 기록됩니다.
    pub fn wrap<A, T, E, F>(&self, meta: OperationMeta, f: F) -> impl Fn(A) -> Result<T, E>
    where
        A: Serialize,
        F: Fn(A) -> Result<T, E>,
        T: ResultSummary,
        E: AuditableError,
    {
        let interceptor = self.clone();
        move |args: A| {
            let params = AuditParams::from_serialize(&args);
            interceptor.call(&meta, params, || f(args))
        }
    }

    fn finish<T, E>(
        &self,
        meta: &OperationMeta,
        parameters: Option<Value>,
        result: &Result<T, E>,
        started: Instant,
    ) where
        T: ResultSummary,
        E: AuditableError,
    {
        let execution_time_ms = elapsed_ms(started);
        match result {
            Ok(value) => {
                self.recorder.record_success(
                    meta,
                    parameters,
                    value.resource_id(),
                    value.result_data(),
                    execution_time_ms,
                );
            }
            Err(error) => {
                self.recorder
                    .record_error(meta, error, parameters, None, execution_time_ms);
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::identity::OperationContext;
    use crate::audit::store::AuditStore;
    use crate::audit::types::{AuditQuery, OperationType, ResultStatus};
    use crate::audit::vendor::MutateResponse;
    use serde_json::json;
    use std::sync::Arc;

    fn interceptor() -> Interceptor {
        let store = Arc::new(AuditStore::in_memory().unwrap());
        let context = Arc::new(OperationContext::new().with_customer("42"));
        Interceptor::new(AuditRecorder::new(store, context))
    }

    fn entries(interceptor: &Interceptor) -> Vec<crate::audit::types::AuditEntry> {
        interceptor
            .recorder()
            .store()
            .query(&AuditQuery::new(), 100)
            .unwrap()
    }

    #[test]
    fn test_success_returns_value_unchanged() {
        let interceptor = interceptor();
        let meta = OperationMeta::new(OperationType::Create, "KEYWORD", "add_keywords");

        let response = interceptor
            .call(&meta, AuditParams::new().arg("ad_group_id", "5"), || {
                Ok::<_, crate::Error>(MutateResponse::from_names([
                    "customers/42/adGroupCriteria/5~1",
                    "customers/42/adGroupCriteria/5~2",
                ]))
            })
            .unwrap();
        assert_eq!(response.results.len(), 2);

        let logged = entries(&interceptor);
        assert_eq!(logged.len(), 1);
        assert_eq!(
            logged[0].resource_id.as_deref(),
            Some("customers/42/adGroupCriteria/5~1")
        );
        assert_eq!(
            logged[0].outcome.result_data(),
            Some(&json!({ "resource_count": 2 }))
        );
        assert_eq!(logged[0].function_name, "add_keywords");
    }

    #[test]
    fn test_plain_result_has_no_resource_id() {
        let interceptor = interceptor();
        let meta = OperationMeta::new(OperationType::ApiCall, "GOOGLE_ADS_API", "list_campaigns");

        let count = interceptor
            .call(&meta, AuditParams::new(), || Ok::<_, crate::Error>(3usize))
            .unwrap();
        assert_eq!(count, 3);

        let logged = entries(&interceptor);
        assert!(logged[0].resource_id.is_none());
        assert!(logged[0].parameters.is_none());
    }

    #[test]
    fn test_panic_is_recorded_and_resumed() {
        let interceptor = interceptor();
        let meta = OperationMeta::new(OperationType::Remove, "AD", "remove_ad");

        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = interceptor.call(&meta, AuditParams::new(), || -> Result<(), crate::Error> {
                panic!("ad vanished")
            });
        }));
        assert!(caught.is_err());

        let logged = entries(&interceptor);
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].result_status(), ResultStatus::Error);
        let details = logged[0].outcome.error().unwrap();
        assert_eq!(details.error_type.as_deref(), Some("panic"));
        assert!(details.message.contains("ad vanished"));
    }

    #[test]
    fn test_wrap_snapshots_arguments() {
        #[derive(Serialize)]
        struct PauseCampaign {
            campaign_id: String,
            token: String,
        }

        let interceptor = interceptor();
        let pause = interceptor.wrap(
            OperationMeta::new(OperationType::Update, "CAMPAIGN", "pause_campaign"),
            |args: PauseCampaign| Ok::<_, crate::Error>(format!("customers/42/campaigns/{}", args.campaign_id)),
        );

        let name = pause(PauseCampaign {
            campaign_id: "77".to_string(),
            token: "secret".to_string(),
        })
        .unwrap();
        assert_eq!(name, "customers/42/campaigns/77");

        let logged = entries(&interceptor);
        assert_eq!(logged[0].resource_id.as_deref(), Some("customers/42/campaigns/77"));
        assert_eq!(logged[0].parameters, Some(json!({ "campaign_id": "77" })));
    }

    #[test]
    fn test_wrap_positional_args_record_count_only() {
        let interceptor = interceptor();
        let rename = interceptor.wrap(
            OperationMeta::new(OperationType::Update, "CAMPAIGN", "rename_campaign"),
            |(_token, name): (String, String)| Ok::<_, crate::Error>(name),
        );

        let name = rename(("dev-token-SECRET".to_string(), "Spring".to_string())).unwrap();
        assert_eq!(name, "Spring");

        let logged = entries(&interceptor);
        let parameters = logged[0].parameters.clone().unwrap();
        assert_eq!(parameters, json!({ "args_count": 2 }));
        assert!(!parameters.to_string().contains("dev-token-SECRET"));
    }
}
