//! Parameter Sanitizer - 민감 파라미터 제거
//!
//! 자격 증명, 토큰, 비밀번호, 서비스/클라이언트 핸들은 감사 로그에 기록하지 않습니다.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::OnceLock;

// ============================================================
// 민감 키 패턴
// ============================================================

/// 민감 키 패턴 (대소문자 무시)
///
/// - `client`, `service`: 정확히 일치 (내부 핸들)
/// - 나머지: 키 이름에 포함되면 제외
fn sensitive_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(client|service)$|password|passwd|token|secret|credential|api[_-]?key|private[_-]?key|authorization",
        )
        .expect("sensitive key pattern is valid")
    })
}

/// 기본 패턴 기준 민감 키 여부
pub fn is_sensitive_key(key: &str) -> bool {
    sensitive_key_pattern().is_match(key)
}

/// 파라미터 정제기
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    /// 추가 제외 키 (소문자, 정확히 일치)
    extra_keys: Vec<String>,
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 추가 제외 키 설정
    pub fn with_extra_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_keys
            .extend(keys.into_iter().map(|k| k.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        is_sensitive_key(key) || self.extra_keys.contains(&key.to_ascii_lowercase())
    }

    /// 모든 깊이의 객체에서 민감 키 제거
    pub fn sanitize(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .filter(|(key, _)| !self.is_sensitive(key))
                    .map(|(key, v)| (key, self.sanitize(v)))
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.sanitize(v)).collect())
            }
            other => other,
        }
    }
}

// ============================================================
// Parameter Snapshot
// ============================================================

/// 작업 파라미터 스냅샷 빌더
///
/// 직렬화에 실패한 값은 문자열 표현으로 대체됩니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditParams {
    fields: Map<String, Value>,
}

impl AuditParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// 직렬화 가능한 값 추가
    pub fn arg<T: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &T) -> Self {
        self.fields.insert(key.into(), to_value_lossy(value));
        self
    }

    /// 직렬화할 수 없는 값은 Debug 표현으로 추가
    pub fn debug_arg(mut self, key: impl Into<String>, value: &dyn Debug) -> Self {
        self.fields
            .insert(key.into(), Value::String(format!("{:?}", value)));
        self
    }

    /// 구조체 전체를 파라미터로 사용
    ///
    /// 이름 없는 값(튜플, 배열, 스칼라)은 민감 키 검사를 할 수 없으므로
    /// 값 대신 `args_count`만 기록합니다.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match to_value_lossy(value) {
            Value::Object(fields) => Self { fields },
            Value::Null => Self::new(),
            Value::Array(items) => Self::new().arg("args_count", &items.len()),
            _ => Self::new().arg("args_count", &1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON 값으로 변환 (비어 있으면 `None`)
    pub fn into_value(self) -> Option<Value> {
        (!self.fields.is_empty()).then_some(Value::Object(self.fields))
    }
}

fn to_value_lossy<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("<unserializable: {}>", e)))
}

// ============================================================
// 테스트
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_sensitive_keys() {
        for key in [
            "password",
            "token",
            "client",
            "service",
            "Developer_Token",
            "refresh_token",
            "client_secret",
            "API-KEY",
            "credentials",
        ] {
            assert!(is_sensitive_key(key), "{} should be sensitive", key);
        }

        for key in ["campaign_id", "client_name", "service_area", "budget_amount"] {
            assert!(!is_sensitive_key(key), "{} should be kept", key);
        }
    }

    #[test]
    fn test_sanitize_nested() {
        let sanitizer = Sanitizer::new().with_extra_keys(["Login_Customer_Id"]);
        let value = json!({
            "campaign_id": "42",
            "token": "abc",
            "login_customer_id": "999",
            "auth": { "password": "hunter2", "user": "alice" },
            "ops": [{ "secret": "x", "name": "kw" }]
        });

        let sanitized = sanitizer.sanitize(value);
        assert_eq!(
            sanitized,
            json!({
                "campaign_id": "42",
                "auth": { "user": "alice" },
                "ops": [{ "name": "kw" }]
            })
        );
    }

    #[test]
    fn test_params_builder() {
        #[derive(Debug)]
        struct Handle;

        let params = AuditParams::new()
            .arg("name", "Spring Sale")
            .arg("budget_micros", &5_000_000u64)
            .debug_arg("handle", &Handle);

        assert_eq!(
            params.into_value(),
            Some(json!({
                "name": "Spring Sale",
                "budget_micros": 5_000_000u64,
                "handle": "Handle"
            }))
        );
        assert_eq!(AuditParams::new().into_value(), None);
    }

    #[test]
    fn test_unserializable_falls_back_to_string() {
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);

        let params = AuditParams::new().arg("ok", &1).arg("bad", &bad);
        let value = params.into_value().unwrap();

        assert_eq!(value["ok"], 1);
        assert!(value["bad"]
            .as_str()
            .is_some_and(|s| s.starts_with("<unserializable:")));
    }

    #[test]
    fn test_from_serialize() {
        #[derive(Serialize)]
        struct CreateKeywords<'a> {
            ad_group_id: &'a str,
            keywords: Vec<&'a str>,
        }

        let params = AuditParams::from_serialize(&CreateKeywords {
            ad_group_id: "77",
            keywords: vec!["running shoes", "trail shoes"],
        });
        assert_eq!(
            params.into_value(),
            Some(json!({ "ad_group_id": "77", "keywords": ["running shoes", "trail shoes"] }))
        );

        let scalar = AuditParams::from_serialize(&"customers/1/campaigns/2");
        assert_eq!(scalar.into_value(), Some(json!({ "args_count": 1 })));
        assert!(AuditParams::from_serialize(&()).is_empty());
    }

    #[test]
    fn test_positional_values_are_not_recorded() {
        let params = AuditParams::from_serialize(&("dev-token-SECRET", "Spring", 3));
        let value = params.into_value().unwrap();

        assert_eq!(value, json!({ "args_count": 3 }));
        assert!(!value.to_string().contains("dev-token-SECRET"));
    }
}
