//! Statistics & Query Facade - 대시보드용 집계/조회
//!
//! 읽기 전용입니다. 캐시 없이 매번 저장소를 조회합니다.

use super::store::AuditStore;
use super::types::{AuditEntry, AuditQuery, ResultStatus};
use crate::Result;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 상위 N개만 보여주는 필드의 기본 개수
pub const TOP_N: usize = 10;

/// 집계 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatField {
    OperationType,
    ResourceType,
    ResultStatus,
    /// 상위 10명
    UserId,
    /// ERROR 행만
    ErrorType,
    /// ERROR 행만, 상위 10개
    ErrorCode,
}

impl StatField {
    pub const ALL: [StatField; 6] = [
        StatField::OperationType,
        StatField::ResourceType,
        StatField::ResultStatus,
        StatField::UserId,
        StatField::ErrorType,
        StatField::ErrorCode,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Self::OperationType => "operation_type",
            Self::ResourceType => "resource_type",
            Self::ResultStatus => "result_status",
            Self::UserId => "user_id",
            Self::ErrorType => "error_type",
            Self::ErrorCode => "error_code",
        }
    }

    fn errors_only(&self) -> bool {
        matches!(self, Self::ErrorType | Self::ErrorCode)
    }

    fn limit(&self) -> Option<usize> {
        match self {
            Self::UserId | Self::ErrorCode => Some(TOP_N),
            _ => None,
        }
    }
}

/// 대시보드 수치 전체
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub total: u64,
    pub last_24h: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub errors_last_24h: u64,
    pub by_operation_type: Vec<(String, u64)>,
    pub by_resource_type: Vec<(String, u64)>,
    pub status_breakdown: Vec<(String, u64)>,
    pub most_active_users: Vec<(String, u64)>,
    pub errors_by_type: Vec<(String, u64)>,
    pub top_error_codes: Vec<(String, u64)>,
}

impl OperationStats {
    /// 성공률 (%), 엔트리가 없으면 `None`
    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.success_count as f64 * 100.0 / self.total as f64)
    }
}

/// 감사 대시보드
#[derive(Debug, Clone)]
pub struct AuditDashboard {
    store: Arc<AuditStore>,
}

impl AuditDashboard {
    pub fn new(store: Arc<AuditStore>) -> Self {
        Self { store }
    }

    pub fn total_count(&self) -> Result<u64> {
        self.store.count_all()
    }

    /// 필드 값별 개수 (개수 내림차순, 같으면 값 오름차순)
    pub fn counts_by(&self, field: StatField) -> Result<Vec<(String, u64)>> {
        self.store
            .group_counts(field.column(), field.errors_only(), field.limit())
    }

    /// 최근 `window` 동안의 엔트리 수
    pub fn recent_count(&self, window: Duration) -> Result<u64> {
        self.store.count_since(Utc::now() - window, None)
    }

    /// 최근 `window` 동안의 ERROR 엔트리 수
    pub fn recent_error_count(&self, window: Duration) -> Result<u64> {
        self.store
            .count_since(Utc::now() - window, Some(ResultStatus::Error))
    }

    pub fn filtered_logs(&self, query: &AuditQuery, limit: usize) -> Result<Vec<AuditEntry>> {
        self.store.query(query, limit)
    }

    /// 모든 대시보드 수치를 한 번에 계산
    pub fn snapshot(&self) -> Result<OperationStats> {
        let day = Duration::hours(24);
        let status_breakdown = self.counts_by(StatField::ResultStatus)?;
        let status_count = |status: ResultStatus| {
            status_breakdown
                .iter()
                .find(|(value, _)| value == status.as_str())
                .map_or(0, |(_, count)| *count)
        };

        Ok(OperationStats {
            total: self.total_count()?,
            last_24h: self.recent_count(day)?,
            success_count: status_count(ResultStatus::Success),
            error_count: status_count(ResultStatus::Error),
            errors_last_24h: self.recent_error_count(day)?,
            by_operation_type: self.counts_by(StatField::OperationType)?,
            by_resource_type: self.counts_by(StatField::ResourceType)?,
            most_active_users: self.counts_by(StatField::UserId)?,
            errors_by_type: self.counts_by(StatField::ErrorType)?,
            top_error_codes: self.counts_by(StatField::ErrorCode)?,
            status_breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::types::{ErrorDetails, NewAuditEntry, OperationMeta, OperationType};

    fn entry(op: OperationType, resource: &str, user: &str) -> NewAuditEntry {
        NewAuditEntry::new(&OperationMeta::new(op, resource, "f"))
            .with_identity(user, "1", "session_1")
    }

    fn dashboard() -> AuditDashboard {
        AuditDashboard::new(Arc::new(AuditStore::in_memory().unwrap()))
    }

    #[test]
    fn test_empty_store() {
        let dashboard = dashboard();
        let stats = dashboard.snapshot().unwrap();

        assert_eq!(stats, OperationStats::default());
        assert_eq!(stats.success_rate(), None);
        for field in StatField::ALL {
            assert!(dashboard.counts_by(field).unwrap().is_empty());
        }
    }

    #[test]
    fn test_error_fields_count_only_errors() {
        let dashboard = dashboard();
        let store = &dashboard.store;

        store
            .try_insert(&entry(OperationType::Create, "CAMPAIGN", "a"))
            .unwrap();
        store
            .try_insert(
                &entry(OperationType::Create, "CAMPAIGN", "a").with_error(
                    ErrorDetails::new("quota")
                        .with_type("VendorError")
                        .with_code("RESOURCE_EXHAUSTED"),
                ),
            )
            .unwrap();
        store
            .try_insert(
                &entry(OperationType::Update, "AD_GROUP", "b")
                    .with_error(ErrorDetails::new("boom").with_type("Error::Internal")),
            )
            .unwrap();

        assert_eq!(
            dashboard.counts_by(StatField::ErrorType).unwrap(),
            vec![
                ("Error::Internal".to_string(), 1),
                ("VendorError".to_string(), 1)
            ]
        );
        assert_eq!(
            dashboard.counts_by(StatField::ErrorCode).unwrap(),
            vec![("RESOURCE_EXHAUSTED".to_string(), 1)]
        );

        let stats = dashboard.snapshot().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.last_24h, 3);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.error_count, 2);
        assert_eq!(stats.errors_last_24h, 2);
        assert_eq!(stats.by_operation_type[0], ("CREATE".to_string(), 2));
    }

    #[test]
    fn test_user_counts_capped() {
        let dashboard = dashboard();
        for i in 0..12 {
            dashboard
                .store
                .try_insert(&entry(OperationType::ApiCall, "GOOGLE_ADS_API", &format!("u{:02}", i)))
                .unwrap();
        }
        dashboard
            .store
            .try_insert(&entry(OperationType::ApiCall, "GOOGLE_ADS_API", "u11"))
            .unwrap();

        let users = dashboard.counts_by(StatField::UserId).unwrap();
        assert_eq!(users.len(), TOP_N);
        assert_eq!(users[0], ("u11".to_string(), 2));
        assert_eq!(users[1], ("u00".to_string(), 1));
    }

    #[test]
    fn test_recent_count_window() {
        let dashboard = dashboard();
        let old = Utc::now() - Duration::days(3);

        dashboard
            .store
            .try_insert(&entry(OperationType::Remove, "AD", "a").with_timestamp(old))
            .unwrap();
        dashboard
            .store
            .try_insert(&entry(OperationType::Remove, "AD", "a"))
            .unwrap();

        assert_eq!(dashboard.recent_count(Duration::hours(24)).unwrap(), 1);
        assert_eq!(dashboard.recent_count(Duration::days(7)).unwrap(), 2);
        assert_eq!(dashboard.total_count().unwrap(), 2);
    }
}
