//! 조회 필터 - `logs` / `export` 공통 옵션

use adaudit_foundation::audit::{AuditQuery, OperationType};
use adaudit_foundation::strings::canonical_resource_type;
use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Args;

/// 공통 필터 옵션
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only entries recorded for this user
    #[arg(long)]
    pub user: Option<String>,

    /// Only entries for this customer ID
    #[arg(long)]
    pub customer: Option<String>,

    /// Operation type (CREATE, UPDATE, REMOVE, API_CALL)
    #[arg(long)]
    pub operation: Option<String>,

    /// Resource type (CAMPAIGN, AD_GROUP, KEYWORD, ...)
    #[arg(long)]
    pub resource: Option<String>,

    /// Start date, inclusive (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub since: Option<String>,

    /// End date, inclusive (YYYY-MM-DD covers the whole day, or RFC 3339)
    #[arg(long)]
    pub until: Option<String>,
}

impl FilterArgs {
    pub fn to_query(&self) -> anyhow::Result<AuditQuery> {
        let mut query = AuditQuery::new();

        if let Some(user) = &self.user {
            query = query.with_user(user.clone());
        }
        if let Some(customer) = &self.customer {
            query = query.with_customer(customer.clone());
        }
        if let Some(operation) = &self.operation {
            query = query.with_operation(OperationType::from(operation.as_str()));
        }
        if let Some(resource) = &self.resource {
            let resource_type = canonical_resource_type(resource)
                .map(str::to_string)
                .unwrap_or_else(|| resource.clone());
            query = query.with_resource_type(resource_type);
        }

        let from = self
            .since
            .as_deref()
            .map(|s| parse_date(s, DayBound::Start))
            .transpose()?;
        let to = self
            .until
            .as_deref()
            .map(|s| parse_date(s, DayBound::End))
            .transpose()?;

        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                bail!("--since must not be after --until");
            }
        }
        if let Some(from) = from {
            query = query.with_from(from);
        }
        if let Some(to) = to {
            query = query.with_to(to);
        }

        Ok(query)
    }
}

#[derive(Debug, Clone, Copy)]
enum DayBound {
    Start,
    End,
}

/// 날짜만 주어지면 하루의 시작/끝으로 확장
fn parse_date(input: &str, bound: DayBound) -> anyhow::Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD or RFC 3339", input))?;
    let time = match bound {
        DayBound::Start => NaiveTime::from_hms_opt(0, 0, 0).context("Invalid start-of-day time")?,
        DayBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
            .context("Invalid end-of-day time")?,
    };
    Ok(date.and_time(time).and_utc())
}
