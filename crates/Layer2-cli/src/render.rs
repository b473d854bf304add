//! 출력 - 표, 통계, 상세 보기, CSV/JSONL 내보내기

use adaudit_foundation::audit::{format_timestamp, AuditEntry, ContextSnapshot, OperationStats};
use serde_json::Value;
use std::borrow::Cow;
use std::io::{self, Write};

/// 내보내기 형식
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Jsonl,
}

// ============================================================================
// Table / Detail
// ============================================================================

pub fn write_whoami(out: &mut impl Write, ctx: &ContextSnapshot, db_path: &str) -> io::Result<()> {
    writeln!(out, "User:     {}", ctx.user_id)?;
    writeln!(out, "Customer: {}", ctx.customer_id)?;
    writeln!(out, "Session:  {}", ctx.session_id)?;
    writeln!(out, "Database: {}", db_path)
}

pub fn write_log_table(out: &mut impl Write, entries: &[AuditEntry]) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "No audit entries found.");
    }

    writeln!(out, "\n📋 Audit Log\n")?;
    writeln!(
        out,
        "{:<7} {:<24} {:<16} {:<9} {:<18} {:<8} {:<26} {:>8}",
        "ID", "Timestamp", "User", "Operation", "Resource", "Status", "Function", "ms"
    )?;
    writeln!(out, "{}", "-".repeat(122))?;

    for entry in entries {
        let ms = entry
            .execution_time_ms
            .map(|ms| ms.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:<7} {:<24} {:<16} {:<9} {:<18} {:<8} {:<26} {:>8}",
            entry.id,
            format_timestamp(&entry.timestamp),
            truncate(&entry.user_id, 16),
            truncate(entry.operation_type.as_str(), 9),
            truncate(&entry.resource_type, 18),
            entry.result_status(),
            truncate(&entry.function_name, 26),
            ms
        )?;
    }

    writeln!(out, "\n{} entries", entries.len())
}

pub fn write_entry(out: &mut impl Write, entry: &AuditEntry) -> io::Result<()> {
    writeln!(out, "ID:          {}", entry.id)?;
    writeln!(out, "Timestamp:   {}", format_timestamp(&entry.timestamp))?;
    writeln!(out, "User:        {}", entry.user_id)?;
    writeln!(out, "Customer:    {}", entry.customer_id)?;
    writeln!(out, "Session:     {}", entry.session_id)?;
    writeln!(out, "Operation:   {}", entry.operation_type)?;
    writeln!(out, "Resource:    {}", entry.resource_type)?;
    if let Some(resource_id) = &entry.resource_id {
        writeln!(out, "Resource ID: {}", resource_id)?;
    }
    writeln!(out, "Function:    {}", entry.function_name)?;
    writeln!(out, "Status:      {}", entry.result_status())?;
    if let Some(ms) = entry.execution_time_ms {
        writeln!(out, "Duration:    {} ms", ms)?;
    }

    if let Some(params) = &entry.parameters {
        writeln!(out, "\nParameters:\n{}", pretty(params))?;
    }
    if let Some(data) = entry.outcome.result_data() {
        writeln!(out, "\nResult:\n{}", pretty(data))?;
    }
    if let Some(error) = entry.outcome.error() {
        writeln!(out, "\nError:")?;
        if let Some(kind) = &error.error_type {
            writeln!(out, "  Type:    {}", kind)?;
        }
        if let Some(code) = &error.code {
            writeln!(out, "  Code:    {}", code)?;
        }
        writeln!(out, "  Message: {}", error.message)?;
        if let Some(trace) = &error.stack_trace {
            writeln!(out, "\nStack trace:\n{}", trace)?;
        }
    }

    Ok(())
}

// ============================================================================
// Statistics
// ============================================================================

pub fn write_stats(out: &mut impl Write, stats: &OperationStats) -> io::Result<()> {
    writeln!(out, "\n📊 Audit Statistics\n")?;
    writeln!(out, "Total operations:  {}", stats.total)?;
    writeln!(out, "Last 24 hours:     {}", stats.last_24h)?;
    writeln!(out, "Errors (24h):      {}", stats.errors_last_24h)?;
    match stats.success_rate() {
        Some(rate) => writeln!(
            out,
            "Success rate:      {:.1}% ({} ok / {} failed)",
            rate, stats.success_count, stats.error_count
        )?,
        None => writeln!(out, "Success rate:      -")?,
    }

    write_counts(out, "By operation type", &stats.by_operation_type)?;
    write_counts(out, "By resource type", &stats.by_resource_type)?;
    write_counts(out, "Most active users", &stats.most_active_users)?;
    write_counts(out, "Errors by type", &stats.errors_by_type)?;
    write_counts(out, "Top error codes", &stats.top_error_codes)
}

fn write_counts(out: &mut impl Write, title: &str, counts: &[(String, u64)]) -> io::Result<()> {
    if counts.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{}:", title)?;
    for (value, count) in counts {
        writeln!(out, "  {:<32} {:>8}", truncate(value, 32), count)?;
    }
    Ok(())
}

// ============================================================================
// Export
// ============================================================================

const CSV_HEADER: [&str; 16] = [
    "id",
    "timestamp",
    "user_id",
    "customer_id",
    "session_id",
    "operation_type",
    "resource_type",
    "resource_id",
    "function_name",
    "result_status",
    "execution_time_ms",
    "parameters",
    "result_data",
    "error_message",
    "error_type",
    "error_code",
];

pub fn export(out: &mut impl Write, entries: &[AuditEntry], format: ExportFormat) -> io::Result<()> {
    match format {
        ExportFormat::Csv => write_csv(out, entries),
        ExportFormat::Jsonl => write_jsonl(out, entries),
    }
}

fn write_csv(out: &mut impl Write, entries: &[AuditEntry]) -> io::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADER)?;

    for entry in entries {
        let error = entry.outcome.error();
        let fields: [String; 16] = [
            entry.id.to_string(),
            format_timestamp(&entry.timestamp),
            entry.user_id.clone(),
            entry.customer_id.clone(),
            entry.session_id.clone(),
            entry.operation_type.to_string(),
            entry.resource_type.clone(),
            entry.resource_id.clone().unwrap_or_default(),
            entry.function_name.clone(),
            entry.result_status().to_string(),
            entry
                .execution_time_ms
                .map(|ms| ms.to_string())
                .unwrap_or_default(),
            entry.parameters.as_ref().map(Value::to_string).unwrap_or_default(),
            entry
                .outcome
                .result_data()
                .map(Value::to_string)
                .unwrap_or_default(),
            error.map(|e| e.message.clone()).unwrap_or_default(),
            error.and_then(|e| e.error_type.clone()).unwrap_or_default(),
            error.and_then(|e| e.code.clone()).unwrap_or_default(),
        ];

        writer.write_record(fields.iter().map(|f| spreadsheet_safe(f).into_owned()))?;
    }

    writer.flush()
}

fn write_jsonl(out: &mut impl Write, entries: &[AuditEntry]) -> io::Result<()> {
    for entry in entries {
        serde_json::to_writer(&mut *out, entry)?;
        writeln!(out)?;
    }
    Ok(())
}

/// 스프레드시트가 수식으로 해석하는 셀 앞에 `'` 추가
fn spreadsheet_safe(value: &str) -> Cow<'_, str> {
    if value.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        Cow::Owned(format!("'{}", value))
    } else {
        Cow::Borrowed(value)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// 문자 단위 자르기
fn truncate(value: &str, max: usize) -> Cow<'_, str> {
    if value.chars().count() <= max {
        return Cow::Borrowed(value);
    }
    let kept: String = value.chars().take(max.saturating_sub(3)).collect();
    Cow::Owned(format!("{}...", kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaudit_foundation::audit::{AuditId, ErrorDetails, OperationType, Outcome};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn sample(outcome: Outcome) -> AuditEntry {
        AuditEntry {
            id: AuditId(7),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap(),
            user_id: "alice".to_string(),
            customer_id: "1234567890".to_string(),
            session_id: "session_1".to_string(),
            operation_type: OperationType::Update,
            resource_type: "CAMPAIGN".to_string(),
            resource_id: Some("customers/1234567890/campaigns/9".to_string()),
            function_name: "update_campaign".to_string(),
            parameters: Some(json!({ "name": "Spring, \"Sale\"" })),
            outcome,
            execution_time_ms: Some(42),
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_csv_formula_cells_are_neutralized() {
        assert_eq!(spreadsheet_safe("plain"), "plain");
        assert_eq!(spreadsheet_safe("=1+1"), "'=1+1");
        assert_eq!(spreadsheet_safe("@SUM(A1)"), "'@SUM(A1)");

        let entry = sample(Outcome::Error(ErrorDetails::new(
            "=HYPERLINK(\"http://evil\", \"x\")",
        )));
        let text = render(|out| export(out, &[entry], ExportFormat::Csv));
        let row = text.lines().nth(1).unwrap();
        assert!(row.contains(r#""'=HYPERLINK(""http://evil"", ""x"")""#));
    }

    #[test]
    fn test_csv_export() {
        let entry = sample(Outcome::Error(
            ErrorDetails::new("quota exceeded")
                .with_type("StatusError")
                .with_code("429"),
        ));
        let text = render(|out| export(out, &[entry], ExportFormat::Csv));
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("7,2026-03-01T08:30:00.000Z,alice,1234567890,session_1,UPDATE,CAMPAIGN,"));
        assert!(row.contains(r#""{""name"":""Spring, \""Sale\""""}""#));
        assert!(row.ends_with(",quota exceeded,StatusError,429"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_jsonl_export() {
        let entries = vec![
            sample(Outcome::Success {
                result_data: Some(json!({ "resource_count": 1 })),
            }),
            sample(Outcome::Error(ErrorDetails::new("boom"))),
        ];
        let text = render(|out| export(out, &entries, ExportFormat::Jsonl));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, entries[0]);
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["result_status"], "ERROR");
        assert_eq!(second["error_message"], "boom");
        assert!(second.get("message").is_none());
    }

    #[test]
    fn test_entry_detail() {
        let text = render(|out| {
            write_entry(
                out,
                &sample(Outcome::Error(ErrorDetails::new("boom").with_code("INTERNAL"))),
            )
        });
        assert!(text.contains("Resource ID: customers/1234567890/campaigns/9"));
        assert!(text.contains("Status:      ERROR"));
        assert!(text.contains("  Code:    INTERNAL"));
        assert!(!text.contains("Result:"));
    }

    #[test]
    fn test_stats_output() {
        let stats = OperationStats {
            total: 4,
            success_count: 3,
            error_count: 1,
            by_operation_type: vec![("CREATE".to_string(), 4)],
            ..Default::default()
        };
        let text = render(|out| write_stats(out, &stats));
        assert!(text.contains("Success rate:      75.0% (3 ok / 1 failed)"));
        assert!(text.contains("By operation type:"));
        assert!(!text.contains("Top error codes:"));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("캠페인 일시정지 작업", 6), "캠페인...");
        assert_eq!(truncate("short", 10), "short");
    }
}
