//! 서브커맨드 실행

use crate::filters::FilterArgs;
use crate::render::{self, ExportFormat};
use adaudit_foundation::audit::{AuditDashboard, AuditId, AuditStore, OperationContext};
use adaudit_foundation::config::ENV_DB_PATH;
use adaudit_foundation::{AuditConfig, Error};
use anyhow::{bail, Context};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 열린 저장소와 컨텍스트
pub struct App {
    pub config: AuditConfig,
    pub store: Arc<AuditStore>,
    pub context: Arc<OperationContext>,
}

impl App {
    pub fn open(config: AuditConfig) -> anyhow::Result<Self> {
        let db_path = config.resolved_db_path();
        let store = AuditStore::open(&db_path)
            .with_context(|| format!("Failed to open audit database at {}", db_path.display()))?;
        let context = OperationContext::from_config(&config);

        Ok(Self {
            config,
            store: Arc::new(store),
            context: Arc::new(context),
        })
    }

    fn dashboard(&self) -> AuditDashboard {
        AuditDashboard::new(self.store.clone())
    }

    pub fn whoami(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let db_path = self.store.path().display().to_string();
        render::write_whoami(out, &self.context.snapshot(), &db_path)?;
        Ok(())
    }

    pub fn stats(&self, out: &mut impl Write, json: bool) -> anyhow::Result<()> {
        let stats = self.dashboard().snapshot()?;
        if json {
            serde_json::to_writer_pretty(&mut *out, &stats)?;
            writeln!(out)?;
        } else {
            render::write_stats(out, &stats)?;
        }
        Ok(())
    }

    pub fn logs(
        &self,
        out: &mut impl Write,
        filters: &FilterArgs,
        limit: Option<usize>,
        json: bool,
    ) -> anyhow::Result<()> {
        let limit = limit.unwrap_or(self.config.default_limit);
        let entries = self.dashboard().filtered_logs(&filters.to_query()?, limit)?;

        if json {
            serde_json::to_writer_pretty(&mut *out, &entries)?;
            writeln!(out)?;
        } else {
            render::write_log_table(out, &entries)?;
        }
        Ok(())
    }

    pub fn show(&self, out: &mut impl Write, id: i64, json: bool) -> anyhow::Result<()> {
        let entry = self
            .store
            .get(AuditId(id))?
            .ok_or_else(|| Error::NotFound(format!("audit entry {}", id)))?;

        if json {
            serde_json::to_writer_pretty(&mut *out, &entry)?;
            writeln!(out)?;
        } else {
            render::write_entry(out, &entry)?;
        }
        Ok(())
    }

    /// 내보내기 (`out_path`가 없으면 표준 출력)
    pub fn export(
        &self,
        stdout: &mut impl Write,
        filters: &FilterArgs,
        format: ExportFormat,
        limit: Option<usize>,
        out_path: Option<&Path>,
    ) -> anyhow::Result<usize> {
        let entries = self
            .dashboard()
            .filtered_logs(&filters.to_query()?, limit.unwrap_or(usize::MAX))?;

        match out_path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let mut writer = BufWriter::new(file);
                render::export(&mut writer, &entries, format)?;
                writer.flush()?;
                info!(count = entries.len(), path = %path.display(), "Exported audit entries");
            }
            None => render::export(stdout, &entries, format)?,
        }

        Ok(entries.len())
    }

    /// 전체 삭제 (`--yes`가 없으면 `yes` 입력 필요)
    pub fn clear(
        &self,
        out: &mut impl Write,
        input: &mut impl BufRead,
        assume_yes: bool,
    ) -> anyhow::Result<Option<u64>> {
        let total = self.store.count_all()?;
        if total == 0 {
            writeln!(out, "Audit log is already empty.")?;
            return Ok(Some(0));
        }

        if !assume_yes {
            write!(
                out,
                "This permanently deletes {} audit entries from {}.\nType 'yes' to continue: ",
                total,
                self.store.path().display()
            )?;
            out.flush()?;

            let mut answer = String::new();
            input.read_line(&mut answer)?;
            if answer.trim() != "yes" {
                writeln!(out, "Aborted.")?;
                return Ok(None);
            }
        }

        let deleted = self.store.clear_all()?;
        writeln!(out, "✓ Deleted {} audit entries.", deleted)?;
        Ok(Some(deleted))
    }
}

/// 종료 시 출력할 에러 메시지
///
/// 사용자 입력 문제는 원인만, 저장소 문제는 경로 힌트와 함께 출력합니다.
pub fn exit_message(err: &anyhow::Error) -> String {
    match err.chain().find_map(|cause| cause.downcast_ref::<Error>()) {
        Some(e) if e.is_user_facing() => format!("Error: {}", e),
        Some(e) if e.is_storage() => format!(
            "Error: {:#}\nCheck the audit database path (--db or {}).",
            err, ENV_DB_PATH
        ),
        _ => format!("Error: {:#}", err),
    }
}

/// `--out` 경로와 형식 확장자가 맞지 않으면 거부
pub fn check_export_path(path: &Path, format: ExportFormat) -> anyhow::Result<()> {
    let expected = match format {
        ExportFormat::Csv => "csv",
        ExportFormat::Jsonl => "jsonl",
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.eq_ignore_ascii_case(expected) => {
            bail!(
                "Output file extension '.{}' does not match format '{}'",
                ext,
                expected
            )
        }
        _ => Ok(()),
    }
}
