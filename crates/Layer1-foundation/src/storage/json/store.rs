//! JSON 설정 파일 읽기
//!
//! 설정 파일은 사용자가 직접 작성하므로 이 저장소는 읽기만 합니다.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// 글로벌 설정 디렉토리 이름 (<config_dir>/adaudit/)
const APP_DIR: &str = "adaudit";

/// 프로젝트 설정 디렉토리 이름 (<project>/.adaudit/)
const PROJECT_DIR: &str = ".adaudit";

/// 설정 디렉토리 하나
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 플랫폼 설정 디렉토리 (찾을 수 없으면 `None`)
    pub fn global() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join(APP_DIR)))
    }

    pub fn project(root: impl Into<PathBuf>) -> Self {
        Self::new(root.into().join(PROJECT_DIR))
    }

    /// 현재 작업 디렉토리 기준 프로젝트 설정
    pub fn current_project() -> Option<Self> {
        std::env::current_dir().ok().map(Self::project)
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// 파일이 없으면 `Ok(None)`, 읽기/파싱 실패는 `Error::Config`
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_project_layout_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::project(dir.path());
        let path = store.file_path("audit.json");
        assert_eq!(path, dir.path().join(".adaudit").join("audit.json"));

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "customerId": "123-456-7890" }"#).unwrap();

        let loaded: Option<BTreeMap<String, String>> = store.load_optional("audit.json").unwrap();
        assert_eq!(
            loaded.unwrap().get("customerId").map(String::as_str),
            Some("123-456-7890")
        );
    }

    #[test]
    fn test_load_optional_missing() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());

        let loaded: Option<BTreeMap<String, String>> = store.load_optional("missing.json").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_malformed_is_config_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        std::fs::write(store.file_path("audit.json"), "{ not json").unwrap();

        let err = store
            .load_optional::<BTreeMap<String, String>>("audit.json")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
