//! ワークフロー定義ディレクトリの読み込み
//!
//! ディレクトリ内の `*.json` をすべて [`WorkflowSpec`] として読み込み、
//! `api_name` をキーに保持します。

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use super::workflow::WorkflowSpec;
use crate::error::ConfigError;

/// 読み込み済みワークフロー定義の一覧
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    workflows: BTreeMap<String, WorkflowSpec>,
}

impl WorkflowCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// ディレクトリ内の `*.json` を読み込む
    ///
    /// ファイルはパス順に処理し、同じ `api_name` が複数あれば後のファイルで上書きします。
    /// 1つでも不正なファイルがあればエラーを返します。
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            let spec = WorkflowSpec::from_file(&path).map_err(|e| {
                ConfigError::Validation(format!("{}: {e}", path.display()))
            })?;
            debug!(workflow = spec.api_name(), path = %path.display(), "loaded workflow spec");
            catalog.insert(spec);
        }

        Ok(catalog)
    }

    /// 定義を追加（同名があれば置き換え）
    pub fn insert(&mut self, spec: WorkflowSpec) {
        let name = spec.api_name().to_string();
        if self.workflows.insert(name.clone(), spec).is_some() {
            warn!(workflow = %name, "duplicate api_name, replacing earlier definition");
        }
    }

    pub fn get(&self, name: &str) -> Option<&WorkflowSpec> {
        self.workflows.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.workflows.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkflowSpec> {
        self.workflows.values()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}
