use std::path::Path;

use serde::{Deserialize, Serialize};

/// Which files are pipeline metadata and stay out of the resource groups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScmConfig {
    /// Extensions of tracking declaration files, without the dot.
    pub metadata_extensions: Vec<String>,
    /// Exact file names of ignore lists.
    pub ignore_file_names: Vec<String>,
}

impl Default for ScmConfig {
    fn default() -> Self {
        Self {
            metadata_extensions: vec!["dvc".to_string()],
            ignore_file_names: vec![".gitignore".to_string(), ".dvcignore".to_string()],
        }
    }
}

impl ScmConfig {
    /// Returns `true` if `path` is a tracking declaration or an ignore list.
    pub fn is_metadata(&self, path: &Path) -> bool {
        let by_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.metadata_extensions.iter().any(|m| m == ext));
        let by_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.ignore_file_names.iter().any(|n| n == name));
        by_extension || by_name
    }
}
