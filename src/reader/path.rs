//! `${VARIABLE}` expansion and base-directory resolution for resource paths.

use std::env;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

/// Expands `${VARIABLE}` references in resource paths and resolves relative
/// paths against a base directory. Failures leave a message retrievable with
/// [`error_message`](Self::error_message) so callers can attach document
/// positions.
#[derive(Debug, Default)]
pub struct PathVariableProcessor {
    variables: FxHashMap<String, String>,
    base_directory: PathBuf,
    error: String,
}

impl PathVariableProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn set_base_directory(&mut self, directory: impl Into<PathBuf>) {
        self.base_directory = directory.into();
    }

    #[must_use]
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.error
    }

    /// Expands `path` into a filesystem path. Registered variables take
    /// precedence over environment variables. With `must_exist` the expanded
    /// path is also checked against the filesystem.
    pub fn expand(&mut self, path: &str, must_exist: bool) -> Option<PathBuf> {
        self.error.clear();
        let expanded = match self.substitute_variables(path) {
            Ok(expanded) => expanded,
            Err(message) => {
                self.error = message;
                return None;
            }
        };
        let mut result = PathBuf::from(expanded);
        if result.is_relative() && !self.base_directory.as_os_str().is_empty() {
            result = self.base_directory.join(result);
        }
        if must_exist && !result.exists() {
            self.error = format!("\"{}\" does not exist", result.display());
            return None;
        }
        Some(result)
    }

    fn substitute_variables(&self, path: &str) -> Result<String, String> {
        let mut out = String::with_capacity(path.len());
        let mut rest = path;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                return Err(format!("unterminated variable reference in \"{path}\""));
            };
            let name = &after[..end];
            if let Some(value) = self.variables.get(name) {
                out.push_str(value);
            } else if let Ok(value) = env::var(name) {
                out.push_str(&value);
            } else {
                return Err(format!("path variable \"{name}\" is not defined"));
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_are_substituted() {
        let mut processor = PathVariableProcessor::new();
        processor.set_variable("SHARE", "/opt/share");
        let path = processor.expand("${SHARE}/model.yaml", false).unwrap();
        assert_eq!(path, PathBuf::from("/opt/share/model.yaml"));
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let mut processor = PathVariableProcessor::new();
        assert!(processor
            .expand("${SURELY_NOT_DEFINED_ANYWHERE}/x", false)
            .is_none());
        assert!(processor.error_message().contains("SURELY_NOT_DEFINED"));
    }

    #[test]
    fn relative_paths_resolve_against_the_base_directory() {
        let mut processor = PathVariableProcessor::new();
        processor.set_base_directory("/data/scenes");
        let path = processor.expand("mesh/cube.yaml", false).unwrap();
        assert_eq!(path, PathBuf::from("/data/scenes/mesh/cube.yaml"));
    }

    #[test]
    fn missing_file_check() {
        let mut processor = PathVariableProcessor::new();
        assert!(processor.expand("/no/such/file.yaml", true).is_none());
        assert!(processor.error_message().contains("does not exist"));
    }
}
