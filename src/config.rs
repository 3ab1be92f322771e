//! Optional project configuration, `stt.toml`.
//!
//! Entirely optional: a source file or directory passed on the command
//! line works with no manifest at all. When present, `stt.toml` only
//! adjusts how the driver finds files and how conversion checking behaves
//! — it never carries elaborated state, so re-running with a stale
//! manifest can't desync from the source the way a lockfile could.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub elaborate: ElaborateSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectSection {
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElaborateSection {
    #[serde(default)]
    pub force_full_convert: bool,
}

impl Default for ElaborateSection {
    fn default() -> Self {
        ElaborateSection { force_full_convert: false }
    }
}

impl Config {
    /// Look for `stt.toml` in `dir`, returning the default (empty) config
    /// if it isn't there.
    pub fn discover(dir: &Path) -> Result<Config, String> {
        let path = dir.join("stt.toml");
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Config, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("reading {}: {}", path.display(), e))?;
        toml::from_str(&text).map_err(|e| format!("parsing {}: {}", path.display(), e))
    }

    /// Resolve the configured source list against `base`, falling back to
    /// `base` itself if none were configured.
    pub fn resolved_sources(&self, base: &Path) -> Vec<PathBuf> {
        if self.project.sources.is_empty() {
            vec![base.to_path_buf()]
        } else {
            self.project.sources.iter().map(|s| base.join(s)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_falls_back_to_the_base_path() {
        let cfg = Config::default();
        let base = Path::new("/tmp/proj");
        assert_eq!(cfg.resolved_sources(base), vec![base.to_path_buf()]);
    }

    #[test]
    fn parses_project_and_elaborate_sections() {
        let toml_src = r#"
            [project]
            sources = ["preamble.stt", "main.stt"]

            [elaborate]
            force_full_convert = true
        "#;
        let cfg: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(cfg.project.sources, vec!["preamble.stt", "main.stt"]);
        assert!(cfg.elaborate.force_full_convert);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert!(cfg.project.sources.is_empty());
        assert!(!cfg.elaborate.force_full_convert);
    }
}
