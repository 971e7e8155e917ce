//! `exafmm.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use exafmm_configure::PackageDescriptor;
use serde::{Deserialize, Serialize};

/// The top-level manifest of an ExaFMM checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExafmmManifest {
    #[serde(default)]
    pub project: ProjectConfig,
    /// Defaults for `exafmm configure`; command-line flags win.
    #[serde(default)]
    pub configure: ConfigureDefaults,
    /// Optional packages beyond `--with-blas` and `--with-mpi`.
    #[serde(default)]
    pub packages: Vec<PackageDescriptor>,
    /// Lines for the generated fix-up header.
    #[serde(default)]
    pub fixes: Vec<FixEntry>,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
        }
    }
}

fn default_name() -> String {
    "ExaFMM".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// `[configure]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigureDefaults {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub expansion: Option<String>,
    #[serde(default)]
    pub default_arch: Option<bool>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

/// A `[[fixes]]` entry: one C declaration for the fix-up header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixEntry {
    pub line: String,
}

impl ExafmmManifest {
    /// Search upward from `start_dir` for an `exafmm.toml`, parse it, and
    /// return it with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join("exafmm.toml");
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: ExafmmManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing exafmm.toml")
    }

    /// Fix-up header lines in manifest order.
    pub fn fix_lines(&self) -> Vec<String> {
        self.fixes.iter().map(|f| f.line.clone()).collect()
    }
}
