//! Option set and command-line record for a configuration run.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Argument key selecting the configure module; implicit when it names ours.
pub const CONFIG_MODULES_KEY: &str = "config-modules";
/// Argument key selecting the compiler-options module; implicit when default.
pub const OPTIONS_MODULE_KEY: &str = "options-module";
/// Argument key selecting the architecture tag.
pub const ARCH_KEY: &str = "arch";

/// Resolved option values. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OptionSet {
    /// Installation prefix; empty when unset.
    pub prefix: String,
    /// Location of auxiliary modules.
    pub load_path: PathBuf,
    pub with_shared_libraries: bool,
    pub with_dynamic_loading: bool,
    /// Make this arch the default for builds that do not set `<PROJECT>_ARCH`.
    pub with_default_arch: bool,
    /// Target device, passed through verbatim (e.g. "cpu", "gpu").
    pub with_device: String,
    /// Expansion basis, passed through verbatim (e.g. "Cartesian", "Spherical").
    pub with_expansion: String,
    pub with_blas: bool,
    pub blas_lapack_libs: Vec<String>,
    pub with_mpi: bool,
    pub mpi_libs: Vec<String>,
    pub mpi_includes: Vec<String>,
}

impl OptionSet {
    /// Default options for a project rooted at `project_dir`.
    pub fn defaults(project_dir: &Path) -> Self {
        Self {
            prefix: String::new(),
            load_path: project_dir.join("modules"),
            with_shared_libraries: false,
            with_dynamic_loading: false,
            with_default_arch: true,
            with_device: "cpu".into(),
            with_expansion: "Cartesian".into(),
            with_blas: false,
            blas_lapack_libs: vec!["-llapack".into(), "-lblas".into()],
            with_mpi: false,
            mpi_libs: vec!["-lmpi".into()],
            mpi_includes: Vec::new(),
        }
    }
}

/// The explicitly supplied command-line arguments, keyed by option name.
///
/// Arguments keep their first position; a later argument with the same key
/// replaces the earlier one's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    entries: Vec<(String, String)>,
}

impl CommandLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw arguments such as `--with-device=gpu`.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cl = Self::new();
        for arg in args {
            cl.push(arg);
        }
        cl
    }

    /// Record one raw argument.
    pub fn push(&mut self, raw: impl Into<String>) {
        let raw = raw.into();
        let (key, _) = Self::parse_argument(&raw);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = raw,
            None => self.entries.push((key, raw)),
        }
    }

    /// Split an argument into `(key, value)`.
    ///
    /// Leading dashes are stripped; an argument without `=` is a flag whose
    /// value is `"1"`.
    pub fn parse_argument(arg: &str) -> (String, String) {
        let stripped = arg.trim_start_matches('-');
        match stripped.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (stripped.to_string(), "1".to_string()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// The value of `key`, if it was supplied.
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, raw)| Self::parse_argument(raw).1)
    }

    /// `(key, raw argument)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, raw)| (k.as_str(), raw.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Space-joined arguments, leaving out the module-selection keys.
    pub fn options_string(&self) -> String {
        self.iter()
            .filter(|(key, _)| *key != CONFIG_MODULES_KEY && *key != OPTIONS_MODULE_KEY)
            .map(|(_, raw)| raw)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
