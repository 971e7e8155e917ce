//! Macro and define tables accumulated during a run.
//!
//! Both tables are keyed maps with last-write-wins semantics. They are
//! flushed once, sorted by key, so identical inputs give identical files.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::trace;

/// Makefile variables, written as `KEY=value` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    entries: BTreeMap<String, String>,
}

impl MacroTable {
    /// Set `name` to `value`, returning the value it replaced.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        trace!(%name, %value, "make macro");
        self.entries.insert(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render in makefile-variable syntax.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.iter() {
            out.push_str(name);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

/// Preprocessor symbols for the generated configuration header.
///
/// Names are stored without the project prefix; the header renderer adds it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefineTable {
    entries: BTreeMap<String, String>,
}

impl DefineTable {
    pub fn add(&mut self, name: impl Into<String>, value: impl ToString) -> Option<String> {
        let name = name.into();
        let value = value.to_string();
        trace!(%name, %value, "define");
        self.entries.insert(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// All tables of one configuration run.
#[derive(Debug, Clone, Default)]
pub struct StageTables {
    pub macros: MacroTable,
    pub defines: DefineTable,
}

/// Turn library references into linker arguments, dropping duplicates.
///
/// Flags pass through, bare names become `-l<name>`, shared libraries given
/// by path become `-L<dir> -l<name>`, and archives stay as full paths.
pub fn library_flags<S: AsRef<str>>(libs: &[S]) -> String {
    let mut args: Vec<String> = Vec::new();
    for lib in libs {
        for arg in library_argument(lib.as_ref()) {
            if !args.contains(&arg) {
                args.push(arg);
            }
        }
    }
    args.join(" ")
}

fn library_argument(lib: &str) -> Vec<String> {
    let lib = lib.trim();
    if lib.is_empty() {
        return Vec::new();
    }
    if lib.starts_with('-') {
        return lib.split_whitespace().map(String::from).collect();
    }

    let path = Path::new(lib);
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or(lib);
    if let Some(name) = shared_library_name(file_name) {
        let dir = path.parent().and_then(|d| d.to_str()).unwrap_or("");
        if dir.is_empty() {
            return vec![format!("-l{name}")];
        }
        return vec![format!("-L{dir}"), format!("-l{name}")];
    }
    if lib.contains('/') || lib.ends_with(".a") || lib.ends_with(".lib") {
        return vec![lib.to_string()];
    }
    vec![format!("-l{lib}")]
}

/// `libfoo.so`, `libfoo.so.1.2`, `libfoo.dylib` → `foo`.
fn shared_library_name(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_prefix("lib")?;
    [".dylib", ".dll", ".so"].iter().find_map(|ext| {
        let idx = stem.find(ext)?;
        let rest = &stem[idx + ext.len()..];
        (rest.is_empty() || rest.starts_with('.')).then(|| &stem[..idx])
    })
}

/// Turn include directories into `-I` arguments, dropping duplicates.
pub fn include_flags<S: AsRef<str>>(dirs: &[S]) -> String {
    let mut args: Vec<String> = Vec::new();
    for dir in dirs {
        let dir = dir.as_ref().trim();
        if dir.is_empty() {
            continue;
        }
        let arg = if dir.starts_with("-I") {
            dir.to_string()
        } else {
            format!("-I{dir}")
        };
        if !args.contains(&arg) {
            args.push(arg);
        }
    }
    args.join(" ")
}
