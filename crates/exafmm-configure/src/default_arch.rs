//! The project-level marker naming the default architecture.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::artifacts::{ensure_dir, write_artifact};
use crate::error::{ConfigureError, Result};
use crate::stage::ProjectNames;

/// What happened to the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultArchOutcome {
    /// The marker now points at the configured arch.
    Written(PathBuf),
    /// A stale marker was deleted.
    Removed(PathBuf),
    /// No marker existed and none was wanted.
    Absent,
}

/// `<dir>/conf/<project>variables`.
pub fn marker_path(dir: &Path, names: &ProjectNames) -> PathBuf {
    dir.join("conf").join(format!("{}variables", names.lower))
}

/// Marker contents: arch, project dir, and an include of the arch variables.
pub fn render_marker(dir: &Path, arch: &str, names: &ProjectNames) -> String {
    let dir = dir.display();
    format!(
        "{upper}_ARCH={arch}\n{upper}_DIR={dir}\ninclude {dir}/{arch}/conf/{lower}variables\n",
        upper = names.upper,
        lower = names.lower,
    )
}

/// Write the marker when `enabled`, otherwise remove any stale one.
pub fn configure_default_arch(
    dir: &Path,
    arch: &str,
    names: &ProjectNames,
    enabled: bool,
) -> Result<DefaultArchOutcome> {
    let path = marker_path(dir, names);
    if enabled {
        ensure_dir(&dir.join("conf"))?;
        write_artifact(&path, &render_marker(dir, arch, names))?;
        info!(%arch, path = %path.display(), "default architecture set");
        return Ok(DefaultArchOutcome::Written(path));
    }

    match std::fs::remove_file(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale default-arch marker");
            Ok(DefaultArchOutcome::Removed(path))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(DefaultArchOutcome::Absent),
        Err(source) => Err(ConfigureError::RemoveStaleDefaultArch { path, source }),
    }
}
