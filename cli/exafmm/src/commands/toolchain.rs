//! `exafmm toolchain`: describe, template, and validate toolchain files.

use std::path::Path;

use anyhow::{bail, Context, Result};
use exafmm_toolchain::{
    generate_template, load_toolchain_toml, toolchain_to_toml, validate_toolchain, FileProbe,
    ProbeRequest, SystemProbe, Toolchain, ToolchainProbe,
};

/// Render the detected toolchain, or the one in `file`.
pub fn describe(file: Option<&Path>, format: Option<&str>) -> Result<String> {
    let toolchain: Toolchain = match file {
        Some(path) => FileProbe::new(path).detect(&ProbeRequest::default()),
        None => SystemProbe::new().detect(&ProbeRequest::default()),
    }
    .context("loading toolchain")?;

    match format.unwrap_or("toml") {
        "toml" => Ok(toolchain_to_toml(&toolchain)?),
        "json" => Ok(serde_json::to_string_pretty(&toolchain)?),
        other => bail!("unknown format '{other}' (expected toml or json)"),
    }
}

/// A starting `.toolchain.toml` named `name`.
pub fn template(name: &str) -> Result<String> {
    Ok(generate_template(name)?)
}

/// Check a `.toolchain.toml`; fails only on errors, not warnings.
pub fn validate(file: &Path) -> Result<()> {
    let toolchain = load_toolchain_toml(file)
        .with_context(|| format!("loading {}", file.display()))?;

    match validate_toolchain(&toolchain) {
        Ok(()) => {
            println!("{}: valid", file.display());
            Ok(())
        }
        Err(issues) => {
            for issue in &issues {
                println!("  {}: {}", issue.severity, issue.message);
            }
            let errors = issues.iter().filter(|i| i.severity == "error").count();
            if errors > 0 {
                bail!("{}: {errors} error(s)", file.display());
            }
            println!("{}: valid with {} warning(s)", file.display(), issues.len());
            Ok(())
        }
    }
}
