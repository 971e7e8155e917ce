//! `exafmm doctor`: toolchain diagnostics.

use std::path::Path;
use std::process::Command;

use anyhow::Result;
use exafmm_toolchain::{Language, ProbeRequest, SystemProbe, Toolchain, ToolchainProbe};

use crate::manifest::ExafmmManifest;

/// Print toolchain diagnostic information.
pub fn run(project_dir: &Path) -> Result<()> {
    println!("=== ExaFMM Doctor ===");
    println!();
    println!("exafmm version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("--- Compilers ---");
    match SystemProbe::new().detect(&ProbeRequest::default()) {
        Ok(toolchain) => print_toolchain(&toolchain),
        Err(e) => println!("  detection failed: {e}"),
    }
    println!();

    println!("--- System Tools ---");
    print_tool_status("make", &["--version"]);
    print_tool_status("mpicxx", &["--version"]);
    println!();

    println!("--- Project Status ---");
    match ExafmmManifest::find_and_load(project_dir) {
        Ok(Some((manifest, dir))) => {
            println!("  exafmm.toml: found at {}", dir.display());
            println!("  Project:     {}", manifest.project.name);
            println!("  Version:     {}", manifest.project.version);
            if let Some(arch) = &manifest.configure.arch {
                println!("  Arch:        {arch}");
            }
        }
        Ok(None) => {
            println!("  exafmm.toml: not found");
        }
        Err(e) => {
            println!("  exafmm.toml: error: {e:#}");
        }
    }

    Ok(())
}

fn print_toolchain(toolchain: &Toolchain) {
    println!("  Host: {} ({})", toolchain.host.description, toolchain.host.hostname);
    println!("  Arch tag: {}", toolchain.derived_arch());
    for language in Language::ALL {
        let label = language.to_string();
        match toolchain.language(language) {
            Ok(view) => println!(
                "  {label:<8} {} [{}] linker {}",
                view.compiler(),
                view.compiler_vendor(),
                view.linker()
            ),
            Err(_) => println!("  {label:<8} not found"),
        }
    }
}

fn print_tool_status(name: &str, args: &[&str]) {
    match Command::new(name).args(args).output() {
        Ok(output) => {
            let version = String::from_utf8_lossy(&output.stdout);
            let first_line = version.lines().next().unwrap_or("(unknown version)");
            println!("  {name}: {first_line}");
        }
        Err(_) => {
            println!("  {name}: not found");
        }
    }
}
