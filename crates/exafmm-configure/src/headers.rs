//! C header rendering: configuration defines, fix-ups, and build metadata.

use std::fmt::Write as _;
use std::path::Path;

use exafmm_toolchain::{Language, Toolchain};

use crate::error::Result;
use crate::provenance::BuildProvenance;
use crate::stage::ProjectNames;
use crate::tables::{include_flags, DefineTable};

const RULE: &str = "-----------------------------------------";

/// Escape `s` for use inside a C string literal.
pub fn c_string_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// `<project>conf.h`: every define as `#define <PROJECT>_<NAME> <value>`.
pub fn render_conf_header(names: &ProjectNames, defines: &DefineTable) -> String {
    let guard = format!("INCLUDED_{}CONF_H", names.upper);
    let mut out = String::new();
    let _ = writeln!(out, "#ifndef {guard}");
    let _ = writeln!(out, "#define {guard}");
    out.push('\n');
    for (name, value) in defines.iter() {
        let _ = writeln!(out, "#define {}_{name} {value}", names.upper);
    }
    out.push('\n');
    let _ = writeln!(out, "#endif");
    out
}

/// `<project>fix.h`: prototype and typedef fix-ups, one per line.
pub fn render_fix_header(names: &ProjectNames, fixes: &[String]) -> String {
    let guard = format!("INCLUDED_{}FIX_H", names.upper);
    let mut out = String::new();
    let _ = writeln!(out, "#ifndef {guard}");
    let _ = writeln!(out, "#define {guard}");
    out.push('\n');
    for line in fixes {
        let _ = writeln!(out, "{line}");
    }
    if !fixes.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "#endif");
    out
}

/// `<project>configinfo.h`: configure time and options.
pub fn render_config_info(
    names: &ProjectNames,
    provenance: &BuildProvenance,
    options_string: &str,
) -> String {
    format!(
        "static const char *{p}configureruntime = \"{}\";\n\
         static const char *{p}configureoptions = \"{}\";\n",
        c_string_escape(&provenance.timestamp),
        c_string_escape(options_string),
        p = names.lower,
    )
}

/// Inputs of `<project>machineinfo.h` beyond the toolchain.
#[derive(Debug, Clone, Copy)]
pub struct MachineContext<'a> {
    pub names: &'a ProjectNames,
    pub provenance: &'a BuildProvenance,
    pub dir: &'a Path,
    pub arch: &'a str,
    /// Package include directories (valgrind excluded).
    pub package_includes: &'a [String],
}

/// `<project>machineinfo.h`: host, compilers, include paths, and linkers.
pub fn render_machine_info(ctx: &MachineContext<'_>, toolchain: &Toolchain) -> Result<String> {
    let p = &ctx.names.lower;
    let mut out = String::new();

    open_constant(&mut out, p, "machineinfo");
    line(
        &mut out,
        &format!(
            "Libraries compiled on {} on {} ",
            ctx.provenance.timestamp, ctx.provenance.hostname
        ),
    );
    line(
        &mut out,
        &format!("Machine characteristics: {}", ctx.provenance.platform),
    );
    line(
        &mut out,
        &format!("Using {} directory: {}", ctx.names.display, ctx.dir.display()),
    );
    line(&mut out, &format!("Using {} arch: {}", ctx.names.display, ctx.arch));
    close_constant(&mut out);

    open_constant(&mut out, p, "compilerinfo");
    {
        let c = toolchain.language(Language::C)?;
        line(
            &mut out,
            &format!(
                "Using C compiler: {} {} ${{COPTFLAGS}} ${{CFLAGS}}",
                c.compiler(),
                c.compiler_flags()
            ),
        );
    }
    {
        let cxx = toolchain.language(Language::Cxx)?;
        line(
            &mut out,
            &format!(
                "Using C++ compiler: {} {} ${{CXXOPTFLAGS}} ${{CXXFLAGS}}",
                cxx.compiler(),
                cxx.compiler_flags()
            ),
        );
    }
    if toolchain.has_fortran() {
        let fc = toolchain.language(Language::Fortran)?;
        line(
            &mut out,
            &format!(
                "Using Fortran compiler: {} {} ${{FOPTFLAGS}} ${{FFLAGS}} {}",
                fc.compiler(),
                fc.compiler_flags(),
                fc.preprocessor_flags()
            ),
        );
    }
    close_constant(&mut out);

    open_constant(&mut out, p, "compilerflagsinfo");
    let arch_include = ctx.dir.join(ctx.arch).join("include");
    let project_include = ctx.dir.join("include");
    let mut paths = vec![
        format!("-I{}", arch_include.display()),
        format!("-I{}", project_include.display()),
    ];
    let packages = include_flags(ctx.package_includes);
    if !packages.is_empty() {
        paths.push(packages);
    }
    line(&mut out, &format!("Using include paths: {}", paths.join(" ")));
    close_constant(&mut out);

    open_constant(&mut out, p, "linkerinfo");
    {
        let cxx = toolchain.language(Language::Cxx)?;
        line(&mut out, &format!("Using C++ linker: {}", cxx.linker()));
    }
    if toolchain.has_fortran() {
        let fc = toolchain.language(Language::Fortran)?;
        line(&mut out, &format!("Using Fortran linker: {}", fc.linker()));
    }
    close_constant(&mut out);

    Ok(out)
}

fn open_constant(out: &mut String, project: &str, name: &str) {
    let _ = writeln!(out, "static const char *{project}{name} = \"\\n\"");
    line(out, RULE);
}

fn close_constant(out: &mut String) {
    let _ = writeln!(out, "\"{RULE}\\n\";");
}

fn line(out: &mut String, text: &str) {
    let _ = writeln!(out, "\"{}\\n\"", c_string_escape(text));
}
