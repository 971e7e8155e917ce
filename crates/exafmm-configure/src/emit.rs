//! Macro emission from resolved options and toolchain facts.
//!
//! Each language is read through a [`LanguageView`](exafmm_toolchain::LanguageView)
//! held only for the block that queries it, so views never overlap.

use exafmm_toolchain::{Language, LinkerQuirk, Toolchain};
use tracing::debug;

use crate::error::Result;
use crate::options::OptionSet;
use crate::tables::{library_flags, StageTables};

/// Set `DEVICE` from `with-device`, verbatim.
pub fn resolve_device(options: &OptionSet, tables: &mut StageTables) {
    tables.macros.add("DEVICE", options.with_device.as_str());
}

/// Set `EXPAND` from `with-expansion`, verbatim.
pub fn resolve_expansion(options: &OptionSet, tables: &mut StageTables) {
    tables.macros.add("EXPAND", options.with_expansion.as_str());
}

/// Preprocessor definitions selecting the device and expansion kernels.
fn kernel_defines(options: &OptionSet) -> String {
    format!(" -D{} -D{}", options.with_device, options.with_expansion)
}

/// Emit the C, C++ and Fortran compiler and linker macros.
pub fn emit_compiler_macros(
    toolchain: &Toolchain,
    options: &OptionSet,
    tables: &mut StageTables,
) -> Result<()> {
    {
        let c = toolchain.language(Language::C)?;
        tables.macros.add("CC", c.compiler());
        tables.macros.add("CC_FLAGS", c.compiler_flags());
    }

    let pcc_linker = {
        let cxx = toolchain.language(Language::Cxx)?;
        tables.macros.add("PCC", cxx.compiler());
        tables.macros.add("PCC_FLAGS", cxx.compiler_flags());
        tables.macros.add("CC_SUFFIX", cxx.object_suffix());
        tables.macros.add("PCC_LINKER", cxx.linker());
        tables.macros.add("PCC_LINKER_FLAGS", cxx.linker_flags());
        tables.macros.add("CC_LINKER_SUFFIX", cxx.executable_suffix());
        tables.macros.add(
            "CPP_FLAGS",
            format!("{}{}", cxx.preprocessor_flags(), kernel_defines(options)),
        );
        cxx.linker().to_string()
    };

    match &toolchain.fortran {
        Some(fortran) => {
            let fc = toolchain.language(Language::Fortran)?;
            tables.defines.add("HAVE_FORTRAN", 1);
            tables.macros.add("FC", fc.compiler());
            tables.macros.add("FPP_FLAGS", fc.preprocessor_flags());
            tables.macros.add("FC_FLAGS", fc.compiler_flags());
            tables.macros.add("FC_SUFFIX", fc.object_suffix());

            if fc.linker_vendor().usable_as_linker() {
                tables.macros.add("FC_LINKER", fc.linker());
            } else {
                debug!(vendor = %fc.linker_vendor(), linker = %pcc_linker, "fortran linker replaced by C++ linker");
                tables.macros.add("FC_LINKER", pcc_linker.as_str());
            }
            tables.macros.add("FC_LINKER_FLAGS", fc.linker_flags());

            let modules = &fortran.module_flags;
            tables
                .macros
                .add("FC_MODULE_FLAG", modules.include_flag.as_deref().unwrap_or("-I"));
            if modules.include_flag.is_some() {
                tables
                    .macros
                    .add("FC_MODULE_OUTPUT_FLAG", modules.output_flag.as_deref().unwrap_or(""));
            }

            if toolchain.has_quirk(LinkerQuirk::DarwinCommonsUseDylibs) {
                tables.macros.add(
                    "DARWIN_COMMONS_USE_DYLIBS",
                    format!(" {} ", LinkerQuirk::DarwinCommonsUseDylibs.flag()),
                );
            }
        }
        None => {
            tables.macros.add("FC", "");
        }
    }

    emit_shared_library_linker(toolchain, tables)
}

fn emit_shared_library_linker(toolchain: &Toolchain, tables: &mut StageTables) -> Result<()> {
    let cxx = toolchain.language(Language::Cxx)?;
    tables.macros.add("SL_LINKER", cxx.linker());
    tables.macros.add("SL_LINKER_FLAGS", "${PCC_LINKER_FLAGS}");

    let ext = cxx.shared_library_suffix();
    if ext == toolchain.static_library_ext {
        tables.macros.add("SL_LINKER_SUFFIX", "");
        tables.defines.add("SLSUFFIX", "\"\"");
    } else {
        tables.macros.add("SL_LINKER_SUFFIX", ext);
        tables.defines.add("SLSUFFIX", format!("\"{ext}\""));
    }
    Ok(())
}

/// Emit `PCC_LINKER_LIBS` from the Fortran and C++ runtimes plus `LIBS`,
/// and point `SL_LINKER_LIBS` at it.
pub fn emit_linker_libraries(toolchain: &Toolchain, tables: &mut StageTables) -> Result<()> {
    let mut libs: Vec<String> = Vec::new();
    if toolchain.has_fortran() {
        let fc = toolchain.language(Language::Fortran)?;
        libs.extend(fc.runtime_libs().iter().cloned());
    }
    {
        let cxx = toolchain.language(Language::Cxx)?;
        libs.extend(cxx.runtime_libs().iter().cloned());
    }
    libs.extend(toolchain.base_libs.iter().cloned());

    tables.macros.add("PCC_LINKER_LIBS", library_flags(&libs));
    tables.macros.add("SL_LINKER_LIBS", "${PCC_LINKER_LIBS}");
    Ok(())
}

/// Emit the install location and feature switches.
pub fn emit_option_macros(options: &OptionSet, options_string: &str, tables: &mut StageTables) {
    let switch = |on: bool| if on { "1" } else { "0" };

    tables.macros.add("PREFIX", options.prefix.as_str());
    tables
        .macros
        .add("LOAD_PATH", options.load_path.display().to_string());
    tables
        .macros
        .add("SHARED_LIBRARIES", switch(options.with_shared_libraries));
    tables
        .macros
        .add("DYNAMIC_LOADING", switch(options.with_dynamic_loading));
    tables
        .macros
        .add("CONFIGURE_OPTIONS", options_string.replace('"', "\\\""));

    if options.with_shared_libraries {
        tables.defines.add("USE_SHARED_LIBRARIES", 1);
    }
    if options.with_dynamic_loading {
        tables.defines.add("USE_DYNAMIC_LOADING", 1);
    }
}
