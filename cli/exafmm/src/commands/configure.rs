//! `exafmm configure`: probe the toolchain and write the build description.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::parser::ValueSource;
use clap::{ArgMatches, Args, Command};
use exafmm_configure::{
    BuildProvenance, CommandLine, ConfigurationStage, ConfigureSummary, OptionSet, PackageList,
    ProjectNames,
};
use exafmm_toolchain::{
    FileProbe, FortranRequest, HostPlatform, ProbeRequest, SystemProbe, Toolchain,
    ToolchainProbe,
};
use tracing::info;

use crate::manifest::ExafmmManifest;

/// Options accepted by `exafmm configure`.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigureArgs {
    /// Architecture tag naming the output directory
    #[arg(long, env = "EXAFMM_ARCH")]
    pub arch: Option<String>,
    /// Installation prefix (e.g. /usr/local)
    #[arg(long)]
    pub prefix: Option<String>,
    /// Location of auxiliary modules
    #[arg(long)]
    pub load_path: Option<PathBuf>,
    /// Build shared libraries
    #[arg(long, value_parser = BoolishValueParser::new(), num_args = 0..=1, require_equals = true, default_missing_value = "1")]
    pub with_shared_libraries: Option<bool>,
    /// Enable dynamic loading
    #[arg(long, value_parser = BoolishValueParser::new(), num_args = 0..=1, require_equals = true, default_missing_value = "1")]
    pub with_dynamic_loading: Option<bool>,
    /// Make this arch the default for `make`
    #[arg(long, value_parser = BoolishValueParser::new(), num_args = 0..=1, require_equals = true, default_missing_value = "1")]
    pub with_default_arch: Option<bool>,
    /// Target device (e.g. cpu, gpu)
    #[arg(long)]
    pub with_device: Option<String>,
    /// Expansion basis (e.g. Cartesian, Spherical)
    #[arg(long)]
    pub with_expansion: Option<String>,
    /// Link against BLAS/LAPACK
    #[arg(long, value_parser = BoolishValueParser::new(), num_args = 0..=1, require_equals = true, default_missing_value = "1")]
    pub with_blas: Option<bool>,
    /// BLAS/LAPACK libraries, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub with_blas_lapack_lib: Vec<String>,
    /// Build with MPI
    #[arg(long, value_parser = BoolishValueParser::new(), num_args = 0..=1, require_equals = true, default_missing_value = "1")]
    pub with_mpi: Option<bool>,
    /// MPI libraries, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub with_mpi_lib: Vec<String>,
    /// MPI include directories, comma separated
    #[arg(long, value_delimiter = ',')]
    pub with_mpi_include: Vec<String>,
    /// C compiler
    #[arg(long)]
    pub with_cc: Option<String>,
    /// C++ compiler
    #[arg(long)]
    pub with_cxx: Option<String>,
    /// Fortran compiler, or 0 to build without Fortran
    #[arg(long)]
    pub with_fc: Option<String>,
    #[arg(long = "CFLAGS", allow_hyphen_values = true)]
    pub cflags: Option<String>,
    #[arg(long = "CXXFLAGS", allow_hyphen_values = true)]
    pub cxxflags: Option<String>,
    #[arg(long = "FFLAGS", allow_hyphen_values = true)]
    pub fflags: Option<String>,
    #[arg(long = "CPPFLAGS", allow_hyphen_values = true)]
    pub cppflags: Option<String>,
    #[arg(long = "LDFLAGS", allow_hyphen_values = true)]
    pub ldflags: Option<String>,
    /// Libraries every executable links against
    #[arg(long = "LIBS", allow_hyphen_values = true)]
    pub libs: Option<String>,
    /// Load the toolchain from a .toolchain.toml instead of probing
    #[arg(long)]
    pub with_toolchain: Option<PathBuf>,
    #[arg(long, hide = true, default_value = "ExaFMM.Configure")]
    pub config_modules: String,
    #[arg(long, hide = true, default_value = "ExaFMM.compilerOptions")]
    pub options_module: String,
}

impl ConfigureArgs {
    /// Resolve the option set: defaults, then the manifest, then flags.
    pub fn options(&self, project_dir: &Path, manifest: Option<&ExafmmManifest>) -> OptionSet {
        let mut options = OptionSet::defaults(project_dir);
        if let Some(defaults) = manifest.map(|m| &m.configure) {
            if let Some(device) = &defaults.device {
                options.with_device = device.clone();
            }
            if let Some(expansion) = &defaults.expansion {
                options.with_expansion = expansion.clone();
            }
            if let Some(default_arch) = defaults.default_arch {
                options.with_default_arch = default_arch;
            }
            if let Some(prefix) = &defaults.prefix {
                options.prefix = prefix.clone();
            }
        }

        if let Some(prefix) = &self.prefix {
            options.prefix = prefix.clone();
        }
        if let Some(load_path) = &self.load_path {
            options.load_path = load_path.clone();
        }
        if let Some(device) = &self.with_device {
            options.with_device = device.clone();
        }
        if let Some(expansion) = &self.with_expansion {
            options.with_expansion = expansion.clone();
        }
        options.with_shared_libraries = self.with_shared_libraries.unwrap_or(options.with_shared_libraries);
        options.with_dynamic_loading = self.with_dynamic_loading.unwrap_or(options.with_dynamic_loading);
        options.with_default_arch = self.with_default_arch.unwrap_or(options.with_default_arch);
        options.with_blas = self.with_blas.unwrap_or(options.with_blas);
        if !self.with_blas_lapack_lib.is_empty() {
            options.blas_lapack_libs = self.with_blas_lapack_lib.clone();
        }
        options.with_mpi = self.with_mpi.unwrap_or(options.with_mpi);
        if !self.with_mpi_lib.is_empty() {
            options.mpi_libs = self.with_mpi_lib.clone();
        }
        options.mpi_includes = self.with_mpi_include.clone();
        options
    }

    /// What to ask the toolchain probe for.
    pub fn probe_request(&self, options: &OptionSet) -> ProbeRequest {
        let fc = match self.with_fc.as_deref() {
            None => FortranRequest::Auto,
            Some("0") => FortranRequest::Disabled,
            Some(program) => FortranRequest::Compiler(program.to_string()),
        };
        ProbeRequest {
            cc: self.with_cc.clone(),
            cxx: self.with_cxx.clone(),
            fc,
            cflags: self.cflags.clone(),
            cxxflags: self.cxxflags.clone(),
            fflags: self.fflags.clone(),
            cppflags: self.cppflags.clone(),
            ldflags: self.ldflags.clone(),
            libs: self
                .libs
                .as_ref()
                .map(|l| l.split_whitespace().map(String::from).collect()),
            shared_libraries: Some(options.with_shared_libraries),
        }
    }

    fn probe(&self) -> Box<dyn ToolchainProbe> {
        match &self.with_toolchain {
            Some(path) => Box::new(FileProbe::new(path)),
            None => Box::new(SystemProbe::new()),
        }
    }
}

/// Rebuild the arguments the user typed, as `--name=value`, in the order
/// they were given. Defaults and environment values are left out.
pub fn explicit_arguments(command: &Command, matches: &ArgMatches) -> CommandLine {
    let mut given: Vec<(usize, String)> = Vec::new();
    for arg in command.get_arguments() {
        let Some(long) = arg.get_long() else {
            continue;
        };
        let id = arg.get_id().as_str();
        if matches.value_source(id) != Some(ValueSource::CommandLine) {
            continue;
        }
        let index = matches.index_of(id).unwrap_or(usize::MAX);
        let value = matches
            .get_raw(id)
            .map(|values| {
                values
                    .map(|v| v.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_else(|| "1".to_string());
        given.push((index, format!("--{long}={value}")));
    }
    given.sort_by_key(|(index, _)| *index);
    CommandLine::from_args(given.into_iter().map(|(_, raw)| raw))
}

/// Assemble the stage from resolved inputs.
pub fn build_stage(
    project_dir: &Path,
    manifest: Option<&ExafmmManifest>,
    args: &ConfigureArgs,
    command_line: CommandLine,
    toolchain: Toolchain,
    reconfigure_program: PathBuf,
) -> ConfigurationStage {
    let options = args.options(project_dir, manifest);
    let arch = args
        .arch
        .clone()
        .or_else(|| manifest.and_then(|m| m.configure.arch.clone()))
        .unwrap_or_else(|| toolchain.derived_arch());
    let project = manifest
        .map(|m| ProjectNames::new(&m.project.name))
        .unwrap_or_default();
    let packages = PackageList::from_options(
        &options,
        manifest.map(|m| m.packages.clone()).unwrap_or_default(),
    );
    let c_fixes = manifest.map(ExafmmManifest::fix_lines).unwrap_or_default();
    let provenance = BuildProvenance::capture(&HostPlatform::current());

    ConfigurationStage {
        project,
        dir: project_dir.to_path_buf(),
        arch,
        options,
        command_line,
        toolchain,
        packages,
        c_fixes,
        provenance,
        reconfigure_program,
    }
}

/// Probe, configure, and print the summary.
pub fn run(
    project_dir: &Path,
    manifest: Option<&ExafmmManifest>,
    args: &ConfigureArgs,
    command_line: CommandLine,
) -> Result<ConfigureSummary> {
    let options = args.options(project_dir, manifest);
    let toolchain = args
        .probe()
        .detect(&args.probe_request(&options))
        .context("detecting compilers")?;
    let program = std::env::current_exe().context("locating the exafmm executable")?;

    let stage = build_stage(project_dir, manifest, args, command_line, toolchain, program);
    info!(arch = %stage.arch, "running configure stage");
    let summary = stage
        .run()
        .with_context(|| format!("configuring {}", project_dir.display()))?;
    println!("{summary}");
    Ok(summary)
}
