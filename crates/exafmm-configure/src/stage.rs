//! The configuration stage: options and toolchain facts in, build files out.

use std::fmt;
use std::path::{Path, PathBuf};

use exafmm_toolchain::Toolchain;
use serde::Serialize;
use tracing::info;

use crate::artifacts::{ensure_dir, write_artifact};
use crate::default_arch::{configure_default_arch, DefaultArchOutcome};
use crate::emit::{
    emit_compiler_macros, emit_linker_libraries, emit_option_macros, resolve_device,
    resolve_expansion,
};
use crate::error::Result;
use crate::headers::{
    render_conf_header, render_config_info, render_fix_header, render_machine_info,
    MachineContext,
};
use crate::options::{CommandLine, OptionSet};
use crate::packages::{aggregate_packages, PackageAggregate, PackageList};
use crate::provenance::BuildProvenance;
use crate::script::{reconfigure_arguments, render_script, script_path, write_script};
use crate::tables::{include_flags, StageTables};

/// The project name in the spellings generated files use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectNames {
    /// As written, e.g. `ExaFMM`.
    pub display: String,
    /// File-name prefix, e.g. `exafmm`.
    pub lower: String,
    /// Macro prefix, e.g. `EXAFMM`.
    pub upper: String,
    /// Default `config-modules` value.
    pub configure_module: String,
    /// Default `options-module` value.
    pub options_module: String,
}

impl ProjectNames {
    pub fn new(name: &str) -> Self {
        Self {
            display: name.to_string(),
            lower: name.to_ascii_lowercase(),
            upper: name.to_ascii_uppercase(),
            configure_module: format!("{name}.Configure"),
            options_module: format!("{name}.compilerOptions"),
        }
    }
}

impl Default for ProjectNames {
    fn default() -> Self {
        Self::new("ExaFMM")
    }
}

/// Where each generated file of one arch lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub include_dir: PathBuf,
    pub lib_dir: PathBuf,
    pub conf_dir: PathBuf,
    pub variables: PathBuf,
    pub conf_header: PathBuf,
    pub fix_header: PathBuf,
    pub config_info: PathBuf,
    pub machine_info: PathBuf,
    pub run_record: PathBuf,
    pub script: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: &Path, arch: &str, names: &ProjectNames) -> Self {
        let root = dir.join(arch);
        let include_dir = root.join("include");
        let conf_dir = root.join("conf");
        let p = &names.lower;
        Self {
            variables: conf_dir.join(format!("{p}variables")),
            conf_header: include_dir.join(format!("{p}conf.h")),
            fix_header: include_dir.join(format!("{p}fix.h")),
            config_info: include_dir.join(format!("{p}configinfo.h")),
            machine_info: include_dir.join(format!("{p}machineinfo.h")),
            run_record: conf_dir.join(format!("{p}configure.json")),
            script: script_path(dir, arch),
            lib_dir: root.join("lib"),
            include_dir,
            conf_dir,
        }
    }
}

/// Everything one configuration run needs.
///
/// Build with all fields resolved, then call [`ConfigurationStage::run`].
#[derive(Debug, Clone)]
pub struct ConfigurationStage {
    pub project: ProjectNames,
    /// Project root; generated paths are relative to it.
    pub dir: PathBuf,
    pub arch: String,
    pub options: OptionSet,
    /// Arguments given explicitly, for the options string and the script.
    pub command_line: CommandLine,
    pub toolchain: Toolchain,
    pub packages: PackageList,
    /// Lines for `<project>fix.h`.
    pub c_fixes: Vec<String>,
    pub provenance: BuildProvenance,
    /// Program the reconfiguration script runs.
    pub reconfigure_program: PathBuf,
}

/// Persisted record of a run.
#[derive(Debug, Serialize)]
struct RunRecord<'a> {
    project: &'a str,
    arch: &'a str,
    dir: &'a Path,
    options: &'a OptionSet,
    arguments: Vec<&'a str>,
    provenance: &'a BuildProvenance,
    toolchain: &'a Toolchain,
}

impl ConfigurationStage {
    /// Run the stage and write every artifact.
    pub fn run(&self) -> Result<ConfigureSummary> {
        info!(project = %self.project.display, arch = %self.arch, dir = %self.dir.display(), "configuring");
        let paths = ArtifactPaths::new(&self.dir, &self.arch, &self.project);
        let mut summary = ConfigureSummary {
            project: self.project.display.clone(),
            arch: self.arch.clone(),
            files: Vec::new(),
            actions: Vec::new(),
        };
        let mut tables = StageTables::default();

        resolve_device(&self.options, &mut tables);
        resolve_expansion(&self.options, &mut tables);

        match configure_default_arch(
            &self.dir,
            &self.arch,
            &self.project,
            self.options.with_default_arch,
        )? {
            DefaultArchOutcome::Written(marker) => {
                summary.actions.push(format!(
                    "Set default architecture to {} in {}",
                    self.arch,
                    marker.display()
                ));
                summary.files.push(marker);
            }
            DefaultArchOutcome::Removed(_) | DefaultArchOutcome::Absent => {}
        }

        ensure_dir(&paths.conf_dir)?;
        let args = reconfigure_arguments(&self.command_line, &self.project, &self.arch);
        let script = render_script(&self.dir, &self.reconfigure_program, &args);
        write_script(&paths.script, &script)?;
        summary.actions.push(format!(
            "Created {} for automatic reconfiguration",
            paths.script.display()
        ));
        summary.files.push(paths.script.clone());

        let aggregate = self.dump(&paths, &mut tables, &mut summary)?;
        self.dump_config_info(&paths, &mut summary)?;
        self.dump_machine_info(&paths, &aggregate, &mut summary)?;
        self.write_run_record(&paths, &mut summary)?;

        info!(
            macros = tables.macros.len(),
            defines = tables.defines.len(),
            files = summary.files.len(),
            "configure stage complete"
        );
        Ok(summary)
    }

    /// Fill the tables and flush them to the variables file and headers.
    fn dump(
        &self,
        paths: &ArtifactPaths,
        tables: &mut StageTables,
        summary: &mut ConfigureSummary,
    ) -> Result<PackageAggregate> {
        let base_includes = vec![
            self.dir.join("include").display().to_string(),
            paths.include_dir.display().to_string(),
        ];
        let aggregate = aggregate_packages(&self.packages, base_includes, tables);
        tables.macros.add(
            format!("{}_CC_INCLUDES", self.project.upper),
            include_flags(&aggregate.include_dirs),
        );

        emit_compiler_macros(&self.toolchain, &self.options, tables)?;
        emit_linker_libraries(&self.toolchain, tables)?;

        ensure_dir(&paths.lib_dir)?;
        emit_option_macros(&self.options, &self.command_line.options_string(), tables);

        ensure_dir(&paths.include_dir)?;
        self.flush(&paths.variables, &tables.macros.render(), summary)?;
        self.flush(
            &paths.conf_header,
            &render_conf_header(&self.project, &tables.defines),
            summary,
        )?;
        self.flush(
            &paths.fix_header,
            &render_fix_header(&self.project, &self.c_fixes),
            summary,
        )?;
        Ok(aggregate)
    }

    fn dump_config_info(&self, paths: &ArtifactPaths, summary: &mut ConfigureSummary) -> Result<()> {
        let text = render_config_info(
            &self.project,
            &self.provenance,
            &self.command_line.options_string(),
        );
        self.flush(&paths.config_info, &text, summary)
    }

    fn dump_machine_info(
        &self,
        paths: &ArtifactPaths,
        aggregate: &PackageAggregate,
        summary: &mut ConfigureSummary,
    ) -> Result<()> {
        let ctx = MachineContext {
            names: &self.project,
            provenance: &self.provenance,
            dir: &self.dir,
            arch: &self.arch,
            package_includes: &aggregate.package_includes,
        };
        let text = render_machine_info(&ctx, &self.toolchain)?;
        self.flush(&paths.machine_info, &text, summary)
    }

    fn write_run_record(&self, paths: &ArtifactPaths, summary: &mut ConfigureSummary) -> Result<()> {
        let record = RunRecord {
            project: &self.project.display,
            arch: &self.arch,
            dir: &self.dir,
            options: &self.options,
            arguments: self.command_line.iter().map(|(_, raw)| raw).collect(),
            provenance: &self.provenance,
            toolchain: &self.toolchain,
        };
        let mut json = serde_json::to_string_pretty(&record)?;
        json.push('\n');
        self.flush(&paths.run_record, &json, summary)
    }

    fn flush(&self, path: &Path, contents: &str, summary: &mut ConfigureSummary) -> Result<()> {
        write_artifact(path, contents)?;
        summary.files.push(path.to_path_buf());
        Ok(())
    }
}

/// Outcome of a configuration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureSummary {
    pub project: String,
    pub arch: String,
    /// Files written, in write order.
    pub files: Vec<PathBuf>,
    /// User-facing actions taken.
    pub actions: Vec<String>,
}

impl fmt::Display for ConfigureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = format!("xxx{}xxx", "=".repeat(73));
        for action in &self.actions {
            writeln!(f, "{action}")?;
        }
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            " Configure stage complete. Now build {} libraries with:",
            self.project
        )?;
        writeln!(f, "   make all")?;
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PackageDescriptor;

    fn stage(dir: &Path) -> ConfigurationStage {
        let mut options = OptionSet::defaults(dir);
        options.with_device = "gpu".into();
        options.with_expansion = "Spherical".into();
        ConfigurationStage {
            project: ProjectNames::default(),
            dir: dir.to_path_buf(),
            arch: "arch-linux-opt".into(),
            options,
            command_line: CommandLine::from_args([
                "--with-device=gpu",
                "--with-expansion=Spherical",
            ]),
            toolchain: Toolchain::gnu_linux(),
            packages: PackageList::new(),
            c_fixes: Vec::new(),
            provenance: BuildProvenance::fixed("Thu Oct 15 10:00:00 2026", "node17", "Linux 6.8.0 x86_64"),
            reconfigure_program: PathBuf::from("/usr/local/bin/exafmm"),
        }
    }

    fn read(path: PathBuf) -> String {
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
    }

    #[test]
    fn gpu_spherical_scenario() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let summary = stage(dir).run().unwrap();

        let variables = read(dir.join("arch-linux-opt/conf/exafmmvariables"));
        assert!(variables.contains("DEVICE=gpu\n"));
        assert!(variables.contains("EXPAND=Spherical\n"));
        assert!(variables.contains("CPP_FLAGS= -Dgpu -DSpherical\n"));

        let marker = read(dir.join("conf/exafmmvariables"));
        assert_eq!(
            marker,
            format!(
                "EXAFMM_ARCH=arch-linux-opt\nEXAFMM_DIR={d}\ninclude {d}/arch-linux-opt/conf/exafmmvariables\n",
                d = dir.display()
            )
        );

        let script = read(dir.join("arch-linux-opt/conf/reconfigure-arch-linux-opt.sh"));
        assert!(script.contains("'--arch=arch-linux-opt'"));

        assert!(dir.join("arch-linux-opt/lib").is_dir());
        assert_eq!(summary.actions.len(), 2);
        assert!(summary.actions[0].starts_with("Set default architecture to arch-linux-opt in "));
        assert!(summary.actions[1].ends_with("for automatic reconfiguration"));
    }

    #[test]
    fn all_artifacts_written() {
        let tmp = tempfile::tempdir().unwrap();
        let summary = stage(tmp.path()).run().unwrap();
        let paths = ArtifactPaths::new(tmp.path(), "arch-linux-opt", &ProjectNames::default());
        for path in [
            &paths.variables,
            &paths.conf_header,
            &paths.fix_header,
            &paths.config_info,
            &paths.machine_info,
            &paths.run_record,
            &paths.script,
        ] {
            assert!(path.is_file(), "{} missing", path.display());
            assert!(summary.files.contains(path));
        }
    }

    #[test]
    fn disabled_default_arch_removes_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = stage(tmp.path());
        s.run().unwrap();
        assert!(tmp.path().join("conf/exafmmvariables").exists());

        s.options.with_default_arch = false;
        let summary = s.run().unwrap();
        assert!(!tmp.path().join("conf/exafmmvariables").exists());
        assert_eq!(summary.actions.len(), 1);
    }

    #[test]
    fn output_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let s = stage(tmp.path());
        let paths = ArtifactPaths::new(tmp.path(), &s.arch, &s.project);

        s.run().unwrap();
        let first: Vec<String> = [&paths.variables, &paths.conf_header, &paths.machine_info, &paths.config_info]
            .iter()
            .map(|p| read(p.to_path_buf()))
            .collect();
        s.run().unwrap();
        let second: Vec<String> = [&paths.variables, &paths.conf_header, &paths.machine_info, &paths.config_info]
            .iter()
            .map(|p| read(p.to_path_buf()))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn packages_reach_variables_and_conf_header() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = stage(tmp.path());
        s.packages.register(
            PackageDescriptor::new("MPI", vec!["-lmpi".into()])
                .with_includes(vec!["/opt/mpi/include".into()]),
        );
        s.packages.register(
            PackageDescriptor::new("valgrind", Vec::new())
                .with_includes(vec!["/usr/include/valgrind".into()])
                .indirect(),
        );
        s.run().unwrap();

        let variables = read(tmp.path().join("arch-linux-opt/conf/exafmmvariables"));
        let includes_line = variables
            .lines()
            .find(|l| l.starts_with("EXAFMM_CC_INCLUDES="))
            .unwrap();
        assert!(includes_line.contains("-I/opt/mpi/include"));
        assert!(!includes_line.contains("valgrind"));
        assert!(variables.contains("VALGRIND_INCLUDE=-I/usr/include/valgrind\n"));
        assert!(variables.contains("MPI_LIB=-lmpi\n"));

        let conf = read(tmp.path().join("arch-linux-opt/include/exafmmconf.h"));
        assert!(conf.contains("#define EXAFMM_HAVE_MPI 1\n"));
        assert!(!conf.contains("HAVE_VALGRIND"));
        assert!(conf.contains("#define EXAFMM_HAVE_FORTRAN 1\n"));
    }

    #[test]
    fn fixes_and_run_record() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = stage(tmp.path());
        s.c_fixes.push("typedef int exafmm_int;".into());
        s.run().unwrap();

        let fix = read(tmp.path().join("arch-linux-opt/include/exafmmfix.h"));
        assert!(fix.contains("typedef int exafmm_int;"));

        let record: serde_json::Value =
            serde_json::from_str(&read(tmp.path().join("arch-linux-opt/conf/exafmmconfigure.json")))
                .unwrap();
        assert_eq!(record["arch"], "arch-linux-opt");
        assert_eq!(record["options"]["with-device"], "gpu");
        assert_eq!(record["arguments"][0], "--with-device=gpu");
        assert_eq!(record["toolchain"]["cxx"]["compiler"], "g++");
    }

    #[test]
    fn nag_darwin_run() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = stage(tmp.path());
        s.toolchain = Toolchain::nag_darwin();
        s.run().unwrap();
        let variables = read(tmp.path().join("arch-linux-opt/conf/exafmmvariables"));
        assert!(variables.contains("FC_LINKER=clang++\n"));
        assert!(variables.contains("DARWIN_COMMONS_USE_DYLIBS= -Wl,-commons,use_dylibs \n"));
        let conf = read(tmp.path().join("arch-linux-opt/include/exafmmconf.h"));
        assert!(conf.contains("#define EXAFMM_SLSUFFIX \"dylib\"\n"));
    }

    #[test]
    fn summary_banner() {
        let summary = ConfigureSummary {
            project: "ExaFMM".into(),
            arch: "arch-a".into(),
            files: Vec::new(),
            actions: vec!["Created x for automatic reconfiguration".into()],
        };
        let text = summary.to_string();
        assert!(text.starts_with("Created x for automatic reconfiguration\nxxx===="));
        assert!(text.contains("Configure stage complete. Now build ExaFMM libraries with:\n   make all\n"));
        assert!(text.ends_with("=xxx"));
    }
}
