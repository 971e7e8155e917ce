//! Toolchain detection.
//!
//! [`ToolchainProbe`] is the seam between configuration and the machine:
//! [`SystemProbe`] discovers compilers by running them, [`FileProbe`] loads a
//! `.toolchain.toml` written earlier (or by hand).

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Result, ToolchainError};
use crate::host::{HostOs, HostPlatform};
use crate::language::{FortranToolchain, Language, LanguageToolchain};
use crate::parse::{load_toolchain_toml, validate_toolchain};
use crate::toolchain::{LinkerQuirk, Toolchain};
use crate::vendor::CompilerVendor;

/// Environment variables the system probe reads.
const PROBE_ENV: &[&str] = &[
    "CC", "CXX", "FC", "CFLAGS", "CXXFLAGS", "FFLAGS", "CPPFLAGS", "LDFLAGS", "LIBS", "HOSTNAME",
];

/// How to treat Fortran during detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FortranRequest {
    /// Use a Fortran compiler if one can be found.
    #[default]
    Auto,
    /// Do not configure Fortran.
    Disabled,
    /// Use this compiler; failing to run it is an error.
    Compiler(String),
}

/// User choices that steer detection. `None` fields fall back to the
/// environment, then to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct ProbeRequest {
    pub cc: Option<String>,
    pub cxx: Option<String>,
    pub fc: FortranRequest,
    pub cflags: Option<String>,
    pub cxxflags: Option<String>,
    pub fflags: Option<String>,
    pub cppflags: Option<String>,
    pub ldflags: Option<String>,
    pub libs: Option<Vec<String>>,
    /// Build shared libraries. `None` keeps what a loaded toolchain says and
    /// means static for a probed one.
    pub shared_libraries: Option<bool>,
}

/// Produces a [`Toolchain`] for a configuration run.
pub trait ToolchainProbe {
    fn detect(&self, request: &ProbeRequest) -> Result<Toolchain>;
}

/// Runs external commands and captures their output.
pub trait CommandRunner {
    /// Run `program args...`, returning combined stdout/stderr if it could
    /// be executed and produced output.
    fn run(&self, program: &str, args: &[&str]) -> Option<String>;

    /// Version banner of a compiler, trying `--version` then `-V`.
    fn version_output(&self, program: &str) -> Option<String> {
        self.run(program, &["--version"])
            .or_else(|| self.run(program, &["-V"]))
    }
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Option<String> {
        let output = Command::new(program).args(args).output().ok()?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if output.status.success() || !text.trim().is_empty() {
            Some(text)
        } else {
            None
        }
    }
}

/// Detects compilers installed on this machine.
pub struct SystemProbe<R: CommandRunner = SystemRunner> {
    runner: R,
    env: HashMap<String, String>,
    os: HostOs,
    arch: String,
}

impl SystemProbe<SystemRunner> {
    /// Probe the current machine using the current process environment.
    pub fn new() -> Self {
        let env = PROBE_ENV
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
            .collect();
        Self {
            runner: SystemRunner,
            env,
            os: HostOs::from_os_name(std::env::consts::OS),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

impl Default for SystemProbe<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> SystemProbe<R> {
    /// Probe with a custom runner, an explicit environment, and a fixed host.
    pub fn with_runner(runner: R, env: HashMap<String, String>, os: HostOs, arch: &str) -> Self {
        Self {
            runner,
            env,
            os,
            arch: arch.to_string(),
        }
    }

    fn env(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Locate a compiler for `language`.
    ///
    /// An explicit choice (argument or environment) must work; otherwise the
    /// built-in candidates are tried in order and `None` means none ran.
    fn find_compiler(
        &self,
        language: Language,
        explicit: Option<&str>,
    ) -> Result<Option<(String, CompilerVendor)>> {
        let chosen = explicit.or_else(|| self.env(language.compiler_env()));
        if let Some(program) = chosen {
            return match self.runner.version_output(program) {
                Some(banner) => {
                    let vendor = CompilerVendor::classify(&banner, program);
                    debug!(%language, program, %vendor, "using requested compiler");
                    Ok(Some((program.to_string(), vendor)))
                }
                None => Err(ToolchainError::CompilerNotFound {
                    language,
                    tried: vec![program.to_string()],
                }),
            };
        }

        for candidate in language.default_candidates() {
            if let Some(banner) = self.runner.version_output(candidate) {
                let vendor = CompilerVendor::classify(&banner, candidate);
                debug!(%language, program = candidate, %vendor, "found compiler");
                return Ok(Some((candidate.to_string(), vendor)));
            }
        }
        Ok(None)
    }

    fn require_compiler(
        &self,
        language: Language,
        explicit: Option<&str>,
    ) -> Result<(String, CompilerVendor)> {
        self.find_compiler(language, explicit)?
            .ok_or_else(|| ToolchainError::CompilerNotFound {
                language,
                tried: language
                    .default_candidates()
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
            })
    }

    fn flags(&self, explicit: Option<&String>, env_key: &str) -> String {
        explicit
            .map(|s| s.trim().to_string())
            .or_else(|| self.env(env_key).map(|s| s.trim().to_string()))
            .unwrap_or_default()
    }

    fn host(&self) -> HostPlatform {
        HostPlatform::detect(&self.runner, self.env("HOSTNAME"), self.os, &self.arch)
    }

    fn language_tools(
        &self,
        language: Language,
        program: String,
        vendor: CompilerVendor,
        flags: String,
        cppflags: &str,
        ldflags: &str,
    ) -> LanguageToolchain {
        LanguageToolchain::new(program, vendor)
            .with_compiler_flags(flags)
            .with_preprocessor_flags(cppflags)
            .with_linker_flags(ldflags)
            .with_runtime_libs(vendor.runtime_libs(language, self.os))
    }
}

impl<R: CommandRunner> ToolchainProbe for SystemProbe<R> {
    fn detect(&self, request: &ProbeRequest) -> Result<Toolchain> {
        let cppflags = self.flags(request.cppflags.as_ref(), "CPPFLAGS");
        let ldflags = self.flags(request.ldflags.as_ref(), "LDFLAGS");

        let (cc, cc_vendor) = self.require_compiler(Language::C, request.cc.as_deref())?;
        let c = self.language_tools(
            Language::C,
            cc,
            cc_vendor,
            self.flags(request.cflags.as_ref(), Language::C.flags_env()),
            &cppflags,
            &ldflags,
        );

        let (cxx, cxx_vendor) = self.require_compiler(Language::Cxx, request.cxx.as_deref())?;
        let cxx = self.language_tools(
            Language::Cxx,
            cxx,
            cxx_vendor,
            self.flags(request.cxxflags.as_ref(), Language::Cxx.flags_env()),
            &cppflags,
            &ldflags,
        );

        let fortran = match &request.fc {
            FortranRequest::Disabled => None,
            FortranRequest::Compiler(program) => {
                self.find_compiler(Language::Fortran, Some(program))?
            }
            FortranRequest::Auto => self.find_compiler(Language::Fortran, None)?,
        }
        .map(|(program, vendor)| {
            FortranToolchain::from_tools(self.language_tools(
                Language::Fortran,
                program,
                vendor,
                self.flags(request.fflags.as_ref(), Language::Fortran.flags_env()),
                &cppflags,
                &ldflags,
            ))
        });

        let base_libs = match &request.libs {
            Some(libs) => libs.clone(),
            None => self
                .env("LIBS")
                .map(|l| l.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
        };

        // Only Fortran links are affected by the Darwin commons quirk.
        let linker_quirks = fortran
            .as_ref()
            .map(|fc| LinkerQuirk::classify(&fc.tools.linker_flags))
            .unwrap_or_default();

        let mut toolchain = Toolchain {
            name: format!("{}-{}", cxx.compiler_vendor, self.os),
            object_suffix: self.os.object_suffix().into(),
            executable_suffix: self.os.executable_suffix().into(),
            shared_library_ext: self.os.static_library_ext().into(),
            static_library_ext: self.os.static_library_ext().into(),
            shared_libraries: false,
            base_libs,
            linker_quirks,
            host: self.host(),
            c,
            cxx,
            fortran,
        };
        toolchain.set_shared_libraries(request.shared_libraries.unwrap_or(false));
        info!(
            toolchain = %toolchain.name,
            cxx = %toolchain.cxx.compiler,
            fortran = toolchain.has_fortran(),
            "toolchain detected"
        );
        Ok(toolchain)
    }
}

/// Loads a toolchain from a `.toolchain.toml` file instead of probing.
#[derive(Debug, Clone)]
pub struct FileProbe {
    pub path: PathBuf,
}

impl FileProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ToolchainProbe for FileProbe {
    fn detect(&self, request: &ProbeRequest) -> Result<Toolchain> {
        let mut toolchain = load_toolchain_toml(&self.path)?;
        if let Some(enabled) = request.shared_libraries {
            toolchain.set_shared_libraries(enabled);
        }
        if let Err(issues) = validate_toolchain(&toolchain) {
            let errors: Vec<_> = issues
                .iter()
                .filter(|i| i.severity == "error")
                .map(|i| i.message.as_str())
                .collect();
            if !errors.is_empty() {
                return Err(ToolchainError::Validation {
                    detail: format!("{}: {}", self.path.display(), errors.join("; ")),
                });
            }
        }
        info!(toolchain = %toolchain.name, path = %self.path.display(), "toolchain loaded");
        Ok(toolchain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers `--version` for a fixed set of programs.
    struct FakeRunner {
        banners: HashMap<&'static str, &'static str>,
    }

    impl FakeRunner {
        fn new(banners: &[(&'static str, &'static str)]) -> Self {
            Self {
                banners: banners.iter().copied().collect(),
            }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str]) -> Option<String> {
            match program {
                "hostname" => Some("node01\n".into()),
                "uname" => Some("Linux 6.8.0 x86_64\n".into()),
                _ if args == ["--version"] => self.banners.get(program).map(|b| b.to_string()),
                _ => None,
            }
        }
    }

    fn gnu_runner() -> FakeRunner {
        FakeRunner::new(&[
            ("cc", "cc (GCC) 13.2.0"),
            ("c++", "c++ (GCC) 13.2.0"),
            ("gfortran", "GNU Fortran (GCC) 13.2.0"),
        ])
    }

    fn probe(runner: FakeRunner, env: &[(&str, &str)]) -> SystemProbe<FakeRunner> {
        let env = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SystemProbe::with_runner(runner, env, HostOs::Linux, "x86_64")
    }

    #[test]
    fn detects_default_gnu_toolchain() {
        let tc = probe(gnu_runner(), &[]).detect(&ProbeRequest::default()).unwrap();
        assert_eq!(tc.c.compiler, "cc");
        assert_eq!(tc.cxx.compiler, "c++");
        assert_eq!(tc.cxx.compiler_vendor, CompilerVendor::Gnu);
        assert_eq!(tc.cxx.runtime_libs, vec!["-lstdc++"]);
        let fc = tc.fortran.as_ref().unwrap();
        assert_eq!(fc.tools.compiler, "gfortran");
        assert_eq!(fc.module_flags.output_flag.as_deref(), Some("-J"));
        assert_eq!(tc.host.hostname, "node01");
        assert_eq!(tc.host.description, "Linux 6.8.0 x86_64");
        assert_eq!(tc.derived_arch(), "arch-linux-gnu");
    }

    #[test]
    fn fortran_is_optional() {
        let runner = FakeRunner::new(&[("cc", "cc (GCC) 13.2.0"), ("c++", "c++ (GCC) 13.2.0")]);
        let tc = probe(runner, &[]).detect(&ProbeRequest::default()).unwrap();
        assert!(tc.fortran.is_none());
    }

    #[test]
    fn fortran_can_be_disabled() {
        let request = ProbeRequest {
            fc: FortranRequest::Disabled,
            ..ProbeRequest::default()
        };
        let tc = probe(gnu_runner(), &[]).detect(&request).unwrap();
        assert!(!tc.has_fortran());
    }

    #[test]
    fn missing_explicit_compiler_is_error() {
        let request = ProbeRequest {
            cxx: Some("/nonexistent/CC".into()),
            ..ProbeRequest::default()
        };
        let err = probe(gnu_runner(), &[]).detect(&request).unwrap_err();
        match err {
            ToolchainError::CompilerNotFound { language, tried } => {
                assert_eq!(language, Language::Cxx);
                assert_eq!(tried, vec!["/nonexistent/CC"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_c_compiler_lists_candidates() {
        let err = probe(FakeRunner::new(&[]), &[])
            .detect(&ProbeRequest::default())
            .unwrap_err();
        assert!(err.to_string().contains("no working C compiler"));
        assert!(err.to_string().contains("gcc"));
    }

    #[test]
    fn environment_supplies_compilers_and_flags() {
        let runner = FakeRunner::new(&[
            ("clang", "clang version 18.1.3"),
            ("clang++", "clang version 18.1.3"),
            ("nagfor", "NAG Fortran Compiler Release 7.1"),
        ]);
        let env = [
            ("CC", "clang"),
            ("CXX", "clang++"),
            ("FC", "nagfor"),
            ("CXXFLAGS", " -O2 "),
            ("LDFLAGS", "-Wl,-commons,use_dylibs"),
            ("LIBS", "-lm -ldl"),
        ];
        let tc = probe(runner, &env).detect(&ProbeRequest::default()).unwrap();
        assert_eq!(tc.cxx.compiler_vendor, CompilerVendor::Clang);
        assert_eq!(tc.cxx.compiler_flags, "-O2");
        assert_eq!(tc.base_libs, vec!["-lm", "-ldl"]);
        assert_eq!(tc.fortran.as_ref().unwrap().tools.linker_vendor, CompilerVendor::Nag);
        assert!(tc.has_quirk(LinkerQuirk::DarwinCommonsUseDylibs));
    }

    #[test]
    fn darwin_quirk_needs_fortran() {
        let request = ProbeRequest {
            fc: FortranRequest::Disabled,
            ..ProbeRequest::default()
        };
        let tc = probe(gnu_runner(), &[("LDFLAGS", "-Wl,-commons,use_dylibs")])
            .detect(&request)
            .unwrap();
        assert!(tc.linker_quirks.is_empty());
    }

    #[test]
    fn request_overrides_environment() {
        let request = ProbeRequest {
            cxxflags: Some("-O0 -g".into()),
            libs: Some(vec!["-lrt".into()]),
            shared_libraries: Some(true),
            ..ProbeRequest::default()
        };
        let tc = probe(gnu_runner(), &[("CXXFLAGS", "-O3"), ("LIBS", "-lm")])
            .detect(&request)
            .unwrap();
        assert_eq!(tc.cxx.compiler_flags, "-O0 -g");
        assert_eq!(tc.base_libs, vec!["-lrt"]);
        assert_eq!(tc.shared_library_ext, "so");
    }

    #[test]
    fn file_probe_loads_toolchain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gnu.toolchain.toml");
        let text = crate::parse::toolchain_to_toml(&Toolchain::gnu_linux()).unwrap();
        std::fs::write(&path, text).unwrap();

        let tc = FileProbe::new(&path).detect(&ProbeRequest::default()).unwrap();
        assert_eq!(tc, Toolchain::gnu_linux());
    }

    #[test]
    fn file_probe_applies_requested_library_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gnu.toolchain.toml");
        let text = crate::parse::toolchain_to_toml(&Toolchain::gnu_linux()).unwrap();
        std::fs::write(&path, text).unwrap();
        let probe = FileProbe::new(&path);

        let shared = probe
            .detect(&ProbeRequest {
                shared_libraries: Some(true),
                ..ProbeRequest::default()
            })
            .unwrap();
        assert!(shared.shared_libraries);
        assert_eq!(shared.shared_library_ext, "so");

        let kept = probe.detect(&ProbeRequest::default()).unwrap();
        assert!(!kept.shared_libraries);
        assert_eq!(kept.shared_library_ext, "a");
    }

    #[test]
    fn file_probe_can_turn_shared_libraries_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nag.toolchain.toml");
        let text = crate::parse::toolchain_to_toml(&Toolchain::nag_darwin()).unwrap();
        std::fs::write(&path, text).unwrap();

        let tc = FileProbe::new(&path)
            .detect(&ProbeRequest {
                shared_libraries: Some(false),
                ..ProbeRequest::default()
            })
            .unwrap();
        assert!(!tc.shared_libraries);
        assert_eq!(tc.shared_library_ext, tc.static_library_ext);
    }

    #[test]
    fn file_probe_rejects_invalid_toolchain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toolchain.toml");
        let mut tc = Toolchain::gnu_linux();
        tc.cxx.compiler = String::new();
        std::fs::write(&path, crate::parse::toolchain_to_toml(&tc).unwrap()).unwrap();

        let err = FileProbe::new(&path).detect(&ProbeRequest::default()).unwrap_err();
        assert!(matches!(err, ToolchainError::Validation { .. }));
        assert!(err.to_string().contains("[cxx] compiler is empty"));
    }
}
