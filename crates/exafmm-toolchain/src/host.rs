//! Host platform model.
//!
//! Describes the machine the build runs on: operating system family,
//! CPU architecture, host name, and the file-suffix conventions that follow
//! from the OS.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::probe::{CommandRunner, SystemRunner};

/// Operating system family of the build host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostOs {
    Linux,
    /// macOS and other Darwin-based systems.
    Darwin,
    Windows,
    Other,
}

impl HostOs {
    /// Map a `std::env::consts::OS` value to an OS family.
    pub fn from_os_name(name: &str) -> Self {
        match name {
            "linux" | "android" => HostOs::Linux,
            "macos" | "ios" => HostOs::Darwin,
            "windows" => HostOs::Windows,
            _ => HostOs::Other,
        }
    }

    /// Object file suffix without the dot.
    pub fn object_suffix(self) -> &'static str {
        match self {
            HostOs::Windows => "obj",
            _ => "o",
        }
    }

    /// Executable suffix including the dot, or empty.
    pub fn executable_suffix(self) -> &'static str {
        match self {
            HostOs::Windows => ".exe",
            _ => "",
        }
    }

    /// Shared library extension without the dot.
    pub fn shared_library_ext(self) -> &'static str {
        match self {
            HostOs::Darwin => "dylib",
            HostOs::Windows => "dll",
            HostOs::Linux | HostOs::Other => "so",
        }
    }

    /// Static archive extension without the dot.
    pub fn static_library_ext(self) -> &'static str {
        match self {
            HostOs::Windows => "lib",
            _ => "a",
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostOs::Linux => "linux",
            HostOs::Darwin => "darwin",
            HostOs::Windows => "windows",
            HostOs::Other => "other",
        };
        f.write_str(name)
    }
}

/// The machine a configuration run executes on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostPlatform {
    /// OS family.
    pub os: HostOs,
    /// CPU architecture (e.g. "x86_64", "aarch64").
    pub arch: String,
    /// Network host name.
    pub hostname: String,
    /// Free-form platform description (e.g. `uname -srm` output).
    pub description: String,
}

impl HostPlatform {
    /// The machine this process is running on.
    pub fn current() -> Self {
        let hostname = std::env::var("HOSTNAME").ok();
        Self::detect(
            &SystemRunner,
            hostname.as_deref(),
            HostOs::from_os_name(std::env::consts::OS),
            std::env::consts::ARCH,
        )
    }

    /// Describe a host through `runner`.
    ///
    /// A non-blank `hostname` wins over running `hostname`; the description is
    /// `uname -srm`, falling back to `<os>-<arch>`.
    pub fn detect<R: CommandRunner>(
        runner: &R,
        hostname: Option<&str>,
        os: HostOs,
        arch: &str,
    ) -> Self {
        let hostname = hostname
            .map(str::to_string)
            .filter(|h| !h.trim().is_empty())
            .or_else(|| runner.run("hostname", &[]))
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        let description = runner
            .run("uname", &["-srm"])
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("{os}-{arch}"));
        Self {
            os,
            arch: arch.to_string(),
            hostname,
            description,
        }
    }

    /// A generic x86-64 Linux host.
    pub fn linux_x86_64() -> Self {
        Self {
            os: HostOs::Linux,
            arch: "x86_64".into(),
            hostname: "localhost".into(),
            description: "Linux-x86_64".into(),
        }
    }

    /// A generic Apple Silicon macOS host.
    pub fn darwin_aarch64() -> Self {
        Self {
            os: HostOs::Darwin,
            arch: "aarch64".into(),
            hostname: "localhost".into(),
            description: "Darwin-arm64".into(),
        }
    }
}
