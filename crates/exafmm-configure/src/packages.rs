//! Optional external packages (BLAS/LAPACK, MPI, and manifest-declared ones)
//! and their contribution to the macro and define tables.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::options::OptionSet;
use crate::tables::{include_flags, library_flags, StageTables};

fn default_used_directly() -> bool {
    true
}

/// Metadata for one optional dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageDescriptor {
    /// Package name (e.g. "MPI", "BlasLapack").
    pub name: String,
    /// Libraries to link: flags, bare names, or paths.
    #[serde(default)]
    pub libs: Vec<String>,
    /// Include directories, if the package has headers.
    #[serde(default)]
    pub includes: Option<Vec<String>>,
    /// Whether ExaFMM uses the package itself rather than only through
    /// another package.
    #[serde(default = "default_used_directly")]
    pub used_directly: bool,
}

impl PackageDescriptor {
    pub fn new(name: impl Into<String>, libs: Vec<String>) -> Self {
        Self {
            name: name.into(),
            libs,
            includes: None,
            used_directly: true,
        }
    }

    pub fn with_includes(mut self, includes: Vec<String>) -> Self {
        self.includes = Some(includes);
        self
    }

    pub fn indirect(mut self) -> Self {
        self.used_directly = false;
        self
    }

    /// Upper-case token used in macro and define names.
    pub fn macro_name(&self) -> String {
        self.name.to_ascii_uppercase().replace(['-', '.', ' '], "_")
    }

    /// valgrind headers are only for instrumented builds and never join the
    /// global include path.
    pub fn is_valgrind(&self) -> bool {
        self.name.eq_ignore_ascii_case("valgrind")
    }
}

/// Packages in registration order.
#[derive(Debug, Clone, Default)]
pub struct PackageList {
    packages: Vec<PackageDescriptor>,
}

impl PackageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the packages requested through options, then `extra`.
    pub fn from_options(options: &OptionSet, extra: impl IntoIterator<Item = PackageDescriptor>) -> Self {
        let mut list = Self::new();
        if options.with_blas {
            list.register(PackageDescriptor::new("BlasLapack", options.blas_lapack_libs.clone()));
        }
        if options.with_mpi {
            let mut mpi = PackageDescriptor::new("MPI", options.mpi_libs.clone());
            if !options.mpi_includes.is_empty() {
                mpi = mpi.with_includes(options.mpi_includes.clone());
            }
            list.register(mpi);
        }
        for package in extra {
            list.register(package);
        }
        list
    }

    pub fn register(&mut self, package: PackageDescriptor) {
        self.packages.push(package);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PackageDescriptor> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// What the packages add to the global build settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageAggregate {
    /// Base include directories followed by package includes.
    pub include_dirs: Vec<String>,
    /// Package include directories only (excluding valgrind).
    pub package_includes: Vec<String>,
}

/// Emit per-package macros and defines, visiting packages in reverse
/// registration order, and collect the global include list.
pub fn aggregate_packages(
    packages: &PackageList,
    base_includes: Vec<String>,
    tables: &mut StageTables,
) -> PackageAggregate {
    let mut aggregate = PackageAggregate {
        include_dirs: base_includes,
        ..PackageAggregate::default()
    };

    for package in packages.iter().rev() {
        let token = package.macro_name();
        debug!(package = %package.name, used_directly = package.used_directly, "aggregating package");
        if package.used_directly {
            tables.defines.add(format!("HAVE_{token}"), 1);
        }
        tables
            .macros
            .add(format!("{token}_LIB"), library_flags(&package.libs));

        if let Some(includes) = &package.includes {
            if !package.is_valgrind() {
                aggregate.include_dirs.extend(includes.iter().cloned());
                aggregate.package_includes.extend(includes.iter().cloned());
            }
            tables
                .macros
                .add(format!("{token}_INCLUDE"), include_flags(includes));
        }
    }
    aggregate
}
