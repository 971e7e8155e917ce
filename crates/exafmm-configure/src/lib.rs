//! ExaFMM configuration stage.
//!
//! [`ConfigurationStage::run`] turns resolved options, a detected
//! [`Toolchain`](exafmm_toolchain::Toolchain), and the optional packages into
//! the files a `make` build reads:
//!
//! - `<arch>/conf/<project>variables`: makefile macros
//! - `<arch>/include/<project>conf.h` and `<project>fix.h`
//! - `<arch>/include/<project>configinfo.h` and `<project>machineinfo.h`
//! - `<arch>/conf/reconfigure-<arch>.sh` and a JSON record of the run
//! - `conf/<project>variables` when the arch becomes the default

pub mod artifacts;
pub mod default_arch;
pub mod emit;
pub mod error;
pub mod headers;
pub mod options;
pub mod packages;
pub mod provenance;
pub mod script;
pub mod stage;
pub mod tables;

pub use default_arch::DefaultArchOutcome;
pub use error::{ConfigureError, Result};
pub use options::{CommandLine, OptionSet};
pub use packages::{PackageAggregate, PackageDescriptor, PackageList};
pub use provenance::BuildProvenance;
pub use stage::{ArtifactPaths, ConfigurationStage, ConfigureSummary, ProjectNames};
pub use tables::{DefineTable, MacroTable, StageTables};
