// brewtap-common/src/lib.rs
pub mod config;
pub mod error;
pub mod formulary;
pub mod keg;
pub mod model;

pub use config::Config;
pub use error::{BrewtapError, Result};
pub use formulary::Formulary;
pub use keg::{InstalledArtifact, InstalledKeg, KegRegistry};
pub use model::{FormulaTemplate, PackageDescriptor};
