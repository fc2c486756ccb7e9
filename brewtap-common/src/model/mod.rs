// brewtap-common/src/model/mod.rs
pub mod dependency;
pub mod formula;
pub mod template;

pub use dependency::{Dependency, DependencyExt, DependencyTag};
pub use formula::{FormulaTemplate, InstallProcedure, PackageDescriptor, TestProcedure};
