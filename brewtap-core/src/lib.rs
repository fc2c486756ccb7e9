// brewtap-core/src/lib.rs
pub mod build;
pub mod extract;
pub mod install;
pub mod process;
pub mod toolchain;
pub mod uninstall;
pub mod verify;

pub use install::{Fetcher, HttpFetcher, Installer};
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use toolchain::Toolchain;
pub use uninstall::uninstall_keg;
pub use verify::{assert_verified, verify, Verification};
