//! CLI command implementations

pub mod generate;
pub mod new;
pub mod targets;

pub use generate::{GenerateCommand, GenerateReport};
pub use new::NewCommand;
pub use targets::{TargetInfo, TargetsCommand};
