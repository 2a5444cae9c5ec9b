//! Lists the registered emission targets

use console::style;
use crudsmith::scaffold::TargetRegistry;

/// A registered target as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    /// Registry name, as passed to `--target`
    pub name: &'static str,
    /// Extension of the generated page
    pub extension: &'static str,
}

/// List emission targets
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetsCommand;

impl TargetsCommand {
    /// Registered targets in registration order
    #[must_use]
    pub fn list(self) -> Vec<TargetInfo> {
        TargetRegistry::builtin()
            .iter()
            .map(|target| TargetInfo {
                name: target.name(),
                extension: target.extension(),
            })
            .collect()
    }

    /// Print the registered targets
    pub fn execute(self) {
        println!("{}", style("Emission targets:").bold());
        for target in self.list() {
            println!(
                "  {:<10} {}",
                style(target.name).cyan(),
                style(format!("*.{}", target.extension)).dim()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_builtin_targets() {
        let targets = TargetsCommand.list();
        assert_eq!(
            targets,
            vec![
                TargetInfo {
                    name: "php",
                    extension: "php"
                },
                TargetInfo {
                    name: "jsp",
                    extension: "jsp"
                },
            ]
        );
    }
}
