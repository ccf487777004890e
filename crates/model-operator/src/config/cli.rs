use clap::Parser;
use clap::Subcommand;
use utils::version;

use crate::config::controller::ControllerArgs;

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the ModelDeployment controller
    Run(Box<ControllerArgs>),
    /// Print the ModelDeployment CustomResourceDefinition as YAML
    Crd,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_crd_subcommand() {
        let cli = Cli::try_parse_from(["model-operator", "crd"]).expect("parses");
        assert!(matches!(cli.command, Commands::Crd));
    }
}
