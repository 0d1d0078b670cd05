pub mod analyze;
pub mod init_config;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a change set and print its commit narrative
    Analyze(analyze::AnalyzeArgs),
    /// Write the default configuration as TOML
    InitConfig(init_config::InitConfigArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Analyze(args) => analyze::run(args),
        Command::InitConfig(args) => init_config::run(args),
    }
}
