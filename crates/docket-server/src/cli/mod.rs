use clap::{Parser, Subcommand};

pub mod init;

#[derive(Parser)]
#[command(name = "docket-server")]
#[command(about = "Docket CMS server")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Run database migrations
    Migrate,
    /// Create the first super admin
    Init(init::InitArgs),
}

#[derive(Debug, Clone)]
pub enum RunMode {
    Server,
    Migrate,
    Init(init::InitArgs),
}

impl From<Cli> for RunMode {
    fn from(cli: Cli) -> Self {
        match cli.command {
            None | Some(Command::Serve) => Self::Server,
            Some(Command::Migrate) => Self::Migrate,
            Some(Command::Init(args)) => Self::Init(args),
        }
    }
}

pub fn parse_args() -> RunMode {
    RunMode::from(Cli::parse())
}
