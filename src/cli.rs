use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "roomchat", about = "Terminal chat client for the room rental marketplace")]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start the chat TUI (asks to log in first if needed)
    Run,
    /// Store an access token for this machine
    Login,
    /// Forget the stored access token
    Logout,
    /// Print the logged-in user
    Whoami,
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn defaults_to_run_when_command_is_missing() {
        let cli = Cli::parse_from(["roomchat"]);

        assert_eq!(cli.command_or_default(), Command::Run);
    }

    #[test]
    fn config_flag_is_accepted_after_subcommand() {
        let cli = Cli::parse_from(["roomchat", "logout", "--config", "custom.toml"]);

        assert_eq!(cli.command_or_default(), Command::Logout);
        assert_eq!(
            cli.config
                .as_deref()
                .map(|p| p.to_string_lossy().to_string()),
            Some("custom.toml".to_owned())
        );
    }

    #[test]
    fn parses_login_and_whoami() {
        assert_eq!(
            Cli::parse_from(["roomchat", "login"]).command_or_default(),
            Command::Login
        );
        assert_eq!(
            Cli::parse_from(["roomchat", "whoami"]).command_or_default(),
            Command::Whoami
        );
    }
}
