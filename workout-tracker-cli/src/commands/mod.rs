mod config_cmd;
mod session;
mod sets;
mod status;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

pub use session::{FinishCommand, StartCommand, WorkoutSession};
pub use sets::{ExerciseArgs, LogSetCommand};
pub use status::StatusCommand;

#[derive(Parser)]
#[command(name = "workout-tracker")]
#[command(about = "Track training plan progress from the terminal", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(long, global = true, env = "WORKOUT_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Plan to track (overrides the config file)
    #[arg(long, global = true, env = "WORKOUT_TRACKER_PLAN")]
    plan: Option<String>,

    /// Client owning the plan (overrides the config file)
    #[arg(long, global = true, env = "WORKOUT_TRACKER_CLIENT")]
    client: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show plan progress
    Status(StatusCommand),

    /// Start a workout day
    Start(StartCommand),

    /// Log or undo a set of the active workout
    LogSet(LogSetCommand),

    /// Append a set to an exercise
    AddSet(ExerciseArgs),

    /// Remove the last set of an exercise
    RemoveSet(ExerciseArgs),

    /// Complete the active workout and unlock the next day
    Finish(FinishCommand),

    /// Stop the active workout without completing it
    End(FinishCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigSubcommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Show current configuration
    Show,

    /// Initialize configuration with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// Where to find the config and which plan to open
struct SessionArgs {
    config_path: PathBuf,
    plan: Option<String>,
    client: Option<String>,
}

impl SessionArgs {
    async fn open(self) -> Result<WorkoutSession> {
        let config = Config::load_from(&self.config_path)?;
        let (plan_id, client_id) = config.progress_target(self.plan, self.client)?;
        WorkoutSession::open(&config, plan_id, client_id).await
    }
}

impl Cli {
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub async fn execute(self) -> Result<()> {
        if self.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file()?,
        };
        let args = SessionArgs {
            config_path,
            plan: self.plan,
            client: self.client,
        };

        match self.command {
            Commands::Status(cmd) => cmd.execute(&args.open().await?),
            Commands::Start(cmd) => cmd.execute(&args.open().await?).await,
            Commands::LogSet(cmd) => cmd.execute(&args.open().await?).await,
            Commands::AddSet(target) => sets::add_set(&args.open().await?, target).await,
            Commands::RemoveSet(target) => sets::remove_set(&args.open().await?, target).await,
            Commands::Finish(cmd) => cmd.complete(&args.open().await?).await,
            Commands::End(cmd) => cmd.end(&args.open().await?).await,
            Commands::Config(subcmd) => match subcmd {
                ConfigSubcommands::Show => config_cmd::show_config(&args.config_path),
                ConfigSubcommands::Init { force } => config_cmd::init_config(&args.config_path, force),
            },
            Commands::Completions { shell } => {
                generate_completions(shell);
                Ok(())
            }
        }
    }
}

/// Convert a 1-based number from the command line into an index
pub(crate) fn to_index(number: usize, what: &str) -> Result<usize> {
    if number == 0 {
        bail!("{} numbers start at 1", what);
    }
    Ok(number - 1)
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_to_index() {
        assert_eq!(to_index(1, "Set").unwrap(), 0);
        assert!(to_index(0, "Set").is_err());
    }
}
