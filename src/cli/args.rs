use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meetdoc")]
#[command(about = "Turn meeting recordings into documents", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Submit a meeting recording and wait for the generated document
    Submit(SubmitCliArgs),
    /// Inspect the configuration file
    Config(ConfigCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug, Default)]
pub struct SubmitCliArgs {
    /// Document type: "Compte rendu", "Procès verbal" or "Note de réunion"
    #[arg(short = 't', long)]
    pub document_type: Option<String>,
    /// Meeting title
    #[arg(long)]
    pub title: Option<String>,
    /// Meeting date (YYYY-MM-DD format)
    #[arg(long)]
    pub date: Option<String>,
    /// Main objective of the meeting
    #[arg(long)]
    pub objective: Option<String>,
    /// Participants (optional)
    #[arg(long)]
    pub participants: Option<String>,
    /// Recording of the meeting
    #[arg(short, long)]
    pub audio: Option<PathBuf>,
    /// Language code (fr, en, es, de)
    #[arg(short, long)]
    pub language: Option<String>,
    /// Agenda of the meeting
    #[arg(long)]
    pub agenda: Option<String>,
    /// Directory for the generated document
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Override the workflow webhook URL
    #[arg(long)]
    pub webhook_url: Option<String>,
    /// Disable the progress display
    #[arg(long)]
    pub no_progress: bool,
    /// Never prompt for missing fields
    #[arg(long)]
    pub no_prompt: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ConfigCliArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
}
