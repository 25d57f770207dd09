use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bruxlog")]
#[command(about = "Record and review bilateral bite-force sessions")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides BRUXLOG_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a session from the synthetic source until Ctrl-C
    Record {
        /// Stop automatically after this many seconds
        #[arg(short, long)]
        seconds: Option<u64>,

        /// Print the summary without saving the session
        #[arg(long)]
        discard: bool,
    },

    /// Record a session from a file of captured 20-byte sensor frames
    Replay {
        path: PathBuf,

        /// Print the summary without saving the session
        #[arg(long)]
        discard: bool,
    },

    /// List stored sessions, newest first
    List {
        /// Maximum number of sessions to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Number of sessions to skip
        #[arg(short, long, default_value = "0")]
        offset: usize,
    },

    /// Show the summary of one session
    Show {
        id: String,
    },

    /// Per-channel event statistics, severity and force pattern
    Report {
        id: String,
    },

    /// Export one session's samples as CSV
    Export {
        id: String,
        path: PathBuf,
    },

    /// Export every stored session into one CSV
    ExportAll {
        path: PathBuf,
    },

    /// Import a CSV of samples as a new session
    Import {
        path: PathBuf,

        /// Label for the imported session (defaults to the file name)
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Delete a stored session
    Delete {
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_record_flags() {
        let cli = Cli::try_parse_from(["bruxlog", "record", "--seconds", "30", "--discard"]).unwrap();
        match cli.command {
            Commands::Record { seconds, discard } => {
                assert_eq!(seconds, Some(30));
                assert!(discard);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_export_all_and_global_data_dir() {
        let cli = Cli::try_parse_from(["bruxlog", "export-all", "out.csv", "--data-dir", "/tmp/bx"])
            .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/bx")));
        assert!(matches!(cli.command, Commands::ExportAll { path } if path == PathBuf::from("out.csv")));
    }

    #[test]
    fn parses_replay_and_report() {
        let cli = Cli::try_parse_from(["bruxlog", "replay", "night.bin", "--discard"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Replay { path, discard: true } if path == PathBuf::from("night.bin")
        ));

        let cli = Cli::try_parse_from(["bruxlog", "report", "abc"]).unwrap();
        assert!(matches!(cli.command, Commands::Report { id } if id == "abc"));
    }
}
