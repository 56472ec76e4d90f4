use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "specsieve")]
#[command(
    author,
    version,
    about = "Requirement extraction from converted engineering specifications"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Extraction config file (YAML); defaults apply when absent
    #[arg(short, long, global = true, env = "SPECSIEVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract requirements and write requirements.jsonl / requirements.csv
    Extract {
        /// Directory holding document.json and tables_data.json
        input: PathBuf,

        /// Output directory (defaults to the input directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source file name used as a classification hint
        #[arg(long)]
        filename: Option<String>,

        /// Also write coverage.json
        #[arg(long)]
        audit: bool,
    },

    /// Print the coverage audit of one document as JSON
    Audit {
        /// Directory holding document.json and tables_data.json
        input: PathBuf,

        /// Source file name used as a classification hint
        #[arg(long)]
        filename: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_arguments() {
        let cli = Cli::parse_from([
            "specsieve",
            "extract",
            "RS-100_output",
            "--audit",
            "--log-format",
            "json",
            "-v",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Extract {
                input,
                output,
                audit,
                ..
            } => {
                assert_eq!(input, PathBuf::from("RS-100_output"));
                assert!(output.is_none());
                assert!(audit);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
