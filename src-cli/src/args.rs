use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ingestwatch")]
#[command(about = "Start a document ingestion job and follow its progress", long_about = None)]
pub struct Args {
    /// Client configuration file (JSON)
    #[arg(short, long, default_value = "ingestwatch.json")]
    pub config: PathBuf,

    /// File to process; repeat for several files
    #[arg(short = 'f', long = "file", required = true)]
    pub files: Vec<String>,

    /// Processing settings file (JSON)
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Reset the server once and retry if another job is already running
    #[arg(long)]
    pub reset_on_conflict: bool,

    /// Log level, overrides the configuration file
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print the final job snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_files() {
        let args = Args::parse_from([
            "ingestwatch",
            "--file",
            "a.pdf",
            "-f",
            "b.pdf",
            "--reset-on-conflict",
        ]);
        assert_eq!(args.files, vec!["a.pdf", "b.pdf"]);
        assert!(args.reset_on_conflict);
        assert_eq!(args.config, PathBuf::from("ingestwatch.json"));
        assert!(args.settings.is_none());
    }

    #[test]
    fn test_file_is_required() {
        assert!(Args::try_parse_from(["ingestwatch"]).is_err());
    }
}
