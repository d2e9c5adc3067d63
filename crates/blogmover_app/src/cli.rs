use std::path::PathBuf;

use blogmover_core::Platform;
use blogmover_engine::{
    normalize_website, MigrateConfig, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR, DEFAULT_SECTION,
    DEFAULT_WEBSITE,
};
use blogmover_logging::{LogDestination, DEFAULT_LOG_FILE};
use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "blogmover")]
#[command(version, about = "Migrate blog archives into Markdown posts with TOML front matter")]
#[command(after_help = "EXAMPLES:
    blogmover diary ./backup/diary            Convert saved diary pages
    blogmover -d social ./Takeout/Stream      Convert a social export as drafts
    blogmover microblog -w blog.example       Fetch a live microblog site")]
pub struct Cli {
    /// Mark each entry as draft
    #[arg(short, long, global = true)]
    pub draft: bool,

    /// Directory to save the results to
    #[arg(short = 'p', long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Offset for source dates without zone, e.g. +03:00 [default: local offset]
    #[arg(long, global = true, value_parser = parse_offset, allow_hyphen_values = true)]
    pub utc_offset: Option<FixedOffset>,

    /// Also write the log to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log every page and asset
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every post of a self-hosted microblog
    Microblog {
        /// Website to scrape; http:// is assumed without scheme
        #[arg(short, long, default_value = DEFAULT_WEBSITE)]
        website: String,

        /// Section of the site listing the posts, "" for the default content
        #[arg(long, default_value = DEFAULT_SECTION)]
        section: String,

        /// Number of pages to process simultaneously
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },
    /// Convert a directory of saved diary pages
    Diary {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Convert the output of the journal backup tool
    Journal {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Convert a social network export
    Social {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

impl Command {
    pub fn platform(&self) -> Platform {
        match self {
            Command::Microblog { .. } => Platform::Microblog,
            Command::Diary { .. } => Platform::Diary,
            Command::Journal { .. } => Platform::JournalBackup,
            Command::Social { .. } => Platform::SocialExport,
        }
    }
}

impl Cli {
    pub fn config(&self) -> MigrateConfig {
        let mut config = MigrateConfig {
            output_dir: self.output.clone(),
            draft: self.draft,
            ..MigrateConfig::default()
        };
        if let Some(offset) = self.utc_offset {
            config.utc_offset = offset;
        }
        if let Command::Microblog {
            website,
            section,
            concurrency,
        } = &self.command
        {
            config.website = normalize_website(website);
            config.section = section.clone();
            config.concurrency = *concurrency;
        }
        config
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None if self.verbose => LogDestination::Both(PathBuf::from(DEFAULT_LOG_FILE)),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

fn parse_offset(value: &str) -> Result<FixedOffset, String> {
    value
        .parse::<FixedOffset>()
        .map_err(|err| format!("expected an offset like +03:00: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microblog_defaults() {
        let cli = Cli::try_parse_from(["blogmover", "microblog"]).unwrap();
        let config = cli.config();
        assert_eq!(config.website, "http://example.site");
        assert_eq!(config.section, "/content/posts");
        assert_eq!(config.concurrency, 15);
        assert!(!config.draft);
        assert_eq!(cli.command.platform(), Platform::Microblog);
    }

    #[test]
    fn microblog_flags() {
        let cli = Cli::try_parse_from([
            "blogmover",
            "microblog",
            "-w",
            "https://blog.example",
            "--section",
            "",
            "-c",
            "4",
            "-d",
            "-p",
            "out",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.website, "https://blog.example");
        assert_eq!(config.section, "");
        assert_eq!(config.concurrency, 4);
        assert!(config.draft);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn archive_subcommands_take_an_input_directory() {
        let cli = Cli::try_parse_from(["blogmover", "journal", "backup", "--utc-offset", "+03:00"])
            .unwrap();
        assert_eq!(cli.command.platform(), Platform::JournalBackup);
        assert_eq!(
            cli.config().utc_offset,
            FixedOffset::east_opt(3 * 3600).unwrap()
        );
        assert!(Cli::try_parse_from(["blogmover", "diary"]).is_err());
    }

    #[test]
    fn verbose_logs_to_the_default_file_too() {
        let cli = Cli::try_parse_from(["blogmover", "-v", "social", "takeout"]).unwrap();
        assert_eq!(
            cli.log_destination(),
            LogDestination::Both(PathBuf::from(DEFAULT_LOG_FILE))
        );
        assert_eq!(cli.log_level(), LevelFilter::Debug);
    }
}
