use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use pagetree_core::{IgnorePatterns, WalkSettings};
use pagetree_engine::{ClientSettings, PipelineSettings};

#[derive(Debug, Parser)]
#[command(
    name = "pagetree-export",
    version,
    about = "Export a Confluence page tree and convert it to Markdown"
)]
pub struct Cli {
    /// The url of the Confluence instance
    pub url: String,
    /// The access token for Confluence
    pub token: String,
    /// The directory to write the files to
    pub out_dir: PathBuf,
    /// Only export this space key
    #[arg(long, value_name = "KEY")]
    pub space: Option<String>,
    /// Skip fetching attachments
    #[arg(long)]
    pub skip_attachments: bool,
    /// Only run the Markdown conversion over an existing export
    #[arg(long)]
    pub no_fetch: bool,
    /// Comma separated, case-insensitive title prefixes whose pages and subtrees are skipped
    #[arg(long, value_name = "PREFIXES")]
    pub ignore_titles: Option<String>,
    /// Mark pages with an existing Markdown export as migrated, using this annotation template
    #[arg(long, value_name = "TEMPLATE", conflicts_with = "no_fetch")]
    pub mark_migrated: Option<PathBuf>,
    /// Offset of the first space listing request
    #[arg(long, default_value_t = 0)]
    pub start_offset: usize,
    /// Number of spaces requested per listing call
    #[arg(long, default_value_t = 50)]
    pub page_size: usize,
    /// Write the rewritten HTML next to each converted page as <name>.adjusted.htm
    #[arg(long)]
    pub debug_html: bool,
    /// Also write the log to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings::new(&self.url, &self.token)
    }

    pub fn walk_settings(&self) -> WalkSettings {
        WalkSettings {
            space: self.space.clone(),
            ignore_titles: self
                .ignore_titles
                .as_deref()
                .map(IgnorePatterns::from_comma_separated)
                .unwrap_or_default(),
            start_offset: self.start_offset,
            page_size: self.page_size,
            ..WalkSettings::default()
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            write_debug_html: self.debug_html,
        }
    }
}
