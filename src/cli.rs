use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::state::SettingsOverrides;
use crate::core::version::Target;

#[derive(Parser)]
#[command(name = "mc-lang-sync")]
#[command(about = "Mirror Minecraft Java and Bedrock Edition language files", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Repository root holding `bedrock/`, `java/` and `versions.json`
    #[arg(long, global = true, env = "MC_LANG_BASE_DIR", default_value = ".")]
    pub base_dir: PathBuf,

    /// Package cache and scratch space (defaults to the user cache directory)
    #[arg(long, global = true, env = "MC_LANG_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory holding XvdTool.Streaming and CikExtractor
    #[arg(long, global = true, env = "MC_LANG_TOOLS_DIR")]
    pub tools_dir: Option<PathBuf>,

    /// Retries for transient network errors
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Keep downloaded packages after extraction
    #[arg(long, global = true)]
    pub keep_packages: bool,
}

impl GlobalArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            base_dir: self.base_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            tools_dir: self.tools_dir.clone(),
            retries: self.retries,
            keep_packages: self.keep_packages,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run CikExtractor and print the CIK_DATA value
    ExtractCik,

    /// Fetch, extract, organise and merge one Bedrock Edition version
    Bedrock {
        /// Version number or `latest`
        #[arg(short, long, default_value = "latest")]
        target: Target,
    },

    /// Rebuild bedrock/merged/<version> from bedrock/extracted/<version>
    Merge {
        #[arg(short, long)]
        target: String,
    },

    /// Update one Java Edition version
    Java {
        /// Version id or `latest`
        #[arg(short, long, default_value = "latest")]
        target: Target,
    },

    /// Process every missing version and commit each one
    Sync {
        #[arg(long, value_enum, default_value_t = EditionArg::All)]
        edition: EditionArg,

        /// Push once at the end if anything was committed
        #[arg(long)]
        push: bool,

        /// Process without committing
        #[arg(long)]
        no_commit: bool,

        /// Process at most N versions per edition
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EditionArg {
    Bedrock,
    Java,
    All,
}

impl EditionArg {
    pub fn includes_bedrock(self) -> bool {
        matches!(self, EditionArg::Bedrock | EditionArg::All)
    }

    pub fn includes_java(self) -> bool {
        matches!(self, EditionArg::Java | EditionArg::All)
    }
}
