use std::path::PathBuf;

use clap::Parser;

use crate::models::Language;

#[derive(Parser, Debug)]
#[command(
    name = "depgate",
    about = "Gate third-party dependencies on license policy and release age",
    version
)]
pub struct Cli {
    /// Project path to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Tool config file [default: ./.depgate/config.toml, fallback ~/.config/depgate/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Policy document (YAML or JSON); overrides `policy.path` from the config
    #[arg(long, value_name = "FILE")]
    pub policy: Option<PathBuf>,

    /// Skip registry lookups; cooling rules then have no age data to check
    #[arg(long)]
    pub offline: bool,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Write the report to FILE instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Include the `sbom_metadata` block in the JSON report
    #[arg(long)]
    pub sbom_metadata: bool,

    /// Exclude a language from scanning (repeatable)
    #[arg(long = "exclude-lang", value_name = "LANG")]
    pub exclude_lang: Vec<LangArg>,

    /// Show all dependencies (not just issues)
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LangArg {
    Go,
    Node,
    Python,
    Rust,
    Dotnet,
    Actions,
}

impl From<LangArg> for Language {
    fn from(arg: LangArg) -> Self {
        match arg {
            LangArg::Go => Language::Go,
            LangArg::Node => Language::Node,
            LangArg::Python => Language::Python,
            LangArg::Rust => Language::Rust,
            LangArg::Dotnet => Language::DotNet,
            LangArg::Actions => Language::Actions,
        }
    }
}
