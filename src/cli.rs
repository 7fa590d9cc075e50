use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Read(ReadArgs),
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Table of contents file (YAML or JSON).
    #[arg(long)]
    pub toc: String,

    /// Index of the chapter to open first.
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Reader config file (YAML).
    #[arg(long)]
    pub config: Option<String>,

    /// Maximum chapters kept rendered at once.
    #[arg(long)]
    pub window_capacity: Option<usize>,

    /// Read progress (percent) of the newest chapter that triggers a prefetch.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Simulated viewport height in pixels.
    #[arg(long, default_value_t = 800.0)]
    pub viewport_height: f64,

    /// Pixels scrolled per simulated frame.
    #[arg(long, default_value_t = 120.0)]
    pub scroll_step: f64,

    /// Give up after this many simulated frames.
    #[arg(long, default_value_t = 5000)]
    pub max_steps: usize,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Saved chapter page.
    #[arg(long)]
    pub html: String,

    /// URL the page was fetched from.
    #[arg(long)]
    pub url: String,

    /// Reader config file (YAML) providing the site profile.
    #[arg(long)]
    pub config: Option<String>,
}
