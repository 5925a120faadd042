use clap::Parser;
use clap::builder::BoolishValueParser;

use crate::events::EVENTS_MAX;

#[derive(Parser)]
#[command(name = "kube-selfheal")]
#[command(about = "Watch pods for crash loops and OOM kills, suggest and apply fixes")]
pub struct Cli {
    /// Namespace to watch
    #[arg(short = 'n', long, env = "NAMESPACE", default_value = "boutique")]
    pub namespace: String,

    /// Delete pods that are crash looping or OOM killed
    #[arg(long, env = "AUTO_APPLY", value_parser = BoolishValueParser::new())]
    pub auto_apply: bool,

    /// Ask the suggestion generator instead of using the built-in template
    #[arg(long, env = "USE_GEMINI", value_parser = BoolishValueParser::new())]
    pub use_generated_suggestions: bool,

    /// URL of the suggestion generator
    #[arg(long, env = "SUGGESTION_ENDPOINT")]
    pub suggestion_endpoint: Option<String>,

    /// Port for the status endpoint
    #[arg(short = 'p', long, env = "STATUS_PORT", default_value_t = 8081)]
    pub status_port: u16,

    /// Number of events kept for the status endpoint
    #[arg(long, env = "EVENTS_MAX", default_value_t = EVENTS_MAX)]
    pub events_max: usize,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Settings fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub namespace: String,
    pub auto_apply: bool,
    pub use_generated_suggestions: bool,
    pub suggestion_endpoint: Option<String>,
    pub status_port: u16,
    pub events_max: usize,
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self {
            namespace: cli.namespace.clone(),
            auto_apply: cli.auto_apply,
            use_generated_suggestions: cli.use_generated_suggestions,
            suggestion_endpoint: cli.suggestion_endpoint.clone(),
            status_port: cli.status_port,
            events_max: cli.events_max,
        }
    }
}
