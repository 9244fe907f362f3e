use clap::{Parser, Subcommand};

/// `weekendscout` - Plan-driven weekend event discovery agent.
#[derive(Parser, Debug)]
#[command(name = "weekendscout")]
#[command(version = "0.1.0")]
#[command(about = "Find weekend cultural events with a planning LLM agent.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan and execute one discovery run, printing events as JSON
    Run {
        /// Topic to bias queries toward (samba, jazz, teatro, ...)
        #[arg(short, long, default_value = "samba")]
        focus: String,

        /// City to search in (default comes from config)
        #[arg(long)]
        city: Option<String>,

        /// Provider to use (ollama, openai)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use
        #[arg(long)]
        model: Option<String>,
    },

    /// List the tool vocabulary and what is registered
    Tools,
}
