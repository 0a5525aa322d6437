use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "reagent",
    version,
    about = "ReAct agent over configurable model providers"
)]
pub struct Cli {
    #[arg(long)]
    pub config: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long, value_enum, default_value_t = RunMode::Repl)]
    pub mode: RunMode,
    #[arg()]
    pub query: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RunMode {
    Repl,
    Once,
}
