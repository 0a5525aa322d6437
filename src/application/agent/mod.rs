mod errors;
mod models;
mod parser;
mod prompt;
mod runner;

#[cfg(test)]
mod tests;

pub use errors::AgentError;
pub use models::{AgentOptions, AgentOutcome, AgentStep};
pub use parser::{parse_directive, AgentDirective};
pub use runner::AgentRunner;
