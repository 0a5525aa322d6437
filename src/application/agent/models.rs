use serde::Serialize;

const DEFAULT_MAX_ITERATIONS: usize = 10;
const DEFAULT_MAX_ATTEMPTS: usize = 3;
const DEFAULT_STOP_WORD: &str = "Observation:";

/// One completed think/act/observe round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStep {
    pub thought: String,
    pub tool: String,
    pub input: String,
    pub observation: String,
}

/// What a successful run produced, along with the trace that led there.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub answer: String,
    pub steps: Vec<AgentStep>,
    pub scratchpad: String,
}

#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Upper bound on think/act rounds within a single run.
    pub max_iterations: usize,
    /// How many times a failed run is restarted before giving up.
    pub max_attempts: usize,
    /// Stop words passed to the model so decoding halts before it invents
    /// an observation.
    pub stop_words: Vec<String>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            stop_words: vec![DEFAULT_STOP_WORD.to_string()],
        }
    }
}
