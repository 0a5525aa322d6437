const THOUGHT_MARKER: &str = "Thought:";
const FINAL_ANSWER_MARKER: &str = "\nFinal Answer:";
const ACTION_MARKER: &str = "\nAction:";
const ACTION_INPUT_MARKER: &str = "\nAction Input:";
const OBSERVATION_MARKER: &str = "\nObservation:";

/// What a model response asks the loop to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentDirective {
    /// The model committed to an answer; the run is finished.
    Final { answer: String },
    /// The model requested a tool call. `observation_missing` is true when
    /// the response carries no `Observation:` of its own, which is the
    /// normal case: decoding stops before the model can invent one.
    CallTool {
        thought: String,
        tool: String,
        input: String,
        observation_missing: bool,
    },
    /// The response fits neither shape.
    Malformed,
}

/// Scans a response for the protocol markers and extracts the directive.
///
/// Each marker is located by its last occurrence, so a model that echoes
/// earlier rounds before continuing still parses as its newest step. A final
/// answer wins whenever it appears after the last thought; otherwise the
/// markers must read Thought, Action, Action Input in order.
pub fn parse_directive(response: &str) -> AgentDirective {
    let thought_i = last_position(response, THOUGHT_MARKER);
    let final_answer_i = last_position(response, FINAL_ANSWER_MARKER);
    let action_i = last_position(response, ACTION_MARKER);
    let action_input_i = last_position(response, ACTION_INPUT_MARKER);
    let observation_i = last_position(response, OBSERVATION_MARKER);

    if final_answer_i >= 0 && thought_i < final_answer_i {
        let answer_start = final_answer_i as usize + FINAL_ANSWER_MARKER.len();
        return AgentDirective::Final {
            answer: response[answer_start..].trim().to_string(),
        };
    }

    if thought_i >= action_i || action_i >= action_input_i {
        return AgentDirective::Malformed;
    }

    let observation_missing = observation_i < 0;
    let input_end = if observation_missing {
        response.len()
    } else {
        observation_i as usize
    };

    let thought = if thought_i >= 0 {
        let thought_start = thought_i as usize + THOUGHT_MARKER.len();
        response[thought_start..action_i as usize].trim().to_string()
    } else {
        String::new()
    };
    let tool_start = action_i as usize + ACTION_MARKER.len();
    let tool = response[tool_start..action_input_i as usize]
        .trim()
        .to_string();
    // The last Observation: can sit before Action Input: when the model
    // echoes an old round; that leaves no input text at all.
    let input_start = action_input_i as usize + ACTION_INPUT_MARKER.len();
    let input = if input_end > input_start {
        response[input_start..input_end].trim().to_string()
    } else {
        String::new()
    };

    AgentDirective::CallTool {
        thought,
        tool,
        input,
        observation_missing,
    }
}

fn last_position(text: &str, marker: &str) -> isize {
    text.rfind(marker).map_or(-1, |index| index as isize)
}
