/// Local date in the `YYYY-MM-DD` form the prompt quotes.
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Renders prior rounds as `Question:`/`Answer:` pairs, one pair per turn.
pub fn render_history(history: &[(String, String)]) -> String {
    history
        .iter()
        .map(|(question, answer)| format!("Question:{question}\nAnswer:{answer}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fills the instruction template. The wording and spacing are load-bearing:
/// the parser looks for these exact marker lines in the completion.
pub fn render_prompt(
    today: &str,
    tool_descs: &str,
    tool_names: &str,
    chat_history: &str,
    query: &str,
    agent_scratchpad: &str,
) -> String {
    format!(
        r#"
Today is {today}. Please Answer the following questions as best you can. You have access to the following tools:

{tool_descs}

These are chat history before:
{chat_history}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can be repeated zero or more times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

Question: {query}
{agent_scratchpad}
"#
    )
}
