use super::*;
use crate::model::{ModelError, ModelProvider};
use crate::tooling::{
    CalculatorTool, ToolDefinition, ToolHandler, ToolInvokeError, ToolParameter, ToolRegistry,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct ScriptedProvider {
    responses: Arc<Mutex<Vec<String>>>,
    recordings: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.into_iter().map(String::from).collect(),
            )),
            recordings: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn requests(&self) -> Vec<(String, Vec<String>)> {
        self.recordings.lock().await.clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String, ModelError> {
        let mut responses = self.responses.lock().await;
        let response = responses.remove(0);
        let mut recordings = self.recordings.lock().await;
        recordings.push((prompt.to_string(), stop.to_vec()));
        Ok(response)
    }
}

struct FailingTool;

#[async_trait]
impl ToolHandler for FailingTool {
    async fn invoke(&self, _arguments: Value) -> Result<String, ToolInvokeError> {
        Err(ToolInvokeError::Failed("boom".to_string()))
    }
}

fn calculator_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            ToolDefinition::new("calculator", "does arithmetic over two operands")
                .with_parameter(ToolParameter::new("a", "first operand", "number", true))
                .with_parameter(ToolParameter::new("b", "second operand", "number", true)),
            CalculatorTool,
        )
        .expect("register calculator");
    Arc::new(registry)
}

fn runner_with(
    provider: &ScriptedProvider,
    registry: Arc<ToolRegistry>,
    options: AgentOptions,
) -> AgentRunner {
    AgentRunner::new(Arc::new(provider.clone()), registry, options)
}

#[test]
fn parses_complete_action_response() {
    let response = "Thought: 需要查询资料\nAction: milvus_search\nAction Input: {\"query\": \"护照\"}";
    assert_eq!(
        parse_directive(response),
        AgentDirective::CallTool {
            thought: "需要查询资料".to_string(),
            tool: "milvus_search".to_string(),
            input: "{\"query\": \"护照\"}".to_string(),
            observation_missing: true,
        }
    );
}

#[test]
fn final_answer_after_last_thought_ends_the_run() {
    let response = "Thought: 先算一下\nAction: calculator\nAction Input: {\"a\":3,\"b\":5}\nObservation: 8\nThought: I now know the final answer\nFinal Answer: 8 元";
    assert_eq!(
        parse_directive(response),
        AgentDirective::Final {
            answer: "8 元".to_string(),
        }
    );
}

#[test]
fn final_answer_without_thought_still_wins() {
    let response = "I can answer directly.\nFinal Answer: 你好";
    assert_eq!(
        parse_directive(response),
        AgentDirective::Final {
            answer: "你好".to_string(),
        }
    );
}

#[test]
fn final_answer_before_last_thought_is_not_final() {
    let response = "\nFinal Answer: early\nThought: still thinking";
    assert_eq!(parse_directive(response), AgentDirective::Malformed);
}

#[test]
fn missing_thought_before_action_is_tolerated() {
    let response = "preamble\nAction: calculator\nAction Input: {\"a\":1,\"b\":2}";
    assert_eq!(
        parse_directive(response),
        AgentDirective::CallTool {
            thought: String::new(),
            tool: "calculator".to_string(),
            input: "{\"a\":1,\"b\":2}".to_string(),
            observation_missing: true,
        }
    );
}

#[test]
fn action_without_input_is_malformed() {
    assert_eq!(
        parse_directive("Thought: x\nAction: calculator"),
        AgentDirective::Malformed
    );
}

#[test]
fn input_before_action_is_malformed() {
    assert_eq!(
        parse_directive("Thought: plan\nAction Input: {}\nAction: calculator"),
        AgentDirective::Malformed
    );
}

#[test]
fn empty_response_is_malformed() {
    assert_eq!(parse_directive(""), AgentDirective::Malformed);
}

#[test]
fn takes_last_occurrence_of_each_marker() {
    let response = "Thought: first\nAction: milvus_search\nAction Input: {}\nThought: second\nAction: calculator\nAction Input: {\"a\":2,\"b\":3}\nObservation:";
    assert_eq!(
        parse_directive(response),
        AgentDirective::CallTool {
            thought: "second".to_string(),
            tool: "calculator".to_string(),
            input: "{\"a\":2,\"b\":3}".to_string(),
            observation_missing: false,
        }
    );
}

#[test]
fn observation_marker_before_input_yields_empty_input() {
    // The thought runs all the way to `Action:`, stale observation included.
    let response =
        "Thought: a\nObservation: stale\nAction: calculator\nAction Input: {\"a\":1,\"b\":1}";
    assert_eq!(
        parse_directive(response),
        AgentDirective::CallTool {
            thought: "a\nObservation: stale".to_string(),
            tool: "calculator".to_string(),
            input: String::new(),
            observation_missing: false,
        }
    );
}

#[test]
fn trims_whitespace_around_segments() {
    let response = "Thought:   padded  \nAction:  calculator  \nAction Input:  { }  ";
    assert_eq!(
        parse_directive(response),
        AgentDirective::CallTool {
            thought: "padded".to_string(),
            tool: "calculator".to_string(),
            input: "{ }".to_string(),
            observation_missing: true,
        }
    );
}

#[test]
fn renders_prompt_template_verbatim() {
    let rendered = super::prompt::render_prompt(
        "2024-05-01",
        "calculator: does math,args: []",
        "calculator",
        "Question:上次的问题\nAnswer:上次的回答",
        "今天的问题",
        "Thought: 想一想\n",
    );
    let expected = concat!(
        "\n",
        "Today is 2024-05-01. Please Answer the following questions as best you can. You have access to the following tools:\n",
        "\n",
        "calculator: does math,args: []\n",
        "\n",
        "These are chat history before:\n",
        "Question:上次的问题\n",
        "Answer:上次的回答\n",
        "\n",
        "Use the following format:\n",
        "\n",
        "Question: the input question you must answer\n",
        "Thought: you should always think about what to do\n",
        "Action: the action to take, should be one of [calculator]\n",
        "Action Input: the input to the action\n",
        "Observation: the result of the action\n",
        "... (this Thought/Action/Action Input/Observation can be repeated zero or more times)\n",
        "Thought: I now know the final answer\n",
        "Final Answer: the final answer to the original input question\n",
        "\n",
        "Begin!\n",
        "\n",
        "Question: 今天的问题\n",
        "Thought: 想一想\n",
        "\n",
    );
    assert_eq!(rendered, expected);
}

#[tokio::test]
async fn final_answer_updates_history() {
    let provider =
        ScriptedProvider::new(vec!["Thought: I now know the final answer\nFinal Answer: 你好！"]);
    let runner = runner_with(&provider, calculator_registry(), AgentOptions::default());
    let mut history = Vec::new();

    let outcome = runner.execute("你好", &mut history).await.expect("run succeeds");
    assert_eq!(outcome.answer, "你好！");
    assert!(outcome.steps.is_empty());
    assert_eq!(history, vec![("你好".to_string(), "你好！".to_string())]);

    let requests = provider.requests().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].0.contains("Today is "));
    assert!(requests[0].0.contains("Question: 你好"));
}

#[tokio::test]
async fn calculator_round_trip_produces_answer() {
    let provider = ScriptedProvider::new(vec![
        "Thought: 需要计算\nAction: calculator\nAction Input: {\"a\": 3, \"b\": 5}",
        "Thought: I now know the final answer\nFinal Answer: 8",
    ]);
    let runner = runner_with(&provider, calculator_registry(), AgentOptions::default());
    let mut history = Vec::new();

    let outcome = runner
        .execute("3 加 5 等于多少", &mut history)
        .await
        .expect("run succeeds");
    assert_eq!(outcome.answer, "8");
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.steps[0].tool, "calculator");
    assert_eq!(outcome.steps[0].observation, "8");
    assert_eq!(outcome.scratchpad.matches("Observation:").count(), 1);
    assert!(outcome.scratchpad.ends_with("Observation: 8\n"));
    assert_eq!(history.len(), 1);

    let requests = provider.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].1, vec!["Observation:".to_string()]);
    assert!(requests[1].0.contains("Thought: 需要计算"));
    assert!(requests[1].0.contains("Observation: 8"));
}

#[tokio::test]
async fn unknown_tool_feeds_not_exist_observation() {
    let provider = ScriptedProvider::new(vec![
        "Thought: 翻译一下\nAction: translate\nAction Input: {\"text\": \"hi\"}",
        "Thought: I now know the final answer\nFinal Answer: 换个方式回答",
    ]);
    let runner = runner_with(&provider, calculator_registry(), AgentOptions::default());
    let mut history = Vec::new();

    let outcome = runner.execute("打个招呼", &mut history).await.expect("run succeeds");
    assert_eq!(outcome.steps[0].observation, "the tool not exist");
    assert!(outcome.scratchpad.contains("Observation: the tool not exist"));
    assert_eq!(outcome.answer, "换个方式回答");
}

#[tokio::test]
async fn undecodable_arguments_become_system_error_observation() {
    let provider = ScriptedProvider::new(vec![
        "Thought: 算一下\nAction: calculator\nAction Input: not json",
        "Thought: I now know the final answer\nFinal Answer: 无法计算",
    ]);
    let runner = runner_with(&provider, calculator_registry(), AgentOptions::default());
    let mut history = Vec::new();

    let outcome = runner.execute("算一算", &mut history).await.expect("run succeeds");
    assert!(outcome.steps[0].observation.starts_with("Error decoding JSON:"));
    assert!(outcome.scratchpad.contains("Error decoding JSON:"));
}

#[tokio::test]
async fn failing_tool_keeps_the_loop_running() {
    let mut registry = ToolRegistry::new();
    registry
        .register(ToolDefinition::new("boom", "always fails"), FailingTool)
        .expect("register boom");
    let provider = ScriptedProvider::new(vec![
        "Thought: 试试\nAction: boom\nAction Input: {}",
        "Thought: I now know the final answer\nFinal Answer: 工具坏了",
    ]);
    let runner = runner_with(&provider, Arc::new(registry), AgentOptions::default());
    let mut history = Vec::new();

    let outcome = runner.execute("测试", &mut history).await.expect("run succeeds");
    assert!(outcome.steps[0].observation.contains("boom"));
    assert_eq!(outcome.answer, "工具坏了");
}

#[tokio::test]
async fn malformed_response_fails_the_run() {
    let provider = ScriptedProvider::new(vec!["我不知道该怎么办"]);
    let runner = runner_with(&provider, calculator_registry(), AgentOptions::default());
    let mut history = Vec::new();

    let error = runner
        .execute("帮帮我", &mut history)
        .await
        .expect_err("run fails");
    assert!(matches!(error, AgentError::ProtocolFormat));
    assert_eq!(error.user_message(), "LLM回复格式异常");
    assert!(history.is_empty());
}

#[tokio::test]
async fn retry_recovers_from_malformed_attempts() {
    let provider = ScriptedProvider::new(vec![
        "格式不对",
        "还是不对",
        "Thought: I now know the final answer\nFinal Answer: 第三次成功",
    ]);
    let runner = runner_with(&provider, calculator_registry(), AgentOptions::default());
    let mut history = Vec::new();

    let outcome = runner
        .execute_with_retry("重试", &mut history)
        .await
        .expect("third attempt succeeds");
    assert_eq!(outcome.answer, "第三次成功");
    assert_eq!(history.len(), 1);
    assert_eq!(provider.requests().await.len(), 3);
}

#[tokio::test]
async fn retry_returns_the_last_failure() {
    let provider = ScriptedProvider::new(vec![
        "格式不对",
        "还是不对",
        "Thought: t\nAction: calculator\nAction Input: {\"a\": 1, \"b\": 2}",
    ]);
    let options = AgentOptions {
        max_iterations: 1,
        ..AgentOptions::default()
    };
    let runner = runner_with(&provider, calculator_registry(), options);
    let mut history = Vec::new();

    let error = runner
        .execute_with_retry("重试", &mut history)
        .await
        .expect_err("all attempts fail");
    assert!(matches!(error, AgentError::IterationLimitExceeded { limit: 1 }));
    assert_eq!(provider.requests().await.len(), 3);
    assert!(history.is_empty());
}

#[tokio::test]
async fn iteration_limit_is_reported() {
    let provider = ScriptedProvider::new(vec![
        "Thought: t\nAction: calculator\nAction Input: {\"a\": 1, \"b\": 2}",
        "Thought: t\nAction: calculator\nAction Input: {\"a\": 2, \"b\": 3}",
    ]);
    let options = AgentOptions {
        max_iterations: 2,
        max_attempts: 1,
        ..AgentOptions::default()
    };
    let runner = runner_with(&provider, calculator_registry(), options);
    let mut history = Vec::new();

    let error = runner
        .execute("算个不停", &mut history)
        .await
        .expect_err("limit reached");
    assert!(matches!(error, AgentError::IterationLimitExceeded { limit: 2 }));
    assert_eq!(
        error.user_message(),
        "思考次数过多，已停止本次回答，请换个问法再试。"
    );
}

#[tokio::test]
async fn cancelled_token_stops_before_the_model_call() {
    let provider = ScriptedProvider::new(vec![]);
    let token = CancellationToken::new();
    token.cancel();
    let runner = runner_with(&provider, calculator_registry(), AgentOptions::default())
        .with_cancellation(token);
    let mut history = Vec::new();

    let error = runner
        .execute_with_retry("取消", &mut history)
        .await
        .expect_err("cancelled run fails");
    assert!(matches!(error, AgentError::Cancelled));
    assert!(provider.requests().await.is_empty());
}

#[tokio::test]
async fn custom_stop_words_are_forwarded() {
    let provider =
        ScriptedProvider::new(vec!["Thought: I now know the final answer\nFinal Answer: ok"]);
    let options = AgentOptions {
        stop_words: vec!["Observation".to_string()],
        ..AgentOptions::default()
    };
    let runner = runner_with(&provider, calculator_registry(), options);
    let mut history = Vec::new();

    runner.execute("停止词", &mut history).await.expect("run succeeds");
    let requests = provider.requests().await;
    assert_eq!(requests[0].1, vec!["Observation".to_string()]);
}

#[tokio::test]
async fn observation_marker_is_not_duplicated() {
    let provider = ScriptedProvider::new(vec![
        "Thought: x\nAction: calculator\nAction Input: {\"a\":1,\"b\":1}\nObservation:",
        "Thought: I now know the final answer\nFinal Answer: 2",
    ]);
    let runner = runner_with(&provider, calculator_registry(), AgentOptions::default());
    let mut history = Vec::new();

    let outcome = runner.execute("1 加 1", &mut history).await.expect("run succeeds");
    assert_eq!(outcome.scratchpad.matches("Observation:").count(), 1);
    assert!(outcome.scratchpad.ends_with("\nObservation:2\n"));
}

#[tokio::test]
async fn seeded_history_is_rendered_into_the_prompt() {
    let provider =
        ScriptedProvider::new(vec!["Thought: I now know the final answer\nFinal Answer: 记得"]);
    let runner = runner_with(&provider, calculator_registry(), AgentOptions::default());
    let mut history = vec![("之前的问题".to_string(), "之前的回答".to_string())];

    runner.execute("还记得吗", &mut history).await.expect("run succeeds");
    let requests = provider.requests().await;
    assert!(requests[0]
        .0
        .contains("Question:之前的问题\nAnswer:之前的回答"));
    assert_eq!(history.len(), 2);
}
