//! End-to-end tests of the chat loop with a scripted transport, input and renderer.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use futures::stream;
use tokio_test::{assert_err, assert_ok};

use gonkagate_chat::chat::{
    ChatArgs, ChatClient, ChatConfig, Interrupts, LineReader, ReadLine, Renderer, Role,
    Transcript, run,
};
use gonkagate_chat::{
    ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, ChatMessageParam, ChunkStream,
    CompletionTransport, Error, Result,
};

enum Reply {
    Text(&'static str),
    Deltas(Vec<&'static str>),
    Fail(Error),
    Hang,
}

#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
        }
    }

    fn next(&self, request: ChatCompletionRequest) -> Reply {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected request")
    }

    fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn send(&self, request: ChatCompletionRequest) -> Result<ChatCompletion> {
        match self.next(request) {
            Reply::Text(text) => Ok(serde_json::from_value(serde_json::json!({
                "id": "cmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
            }))
            .unwrap()),
            Reply::Deltas(_) => panic!("streaming reply for a batch request"),
            Reply::Fail(err) => Err(err),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn stream(&self, request: ChatCompletionRequest) -> Result<ChunkStream> {
        match self.next(request) {
            Reply::Deltas(deltas) => {
                let chunks: Vec<Result<ChatCompletionChunk>> = deltas
                    .into_iter()
                    .map(|delta| Ok(ChatCompletionChunk::text(delta)))
                    .collect();
                Ok(Box::pin(stream::iter(chunks)))
            }
            Reply::Text(_) => panic!("batch reply for a streaming request"),
            Reply::Fail(err) => Err(err),
            Reply::Hang => Ok(Box::pin(stream::pending::<Result<ChatCompletionChunk>>())),
        }
    }
}

struct ScriptedInput {
    lines: VecDeque<std::result::Result<ReadLine, Error>>,
    prompts: Vec<String>,
    history: Vec<String>,
}

impl ScriptedInput {
    fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines
                .iter()
                .map(|line| Ok(ReadLine::Line(line.to_string())))
                .collect(),
            prompts: Vec::new(),
            history: Vec::new(),
        }
    }

    fn then(mut self, line: std::result::Result<ReadLine, Error>) -> Self {
        self.lines.push_back(line);
        self
    }
}

impl LineReader for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<ReadLine> {
        self.prompts.push(prompt.to_string());
        self.lines.pop_front().unwrap_or(Ok(ReadLine::Eof))
    }

    fn add_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Shown {
    Prefix,
    Token(String),
    Text(String),
    Newline,
    Info(String),
    Error(String),
}

#[derive(Default)]
struct Recorder(Vec<Shown>);

impl Recorder {
    fn infos(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|shown| match shown {
                Shown::Info(info) => Some(info.as_str()),
                _ => None,
            })
            .collect()
    }

    fn errors(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|shown| match shown {
                Shown::Error(error) => Some(error.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for Recorder {
    fn print_assistant_prefix(&mut self) {
        self.0.push(Shown::Prefix);
    }
    fn print_token(&mut self, token: &str) {
        self.0.push(Shown::Token(token.to_string()));
    }
    fn print_text(&mut self, text: &str) {
        self.0.push(Shown::Text(text.to_string()));
    }
    fn newline(&mut self) {
        self.0.push(Shown::Newline);
    }
    fn print_info(&mut self, info: &str) {
        self.0.push(Shown::Info(info.to_string()));
    }
    fn print_error(&mut self, error: &str) {
        self.0.push(Shown::Error(error.to_string()));
    }
}

fn config(stream: bool, save: Option<&Path>) -> ChatConfig {
    let args = ChatArgs {
        system: Some("Be brief.".to_string()),
        stream: Some(stream.to_string()),
        save: save.map(|p| p.display().to_string()),
        ..ChatArgs::default()
    };
    ChatConfig::resolve(args, |name| match name {
        "GONKAGATE_API_KEY" => Some("test-key".to_string()),
        "GONKAGATE_MODEL" => Some("model-a".to_string()),
        _ => None,
    })
    .unwrap()
}

async fn chat(
    config: &ChatConfig,
    transport: ScriptedTransport,
    input: &mut ScriptedInput,
    recorder: &mut Recorder,
) -> (Result<()>, ScriptedTransport) {
    chat_with(config, transport, &Interrupts::new(), input, recorder).await
}

async fn chat_with(
    config: &ChatConfig,
    transport: ScriptedTransport,
    interrupts: &Interrupts,
    input: &mut ScriptedInput,
    recorder: &mut Recorder,
) -> (Result<()>, ScriptedTransport) {
    let client = ChatClient::new(transport);
    let result = run(config, &client, interrupts, input, recorder).await;
    (result, client.into_inner())
}

#[tokio::test]
async fn batch_conversation() {
    let config = config(false, None);
    let transport = ScriptedTransport::new(vec![Reply::Text(" Hi! "), Reply::Text("Fine.")]);
    let mut input = ScriptedInput::new(&["  hello  ", "", "how are you?"]);
    let mut recorder = Recorder::default();

    let (result, transport) = chat(&config, transport, &mut input, &mut recorder).await;
    assert_ok!(result);

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].model, "model-a");
    assert_eq!(requests[0].temperature, Some(0.2));
    assert_eq!(
        requests[1].messages,
        vec![
            ChatMessageParam::system("Be brief."),
            ChatMessageParam::user("hello"),
            ChatMessageParam::assistant("Hi!"),
            ChatMessageParam::user("how are you?"),
        ]
    );

    assert_eq!(
        recorder.0,
        vec![
            Shown::Info("Interactive chat started. Type /help for commands.".to_string()),
            Shown::Prefix,
            Shown::Text("Hi!".to_string()),
            Shown::Prefix,
            Shown::Text("Fine.".to_string()),
            Shown::Info("Input closed. Exiting chat.".to_string()),
        ]
    );
    assert!(input.prompts.iter().all(|prompt| prompt == "you> "));
    assert_eq!(input.history, vec!["hello", "how are you?"]);
}

#[tokio::test]
async fn streaming_renders_tokens_in_order() {
    let config = config(true, None);
    let transport = ScriptedTransport::new(vec![Reply::Deltas(vec!["Hel", "", "lo", " there"])]);
    let mut input = ScriptedInput::new(&["hi", "/exit", "never read"]);
    let mut recorder = Recorder::default();

    let (result, transport) = chat(&config, transport, &mut input, &mut recorder).await;
    assert_ok!(result);
    assert!(transport.requests()[0].stream);
    assert_eq!(
        recorder.0[1..],
        [
            Shown::Prefix,
            Shown::Token("Hel".to_string()),
            Shown::Token("lo".to_string()),
            Shown::Token(" there".to_string()),
            Shown::Newline,
            Shown::Info("Exiting chat.".to_string()),
        ]
    );
    assert_eq!(input.lines.len(), 1);
}

#[tokio::test]
async fn commands_change_later_turns() {
    let config = config(true, None);
    let transport = ScriptedTransport::new(vec![Reply::Text("one"), Reply::Deltas(vec!["two"])]);
    let mut input = ScriptedInput::new(&[
        "/model   model-b ",
        "/stream OFF",
        "first",
        "/reset",
        "/stream on",
        "second",
    ]);
    let mut recorder = Recorder::default();

    let (result, transport) = chat(&config, transport, &mut input, &mut recorder).await;
    assert_ok!(result);

    let requests = transport.requests();
    assert_eq!(requests[0].model, "model-b");
    assert!(!requests[0].stream);
    assert!(requests[1].stream);
    assert_eq!(
        requests[1].messages,
        vec![
            ChatMessageParam::system("Be brief."),
            ChatMessageParam::user("second"),
        ]
    );
    assert_eq!(
        recorder.infos()[1..5],
        [
            "Model set to model-b",
            "Streaming set to false",
            "Conversation reset.",
            "Streaming set to true",
        ]
    );
}

#[tokio::test]
async fn command_errors_do_not_stop_the_chat() {
    let config = config(false, None);
    let transport = ScriptedTransport::new(vec![Reply::Text("still here")]);
    let mut input = ScriptedInput::new(&["/stream maybe", "/model", "/quit", "/help now", "hi"]);
    let mut recorder = Recorder::default();

    let (result, transport) = chat(&config, transport, &mut input, &mut recorder).await;
    assert_ok!(result);
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(
        recorder.errors(),
        vec![
            "usage: /stream on|off",
            "usage: /model <model-id>",
            "unknown command \"/quit\". Use /help",
            "/help does not accept arguments",
        ]
    );
}

#[tokio::test]
async fn failed_turn_is_rolled_back() {
    let config = config(false, None);
    let transport = ScriptedTransport::new(vec![
        Reply::Text("first answer"),
        Reply::Fail(Error::service_unavailable("upstream down", None)),
        Reply::Fail(Error::api(418, None, "  ".to_string(), None)),
        Reply::Text("third answer"),
    ]);
    let mut input = ScriptedInput::new(&["one", "two", "three", "four"]);
    let mut recorder = Recorder::default();

    let (result, transport) = chat(&config, transport, &mut input, &mut recorder).await;
    assert_ok!(result);

    let requests = transport.requests();
    let before_failure = &requests[1].messages[..requests[1].messages.len() - 1];
    let after_failure = &requests[2].messages[..requests[2].messages.len() - 1];
    assert_eq!(before_failure, after_failure);
    assert_eq!(
        requests[3].messages,
        vec![
            ChatMessageParam::system("Be brief."),
            ChatMessageParam::user("one"),
            ChatMessageParam::assistant("first answer"),
            ChatMessageParam::user("four"),
        ]
    );
    assert_eq!(
        recorder.errors(),
        vec![
            "503 Service Unavailable. Retry in a few seconds.",
            "API error 418:",
        ]
    );
    let failed_turn = [
        Shown::Prefix,
        Shown::Newline,
        Shown::Error("503 Service Unavailable. Retry in a few seconds.".to_string()),
    ];
    assert!(recorder.0.windows(3).any(|shown| shown == failed_turn));
}

#[tokio::test]
async fn empty_answers_fail_the_turn() {
    let config = config(true, None);
    let transport = ScriptedTransport::new(vec![Reply::Deltas(vec!["", " "])]);
    let mut input = ScriptedInput::new(&["hello"]);
    let mut recorder = Recorder::default();

    let (result, _) = chat(&config, transport, &mut input, &mut recorder).await;
    assert_ok!(result);
    assert_eq!(
        recorder.errors(),
        vec!["received a streaming response with empty content"]
    );
}

#[tokio::test]
async fn save_command_writes_reloadable_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saves/chat.json");
    let config = config(false, None);
    let transport = ScriptedTransport::new(vec![Reply::Text("pong")]);
    let save = format!("/save {}", path.display());
    let mut input = ScriptedInput::new(&["ping", "/model model-z", save.as_str()]);
    let mut recorder = Recorder::default();

    let (result, _) = chat(&config, transport, &mut input, &mut recorder).await;
    assert_ok!(result);
    assert!(
        recorder
            .infos()
            .contains(&format!("History saved to {}", path.display()).as_str())
    );

    let transcript = Transcript::load(&path).unwrap();
    assert_eq!(transcript.meta.model, "model-z");
    assert_eq!(transcript.meta.base_url, "https://api.gonkagate.com/v1");
    assert!(!transcript.meta.streaming);
    assert_eq!(transcript.meta.temperature, 0.2);
    assert_eq!(transcript.meta.system_prompt, "Be brief.");

    let messages = transcript.to_messages();
    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    assert_eq!(contents, vec!["Be brief.", "ping", "pong"]);
}

#[tokio::test]
async fn failed_save_command_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "file").unwrap();
    let config = config(false, None);
    let transport = ScriptedTransport::new(vec![Reply::Text("ok")]);
    let save = format!("/save {}", blocker.join("chat.json").display());
    let mut input = ScriptedInput::new(&[save.as_str(), "still chatting"]);
    let mut recorder = Recorder::default();

    let (result, transport) = chat(&config, transport, &mut input, &mut recorder).await;
    assert_ok!(result);
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(recorder.errors().len(), 1);
    let reason = std::fs::create_dir_all(&blocker).unwrap_err().to_string();
    assert!(recorder.errors()[0].contains("save history"));
    assert!(recorder.errors()[0].ends_with(&reason));
}

#[tokio::test]
async fn auto_save_on_exit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auto.json");
    let config = config(false, Some(&path));
    let transport = ScriptedTransport::new(vec![Reply::Text("answer")]);
    let mut input = ScriptedInput::new(&["question", "/exit"]);
    let mut recorder = Recorder::default();

    let (result, _) = chat(&config, transport, &mut input, &mut recorder).await;
    assert_ok!(result);
    assert_eq!(
        recorder.infos().last().copied(),
        Some(format!("History saved to {}", path.display()).as_str())
    );
    let transcript = Transcript::load(&path).unwrap();
    assert_eq!(transcript.messages.len(), 3);
    assert_eq!(transcript.messages[2].content, "answer");
}

#[tokio::test]
async fn auto_save_follows_save_command_path() {
    let dir = tempfile::tempdir().unwrap();
    let launch = dir.path().join("launch.json");
    let moved = dir.path().join("moved.json");
    let config = config(false, Some(&launch));
    let save = format!("/save {}", moved.display());
    let mut input = ScriptedInput::new(&[save.as_str(), "/reset"]);
    let mut recorder = Recorder::default();

    let (result, _) = chat(&config, ScriptedTransport::default(), &mut input, &mut recorder).await;
    assert_ok!(result);
    assert!(!launch.exists());
    assert!(moved.exists());
}

#[tokio::test]
async fn failed_auto_save_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "file").unwrap();
    let config = config(false, Some(&blocker.join("auto.json")));
    let mut input = ScriptedInput::new(&[]);
    let mut recorder = Recorder::default();

    let (result, _) = chat(&config, ScriptedTransport::default(), &mut input, &mut recorder).await;
    let err = assert_err!(result);
    assert!(err.to_string().contains("save history"));
}

#[tokio::test]
async fn input_errors_are_fatal() {
    let config = config(false, None);
    let mut input = ScriptedInput::new(&[]).then(Err(Error::io(
        "read input",
        std::io::Error::other("tty gone"),
    )));
    let mut recorder = Recorder::default();

    let (result, _) = chat(&config, ScriptedTransport::default(), &mut input, &mut recorder).await;
    let err = assert_err!(result);
    assert_eq!(err.to_string(), "I/O error: read input");
    assert!(!recorder.infos().contains(&"Input closed. Exiting chat."));
}

#[tokio::test]
async fn ctrl_c_at_prompt_is_ignored() {
    let config = config(false, None);
    let transport = ScriptedTransport::new(vec![Reply::Text("yes")]);
    let mut input = ScriptedInput::new(&[])
        .then(Ok(ReadLine::Interrupted))
        .then(Ok(ReadLine::Line("still there?".to_string())));
    let mut recorder = Recorder::default();

    let (result, transport) = chat(&config, transport, &mut input, &mut recorder).await;
    assert_ok!(result);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn interrupt_cancels_only_the_current_turn() {
    for stream in [false, true] {
        let config = config(stream, None);
        let reply = if stream {
            Reply::Deltas(vec!["recovered"])
        } else {
            Reply::Text("recovered")
        };
        let transport = ScriptedTransport::new(vec![Reply::Hang, reply]);
        let mut input = ScriptedInput::new(&["tell me a long story", "short one then"]);
        let mut recorder = Recorder::default();

        let interrupts = Interrupts::new();
        let trigger = interrupts.clone();
        tokio::spawn(async move {
            while trigger.listeners() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger();
        });

        let (result, transport) = tokio::time::timeout(
            Duration::from_secs(5),
            chat_with(&config, transport, &interrupts, &mut input, &mut recorder),
        )
        .await
        .expect("chat hung after interrupt");
        assert_ok!(result);

        assert!(
            recorder
                .infos()
                .contains(&"Interrupt received. Canceling generation...")
        );
        assert_eq!(recorder.errors(), vec!["generation canceled"]);
        let interrupted_turn = [
            Shown::Prefix,
            Shown::Newline,
            Shown::Info("Interrupt received. Canceling generation...".to_string()),
            Shown::Error("generation canceled".to_string()),
        ];
        assert!(recorder.0.windows(4).any(|shown| shown == interrupted_turn));

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].messages,
            vec![
                ChatMessageParam::system("Be brief."),
                ChatMessageParam::user("short one then"),
            ]
        );
        assert_eq!(interrupts.listeners(), 0);
    }
}
