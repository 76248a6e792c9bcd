//! Codex agent options and configuration
//!
//! Main configuration for both the one-shot exec mode and the bidirectional
//! app-server mode, with a builder for ergonomic setup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::Result;
use crate::hooks::EventHooks;

use super::approvals::{
    ApprovalCallback, ApprovalPolicy, ColorMode, SandboxMode, UserInputCallback,
};
use super::identifiers::SessionId;
use super::messages::Message;
use super::tools::CodexTool;

/// Callback receiving one trimmed stderr line from the child process
pub type StderrCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Custom parser overriding the built-in message classifier
pub type EventParser = Arc<dyn Fn(&Value) -> Result<Message> + Send + Sync>;

/// Predicate deciding whether a message ends the logical turn
pub type FinalEventPredicate = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

/// Output schema constraining the final answer
#[derive(Debug, Clone)]
pub enum OutputSchema {
    /// Inline JSON schema
    Inline(Value),
    /// Path to a JSON schema file
    Path(PathBuf),
}

/// Main options for the Codex Agent SDK
#[derive(Clone)]
pub struct CodexAgentOptions {
    /// Explicit path to the Codex CLI (searched on PATH if unset)
    pub cli_path: Option<PathBuf>,
    /// Model to use
    pub model: Option<String>,
    /// Use a local open-source model
    pub oss: bool,
    /// Sandbox mode for command execution
    pub sandbox: Option<SandboxMode>,
    /// Approval policy; also the fallback for unanswered approval requests
    pub ask_for_approval: Option<ApprovalPolicy>,
    /// Low-friction preset: workspace writes allowed, approvals on failure
    pub full_auto: bool,
    /// Bypass approvals and sandboxing entirely
    pub yolo: bool,
    /// Configuration profile name
    pub profile: Option<String>,
    /// `-c key=value` configuration overrides (values JSON-encoded)
    pub config_overrides: HashMap<String, Value>,
    /// Raw `key=value` configuration override strings
    pub config_kv: Vec<String>,
    /// Working directory for the CLI process
    pub cwd: Option<PathBuf>,
    /// Additional writable directories
    pub add_dirs: Vec<PathBuf>,
    /// Skip the git repository safety check
    pub skip_git_repo_check: bool,
    /// Image attachments for the prompt
    pub images: Vec<PathBuf>,
    /// Enable web search
    pub search: bool,
    /// Emit line-delimited JSON events (`--json`)
    pub include_json_events: bool,
    /// Schema constraining the final answer
    pub output_schema: Option<OutputSchema>,
    /// File to receive the last agent message
    pub output_last_message: Option<PathBuf>,
    /// Terminal color mode
    pub color: Option<ColorMode>,
    /// Session (thread) id to resume
    pub resume_session: Option<SessionId>,
    /// Resume the most recent session
    pub resume_last: bool,
    /// Pick the session to resume interactively
    pub resume_all: bool,
    /// Inherit the parent environment (filtered) into the child
    pub inherit_env: bool,
    /// When non-empty, only these inherited variables are kept
    pub env_allowlist: Vec<String>,
    /// Inherited variables to remove
    pub env_denylist: Vec<String>,
    /// Explicit environment overrides for the child
    pub env: HashMap<String, String>,
    /// Callback receiving child stderr lines; stderr is piped only when set
    pub stderr: Option<StderrCallback>,
    /// Custom event parser replacing the built-in classifier
    pub event_parser: Option<EventParser>,
    /// Event hooks keyed by message kind, plus the `"*"` wildcard
    pub event_hooks: EventHooks,
    /// Custom stopping rule for `receive_response`
    pub final_event_predicate: Option<FinalEventPredicate>,
    /// Force app-server mode even without dynamic tools
    pub use_app_server: bool,
    /// Dynamic tools exposed through the app-server protocol
    pub dynamic_tools: Vec<CodexTool>,
    /// Command approval callback (prefer `approval_callbacks["command"]`)
    pub approve_command: Option<ApprovalCallback>,
    /// File-change approval callback (prefer `approval_callbacks["file_change"]`)
    pub approve_file_change: Option<ApprovalCallback>,
    /// Approval callbacks keyed by kind (`command`, `file_change`)
    pub approval_callbacks: HashMap<String, ApprovalCallback>,
    /// Callback answering user-input requests raised mid-turn
    pub request_user_input: Option<UserInputCallback>,
    /// Timeout for app-server requests; `None` disables the timeout
    pub request_timeout: Option<Duration>,
    /// Maximum buffer size for one JSON message (default 1MB)
    pub max_buffer_size: Option<usize>,
    /// Extra CLI flags passed through verbatim
    pub extra_args: HashMap<String, Option<String>>,
}

impl Default for CodexAgentOptions {
    fn default() -> Self {
        Self {
            cli_path: None,
            model: None,
            oss: false,
            sandbox: None,
            ask_for_approval: None,
            full_auto: false,
            yolo: false,
            profile: None,
            config_overrides: HashMap::new(),
            config_kv: Vec::new(),
            cwd: None,
            add_dirs: Vec::new(),
            skip_git_repo_check: false,
            images: Vec::new(),
            search: false,
            include_json_events: true,
            output_schema: None,
            output_last_message: None,
            color: None,
            resume_session: None,
            resume_last: false,
            resume_all: false,
            inherit_env: true,
            env_allowlist: Vec::new(),
            env_denylist: Vec::new(),
            env: HashMap::new(),
            stderr: None,
            event_parser: None,
            event_hooks: EventHooks::new(),
            final_event_predicate: None,
            use_app_server: false,
            dynamic_tools: Vec::new(),
            approve_command: None,
            approve_file_change: None,
            approval_callbacks: HashMap::new(),
            request_user_input: None,
            request_timeout: Some(Duration::from_secs(30)),
            max_buffer_size: None,
            extra_args: HashMap::new(),
        }
    }
}

impl CodexAgentOptions {
    /// Create a new builder for `CodexAgentOptions`
    #[must_use]
    pub fn builder() -> CodexAgentOptionsBuilder {
        CodexAgentOptionsBuilder::default()
    }

    /// Whether this configuration requires the bidirectional app-server mode
    #[must_use]
    pub fn wants_app_server(&self) -> bool {
        self.use_app_server
            || !self.dynamic_tools.is_empty()
            || !self.approval_callbacks.is_empty()
            || self.approve_command.is_some()
            || self.approve_file_change.is_some()
            || self.request_user_input.is_some()
    }
}

impl std::fmt::Debug for CodexAgentOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodexAgentOptions")
            .field("cli_path", &self.cli_path)
            .field("model", &self.model)
            .field("oss", &self.oss)
            .field("sandbox", &self.sandbox)
            .field("ask_for_approval", &self.ask_for_approval)
            .field("full_auto", &self.full_auto)
            .field("yolo", &self.yolo)
            .field("profile", &self.profile)
            .field("config_overrides", &self.config_overrides)
            .field("config_kv", &self.config_kv)
            .field("cwd", &self.cwd)
            .field("add_dirs", &self.add_dirs)
            .field("skip_git_repo_check", &self.skip_git_repo_check)
            .field("images", &self.images)
            .field("search", &self.search)
            .field("include_json_events", &self.include_json_events)
            .field("output_schema", &self.output_schema)
            .field("output_last_message", &self.output_last_message)
            .field("color", &self.color)
            .field("resume_session", &self.resume_session)
            .field("resume_last", &self.resume_last)
            .field("resume_all", &self.resume_all)
            .field("inherit_env", &self.inherit_env)
            .field("env_allowlist", &self.env_allowlist)
            .field("env_denylist", &self.env_denylist)
            .field("env", &self.env)
            .field("stderr", &self.stderr.as_ref().map(|_| "<callback>"))
            .field(
                "event_parser",
                &self.event_parser.as_ref().map(|_| "<parser>"),
            )
            .field("event_hooks", &format!("{} kinds", self.event_hooks.len()))
            .field(
                "final_event_predicate",
                &self.final_event_predicate.as_ref().map(|_| "<predicate>"),
            )
            .field("use_app_server", &self.use_app_server)
            .field("dynamic_tools", &self.dynamic_tools)
            .field(
                "approve_command",
                &self.approve_command.as_ref().map(|_| "<callback>"),
            )
            .field(
                "approve_file_change",
                &self.approve_file_change.as_ref().map(|_| "<callback>"),
            )
            .field(
                "approval_callbacks",
                &format!("{} callbacks", self.approval_callbacks.len()),
            )
            .field(
                "request_user_input",
                &self.request_user_input.as_ref().map(|_| "<callback>"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("max_buffer_size", &self.max_buffer_size)
            .field("extra_args", &self.extra_args)
            .finish()
    }
}

/// Builder for `CodexAgentOptions`
#[derive(Debug, Default)]
pub struct CodexAgentOptionsBuilder {
    options: CodexAgentOptions,
}

impl CodexAgentOptionsBuilder {
    /// Set an explicit Codex CLI path
    #[must_use]
    pub fn cli_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cli_path = Some(path.into());
        self
    }

    /// Set the model
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    /// Use a local open-source model
    #[must_use]
    pub const fn oss(mut self, value: bool) -> Self {
        self.options.oss = value;
        self
    }

    /// Set the sandbox mode
    #[must_use]
    pub const fn sandbox(mut self, mode: SandboxMode) -> Self {
        self.options.sandbox = Some(mode);
        self
    }

    /// Set the approval policy
    #[must_use]
    pub const fn ask_for_approval(mut self, policy: ApprovalPolicy) -> Self {
        self.options.ask_for_approval = Some(policy);
        self
    }

    /// Enable the full-auto preset
    #[must_use]
    pub const fn full_auto(mut self, value: bool) -> Self {
        self.options.full_auto = value;
        self
    }

    /// Bypass approvals and sandboxing
    #[must_use]
    pub const fn yolo(mut self, value: bool) -> Self {
        self.options.yolo = value;
        self
    }

    /// Set the configuration profile
    #[must_use]
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.options.profile = Some(profile.into());
        self
    }

    /// Add a `-c key=value` configuration override
    #[must_use]
    pub fn config_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options
            .config_overrides
            .insert(key.into(), value.into());
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(path.into());
        self
    }

    /// Add a writable directory
    #[must_use]
    pub fn add_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.add_dirs.push(path.into());
        self
    }

    /// Skip the git repository safety check
    #[must_use]
    pub const fn skip_git_repo_check(mut self, value: bool) -> Self {
        self.options.skip_git_repo_check = value;
        self
    }

    /// Attach an image to the prompt
    #[must_use]
    pub fn image(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.images.push(path.into());
        self
    }

    /// Enable web search
    #[must_use]
    pub const fn search(mut self, value: bool) -> Self {
        self.options.search = value;
        self
    }

    /// Set the output schema
    #[must_use]
    pub fn output_schema(mut self, schema: OutputSchema) -> Self {
        self.options.output_schema = Some(schema);
        self
    }

    /// Write the last agent message to a file
    #[must_use]
    pub fn output_last_message(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.output_last_message = Some(path.into());
        self
    }

    /// Set the terminal color mode
    #[must_use]
    pub const fn color(mut self, mode: ColorMode) -> Self {
        self.options.color = Some(mode);
        self
    }

    /// Set the session id to resume
    #[must_use]
    pub fn resume_session(mut self, session: impl Into<SessionId>) -> Self {
        self.options.resume_session = Some(session.into());
        self
    }

    /// Control inheritance of the parent environment
    #[must_use]
    pub const fn inherit_env(mut self, value: bool) -> Self {
        self.options.inherit_env = value;
        self
    }

    /// Set an explicit environment variable for the child
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.env.insert(key.into(), value.into());
        self
    }

    /// Set the stderr line callback (pipes the child's stderr)
    #[must_use]
    pub fn stderr(mut self, callback: StderrCallback) -> Self {
        self.options.stderr = Some(callback);
        self
    }

    /// Set a custom event parser
    #[must_use]
    pub fn event_parser(mut self, parser: EventParser) -> Self {
        self.options.event_parser = Some(parser);
        self
    }

    /// Set the event hooks
    #[must_use]
    pub fn event_hooks(mut self, hooks: EventHooks) -> Self {
        self.options.event_hooks = hooks;
        self
    }

    /// Set a custom stopping rule for `receive_response`
    #[must_use]
    pub fn final_event_predicate(mut self, predicate: FinalEventPredicate) -> Self {
        self.options.final_event_predicate = Some(predicate);
        self
    }

    /// Force app-server mode
    #[must_use]
    pub const fn use_app_server(mut self, value: bool) -> Self {
        self.options.use_app_server = value;
        self
    }

    /// Register a dynamic tool (implies app-server mode)
    #[must_use]
    pub fn dynamic_tool(mut self, tool: CodexTool) -> Self {
        self.options.dynamic_tools.push(tool);
        self
    }

    /// Register an approval callback for a kind (`command`, `file_change`)
    #[must_use]
    pub fn approval_callback(
        mut self,
        kind: impl Into<String>,
        callback: ApprovalCallback,
    ) -> Self {
        self.options.approval_callbacks.insert(kind.into(), callback);
        self
    }

    /// Set the user-input callback
    #[must_use]
    pub fn request_user_input(mut self, callback: UserInputCallback) -> Self {
        self.options.request_user_input = Some(callback);
        self
    }

    /// Set the app-server request timeout (`None` disables it)
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.request_timeout = timeout;
        self
    }

    /// Set the maximum JSON message buffer size
    #[must_use]
    pub const fn max_buffer_size(mut self, size: usize) -> Self {
        self.options.max_buffer_size = Some(size);
        self
    }

    /// Pass an extra CLI flag through verbatim
    #[must_use]
    pub fn extra_arg(mut self, flag: impl Into<String>, value: Option<String>) -> Self {
        self.options.extra_args.insert(flag.into(), value);
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> CodexAgentOptions {
        self.options
    }
}
