//! CLI command building for the subprocess transport

use tokio::process::Command;

use crate::types::options::{CodexAgentOptions, OutputSchema};

use super::config::{PromptSpec, TransportMode};

/// Command builder for the Codex CLI
pub struct CommandBuilder<'a> {
    cli_path: &'a std::path::Path,
    mode: &'a TransportMode,
    options: &'a CodexAgentOptions,
}

impl<'a> CommandBuilder<'a> {
    /// Create a new command builder
    pub fn new(
        cli_path: &'a std::path::Path,
        mode: &'a TransportMode,
        options: &'a CodexAgentOptions,
    ) -> Self {
        Self {
            cli_path,
            mode,
            options,
        }
    }

    /// Build the complete CLI command with all arguments
    pub fn build(&self) -> Command {
        let mut cmd = Command::new(self.cli_path);

        let prompt = match self.mode {
            TransportMode::AppServer => {
                // App-server runs are configured per-thread over the wire,
                // not through CLI flags.
                cmd.arg("app-server");
                return cmd;
            }
            TransportMode::Exec(prompt) => prompt,
        };

        cmd.arg("exec");

        if self.options.resume_session.is_some()
            || self.options.resume_last
            || self.options.resume_all
        {
            cmd.arg("resume");
            if let Some(ref session) = self.options.resume_session {
                cmd.arg(session.as_str());
            }
        }

        // Global flags come after the subcommand
        if self.options.include_json_events {
            cmd.arg("--json");
        }

        for image in &self.options.images {
            cmd.arg("--image").arg(image);
        }

        if let Some(ref model) = self.options.model {
            cmd.arg("--model").arg(model);
        }

        if self.options.oss {
            cmd.arg("--oss");
        }

        if let Some(sandbox) = self.options.sandbox {
            cmd.arg("--sandbox").arg(sandbox.as_str());
        }

        if let Some(policy) = self.options.ask_for_approval {
            // JSON-encoded so the CLI config parser sees a quoted string
            cmd.arg("--config")
                .arg(format!("approval_policy={:?}", policy.as_str()));
        }

        if self.options.full_auto {
            cmd.arg("--full-auto");
        }

        if self.options.yolo {
            cmd.arg("--dangerously-bypass-approvals-and-sandbox");
        }

        if let Some(ref profile) = self.options.profile {
            cmd.arg("--profile").arg(profile);
        }

        if let Some(ref cwd) = self.options.cwd {
            cmd.arg("--cd").arg(cwd);
        }

        if self.options.search {
            cmd.arg("--config").arg("features.web_search=true");
        }

        if self.options.skip_git_repo_check {
            cmd.arg("--skip-git-repo-check");
        }

        for directory in &self.options.add_dirs {
            cmd.arg("--add-dir").arg(directory);
        }

        if let Some(OutputSchema::Path(ref path)) = self.options.output_schema {
            cmd.arg("--output-schema").arg(path);
        }

        if let Some(color) = self.options.color {
            cmd.arg("--color").arg(color.as_str());
        }

        if let Some(ref path) = self.options.output_last_message {
            cmd.arg("--output-last-message").arg(path);
        }

        self.add_config_args(&mut cmd);
        self.add_extra_args(&mut cmd);

        match prompt {
            PromptSpec::Stdin => {
                cmd.arg("-");
            }
            PromptSpec::Text(text) => {
                cmd.arg(text);
            }
        }

        cmd
    }

    /// Add `--config` overrides
    fn add_config_args(&self, cmd: &mut Command) {
        for kv in &self.options.config_kv {
            cmd.arg("--config").arg(kv);
        }

        for (key, value) in &self.options.config_overrides {
            let encoded = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            cmd.arg("--config").arg(format!("{key}={encoded}"));
        }
    }

    /// Add passthrough flags
    fn add_extra_args(&self, cmd: &mut Command) {
        for (flag, value) in &self.options.extra_args {
            if let Some(v) = value {
                cmd.arg(format!("--{flag}")).arg(v);
            } else {
                cmd.arg(format!("--{flag}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::types::approvals::{ApprovalPolicy, SandboxMode};
    use crate::types::options::CodexAgentOptions;

    use super::*;

    fn argv(mode: &TransportMode, options: &CodexAgentOptions) -> Vec<String> {
        let cli = std::path::Path::new("/usr/bin/codex");
        let cmd = CommandBuilder::new(cli, mode, options).build();
        cmd.as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    fn exec_text(prompt: &str) -> TransportMode {
        TransportMode::Exec(PromptSpec::Text(prompt.to_string()))
    }

    #[test]
    fn minimal_exec_command() {
        let args = argv(&exec_text("hello"), &CodexAgentOptions::default());
        assert_eq!(args, vec!["exec", "--json", "hello"]);
    }

    #[test]
    fn app_server_takes_no_flags() {
        let options = CodexAgentOptions::builder().model("gpt-5").build();
        let args = argv(&TransportMode::AppServer, &options);
        assert_eq!(args, vec!["app-server"]);
    }

    #[test]
    fn stdin_prompt_ends_with_dash() {
        let args = argv(
            &TransportMode::Exec(PromptSpec::Stdin),
            &CodexAgentOptions::default(),
        );
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn resume_inserts_the_subcommand_and_session() {
        let options = CodexAgentOptions::builder().resume_session("t_1").build();
        let args = argv(&exec_text("go on"), &options);
        assert_eq!(&args[..3], &["exec", "resume", "t_1"]);

        let mut options = CodexAgentOptions::default();
        options.resume_last = true;
        let args = argv(&exec_text("go on"), &options);
        assert_eq!(&args[..2], &["exec", "resume"]);
        assert_eq!(args[2], "--json");
    }

    #[test]
    fn approval_policy_value_is_json_quoted() {
        let options = CodexAgentOptions::builder()
            .ask_for_approval(ApprovalPolicy::Never)
            .build();
        let args = argv(&exec_text("x"), &options);
        let position = args
            .iter()
            .position(|a| a == "approval_policy=\"never\"")
            .unwrap();
        assert_eq!(args[position - 1], "--config");
    }

    #[test]
    fn common_flags_are_emitted_with_values() {
        let options = CodexAgentOptions::builder()
            .model("gpt-5")
            .sandbox(SandboxMode::ReadOnly)
            .full_auto(true)
            .cwd("/work")
            .search(true)
            .skip_git_repo_check(true)
            .add_dir("/extra")
            .build();
        let args = argv(&exec_text("x"), &options);

        let pair = |flag: &str| {
            let position = args.iter().position(|a| a == flag).unwrap();
            args[position + 1].clone()
        };
        assert_eq!(pair("--model"), "gpt-5");
        assert_eq!(pair("--sandbox"), "read-only");
        assert_eq!(pair("--cd"), "/work");
        assert_eq!(pair("--add-dir"), "/extra");
        assert!(args.contains(&"--full-auto".to_string()));
        assert!(args.contains(&"--skip-git-repo-check".to_string()));
        assert!(args.contains(&"features.web_search=true".to_string()));
    }

    #[test]
    fn config_overrides_keep_strings_raw() {
        let options = CodexAgentOptions::builder()
            .config_override("model_provider", json!("ollama"))
            .build();
        let args = argv(&exec_text("x"), &options);
        assert!(args.contains(&"model_provider=ollama".to_string()));

        let options = CodexAgentOptions::builder()
            .config_override("features.shell", json!(true))
            .build();
        let args = argv(&exec_text("x"), &options);
        assert!(args.contains(&"features.shell=true".to_string()));
    }

    #[test]
    fn extra_args_pass_through() {
        let options = CodexAgentOptions::builder()
            .extra_arg("verbose", None)
            .build();
        let args = argv(&exec_text("x"), &options);
        assert!(args.contains(&"--verbose".to_string()));

        let options = CodexAgentOptions::builder()
            .extra_arg("log-level", Some("debug".to_string()))
            .build();
        let args = argv(&exec_text("x"), &options);
        let position = args.iter().position(|a| a == "--log-level").unwrap();
        assert_eq!(args[position + 1], "debug");
    }
}
