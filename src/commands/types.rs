//! Command types for `@spackbot` comment commands.

use std::fmt;

/// A parsed `@spackbot` command from a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `@spackbot hello`
    Hello,

    /// `@spackbot help` (also `commands`)
    Help,

    /// `@spackbot fix style`
    ///
    /// Asks the bot to run the formatter on the pull request branch.
    FixStyle,

    /// `@spackbot run pipeline`
    ///
    /// Triggers a GitLab pipeline for the pull request with pruning enabled.
    RunPipeline,

    /// `@spackbot rebuild everything`
    ///
    /// Like `RunPipeline`, with pruning of untouched and up-to-date specs
    /// turned off.
    RebuildEverything,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Hello,
        Command::Help,
        Command::FixStyle,
        Command::RunPipeline,
        Command::RebuildEverything,
    ];

    /// The words that follow the mention.
    pub fn words(&self) -> &'static str {
        match self {
            Command::Hello => "hello",
            Command::Help => "help",
            Command::FixStyle => "fix style",
            Command::RunPipeline => "run pipeline",
            Command::RebuildEverything => "rebuild everything",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::Hello => "say hello",
            Command::Help => "show this list of commands",
            Command::FixStyle => "fix failing style checks",
            Command::RunPipeline => "run a GitLab pipeline for this pull request",
            Command::RebuildEverything => "run a pipeline that rebuilds all specs",
        }
    }

    /// True for commands that only make sense on a pull request.
    pub fn needs_pull_request(&self) -> bool {
        matches!(
            self,
            Command::FixStyle | Command::RunPipeline | Command::RebuildEverything
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.words())
    }
}

/// Markdown list of every command, addressed to `@{bot_name}`.
pub fn help_text(bot_name: &str) -> String {
    let mut text = String::from("You can interact with me in many ways!\n\n");
    for cmd in Command::ALL {
        text.push_str(&format!(
            "- `@{bot_name} {}`: {}\n",
            cmd.words(),
            cmd.description()
        ));
    }
    text
}
