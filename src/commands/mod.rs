//! Command parsing for bot commands.
//!
//! Users talk to the bot by mentioning it in a pull request comment.
//!
//! # Supported Commands
//!
//! - `@{bot_name} hello` - Says hello back
//! - `@{bot_name} help` - Lists the commands
//! - `@{bot_name} fix style` - Asks the bot to fix failing style checks
//! - `@{bot_name} run pipeline` - Triggers a GitLab pipeline for the pull request
//! - `@{bot_name} rebuild everything` - Triggers a pipeline without pruning
//!
//! # Example
//!
//! ```
//! use spackbot::commands::{Command, parse_command};
//!
//! let comment = "Thanks for the review!\n\n@spackbot run pipeline";
//! assert_eq!(parse_command(comment, "spackbot"), Some(Command::RunPipeline));
//!
//! // Works with different bot names
//! let comment = "@my-bot hello";
//! assert_eq!(parse_command(comment, "my-bot"), Some(Command::Hello));
//! ```

mod parser;
mod types;

pub use parser::parse_command;
pub use types::{Command, help_text};
