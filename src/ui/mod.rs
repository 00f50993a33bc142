use std::collections::VecDeque;
use std::io;

/// Synchronous operator channel: present a prompt, block for one line.
///
/// The measurement loop only ever talks to a human through this trait, so
/// tests can drive the whole engine with scripted replies.
pub trait OperatorLink {
    fn request(&mut self, prompt: &str) -> io::Result<String>;
}

/// Console implementation. Blocks indefinitely; empty replies are the
/// common case ("press enter to continue").
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl ConsoleOperator {
    pub fn new() -> Self {
        Self
    }
}

impl OperatorLink for ConsoleOperator {
    fn request(&mut self, prompt: &str) -> io::Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(io::Error::other)
    }
}

/// Canned replies for tests and dry runs; answers with empty strings once
/// the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    replies: VecDeque<String>,
    pub prompts_seen: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            prompts_seen: Vec::new(),
        }
    }
}

impl OperatorLink for ScriptedOperator {
    fn request(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts_seen.push(prompt.to_string());
        Ok(self.replies.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_operator_replays_then_goes_quiet() {
        let mut op = ScriptedOperator::new(["yes", "n"]);
        assert_eq!(op.request("first?").unwrap(), "yes");
        assert_eq!(op.request("second?").unwrap(), "n");
        assert_eq!(op.request("third?").unwrap(), "");
        assert_eq!(op.prompts_seen.len(), 3);
    }
}
