//! Prompt layout shared by the plain and retrieval augmented chats.
//!
//! ```text
//! System prompt: <system prompt>
//!
//! Use ONLY the information below to answer.   -+
//! Context:                                     | only with retrieved context
//! <doc 1>                                      |
//! <doc n>                                      |
//!                                             -+
//! User: <older message>                       -+ only with history
//! Assistant: <older reply>                    -+
//! User: <message>
//! Assistant:
//! ```
//!
//! The trailing `Assistant:` marker is where the backend continues and is what
//! [extract_reply] looks for in the generated text.

use std::fmt::Write;

/// Marker preceding the assistant's reply in prompts and generated text.
pub const ASSISTANT_MARKER: &str = "Assistant:";
/// Marker preceding the user's message in prompts.
pub const USER_MARKER: &str = "User:";

const CONTEXT_INSTRUCTION: &str = "Use ONLY the information below to answer.";

/// Builds model facing prompts around a fixed system instruction.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_prompt: String,
}

impl PromptAssembler {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Compose the prompt for the next assistant turn.
    ///
    /// * `history`: Formatted previous turns, oldest first. Omitted if blank.
    /// * `context`: Retrieved documents, most relevant first. Omitted if absent or empty.
    /// * `user_message`: The message to answer.
    pub fn build<S: AsRef<str>>(
        &self,
        history: &[S],
        context: Option<&[String]>,
        user_message: &str,
    ) -> String {
        let mut prompt = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(prompt, "System prompt: {}", self.system_prompt);

        if let Some(context) = context.filter(|c| !c.is_empty()) {
            let _ = write!(
                prompt,
                "\n{CONTEXT_INSTRUCTION}\nContext:\n{}\n\n",
                context.join("\n")
            );
        }

        let history = history
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");

        if !history.trim().is_empty() {
            let _ = writeln!(prompt, "{history}");
        }

        let _ = write!(prompt, "{USER_MARKER} {user_message}\n{ASSISTANT_MARKER}");

        prompt
    }
}

/// Extract the reply from generated text.
///
/// Backends usually echo the prompt before the continuation, and the history in
/// the prompt holds earlier markers, so the text after the **last** `marker` is
/// the reply. Without a marker the whole text is returned. Both are trimmed.
pub fn extract_reply<'a>(generated: &'a str, marker: &str) -> &'a str {
    match generated.rfind(marker) {
        Some(i) => generated[i + marker.len()..].trim(),
        None => generated.trim(),
    }
}
