//! Line based terminal front end.

use crate::{core::chat::ChatOrchestrator, error::RagError, map_err};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

/// A single line of user input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    /// `/quit`
    Quit,
    /// `/clear`
    Clear,
    /// Whitespace only.
    Empty,
    Message(&'a str),
}

impl<'a> Input<'a> {
    pub fn parse(line: &'a str) -> Self {
        match line.trim() {
            "/quit" => Self::Quit,
            "/clear" => Self::Clear,
            "" => Self::Empty,
            message => Self::Message(message),
        }
    }
}

/// Run the chat until `/quit` or the end of `input`.
///
/// Replies and notices are written to `output`. A failed save is printed and
/// the session continues, since memory still holds the exchange.
pub async fn run<R, W>(chat: &mut ChatOrchestrator, input: R, mut output: W) -> Result<(), RagError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    if !chat.memory().is_empty() {
        write(
            &mut output,
            &format!("Restored {} turn(s). Type /clear to start over.\n", chat.memory().len()),
        )
        .await?;
    }

    write(&mut output, "> ").await?;

    while let Some(line) = map_err!(lines.next_line().await) {
        match Input::parse(&line) {
            Input::Quit => break,
            Input::Empty => {}
            Input::Clear => match chat.clear() {
                Ok(()) => write(&mut output, "Memory cleared.\n").await?,
                Err(e) => e.print(),
            },
            Input::Message(message) => match chat.respond(message).await {
                Ok(reply) => write(&mut output, &format!("Assistant: {reply}\n")).await?,
                Err(e) => e.print(),
            },
        }

        write(&mut output, "> ").await?;
    }

    info!("Chat finished after {} turn(s)", chat.transcript().len());

    Ok(())
}

async fn write<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<(), RagError> {
    map_err!(output.write_all(text.as_bytes()).await);
    map_err!(output.flush().await);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::test::ScriptedGenerator,
        config::ChatConfig,
        core::chat::{ChatOrchestrator, ChatSession},
    };
    use std::sync::Arc;

    fn chat(generator: ScriptedGenerator) -> (ChatOrchestrator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let chat = ChatOrchestrator::new(ChatSession {
            generator: Arc::new(generator),
            retrieval: None,
            log: None,
            state_path: dir.path().join("state.json"),
            config: ChatConfig::default(),
        })
        .unwrap();
        (chat, dir)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Input::Quit, Input::parse("/quit"));
        assert_eq!(Input::Clear, Input::parse("  /clear\n"));
        assert_eq!(Input::Empty, Input::parse("   "));
        assert_eq!(Input::Message("hi there"), Input::parse(" hi there "));
    }

    #[tokio::test]
    async fn answers_until_quit() {
        let (mut chat, _dir) = chat(ScriptedGenerator::new([Ok("Hello."), Ok("Unused.")]));
        let mut output = vec![];

        run(&mut chat, &b"Hi\n\n/quit\nStill here?\n"[..], &mut output)
            .await
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!("> Assistant: Hello.\n> > ", output);
        assert_eq!(2, chat.memory().len());
    }

    #[tokio::test]
    async fn clear_command_forgets() {
        let (mut chat, _dir) = chat(ScriptedGenerator::new([Ok("Hello.")]));
        let mut output = vec![];

        run(&mut chat, &b"Hi\n/clear\n"[..], &mut output).await.unwrap();

        assert!(String::from_utf8(output).unwrap().contains("Memory cleared."));
        assert!(chat.memory().is_empty());
    }
}
