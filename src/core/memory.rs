use crate::{err, error::RagError, map_err};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use tracing::debug;

const USER_PREFIX: &str = "User: ";
const ASSISTANT_PREFIX: &str = "Assistant: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A single utterance in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Parse a turn in the persisted `Role: content` form.
    /// Returns `None` if the role label is missing.
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(content) = s.strip_prefix(USER_PREFIX) {
            return Some(Self::user(content));
        }
        s.strip_prefix(ASSISTANT_PREFIX).map(Self::assistant)
    }
}

impl std::fmt::Display for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.role {
            Role::User => write!(f, "{USER_PREFIX}{}", self.content),
            Role::Assistant => write!(f, "{ASSISTANT_PREFIX}{}", self.content),
        }
    }
}

/// On disk representation of [ConversationMemory].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub turns: Vec<String>,
}

/// Ordered record of the conversation.
///
/// Grows without bound; use [window][Self::window] to get a bounded view.
/// Persisted as a whole with [save][Self::save].
#[derive(Debug, Default, Clone)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, text: &str) {
        self.turns.push(Turn::user(text));
    }

    pub fn add_assistant(&mut self, text: &str) {
        self.turns.push(Turn::assistant(text));
    }

    /// The last `n` turns in conversation order, or all of them if there are fewer.
    pub fn window(&self, n: usize) -> &[Turn] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Persist the empty state to `path`, then discard all turns.
    /// The turns are kept if the empty state cannot be written.
    pub fn clear(&mut self, path: impl AsRef<Path>) -> Result<(), RagError> {
        Self::default().save(path)?;
        self.turns.clear();
        Ok(())
    }

    /// Write the whole conversation to `path`, replacing previous content.
    ///
    /// The state is written to a sibling temporary file which is then renamed
    /// over `path`, so a failed write never leaves a truncated state behind.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RagError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            map_err!(std::fs::create_dir_all(parent));
        }

        let state = PersistedState {
            turns: self.turns.iter().map(Turn::to_string).collect(),
        };

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");

        let result = write_state(Path::new(&tmp), &state);

        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
            return result;
        }

        map_err!(std::fs::rename(&tmp, path));

        debug!("Saved {} turns to {}", self.turns.len(), path.display());

        Ok(())
    }

    /// Replace the conversation with the one stored at `path`.
    ///
    /// A missing file is a new conversation and yields an empty memory.
    /// Fails with `CorruptState` if the file cannot be parsed.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), RagError> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("No state at {}, starting empty", path.display());
            self.turns.clear();
            return Ok(());
        }

        let file = map_err!(File::open(path));

        let state: PersistedState = match serde_json::from_reader(BufReader::new(file)) {
            Ok(state) => state,
            Err(e) => return err!(CorruptState, "{}: {}", path.display(), e),
        };

        let mut turns = Vec::with_capacity(state.turns.len());
        for (i, turn) in state.turns.iter().enumerate() {
            let Some(turn) = Turn::parse(turn) else {
                return err!(
                    CorruptState,
                    "{}: turn {} has no role label",
                    path.display(),
                    i
                );
            };
            turns.push(turn);
        }

        debug!("Loaded {} turns from {}", turns.len(), path.display());

        self.turns = turns;

        Ok(())
    }
}

/// Write `state` as JSON, flushed and synced to disk.
fn write_state(path: &Path, state: &PersistedState) -> Result<(), RagError> {
    let file = map_err!(File::create(path));
    let mut writer = BufWriter::new(file);
    map_err!(serde_json::to_writer_pretty(&mut writer, state));
    map_err!(writer.flush());
    map_err!(writer.get_ref().sync_all());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagErr;

    fn conversation() -> ConversationMemory {
        let mut memory = ConversationMemory::new();
        memory.add_user("What is the capital of France?");
        memory.add_assistant("Paris.");
        memory.add_user("And of Croatia?");
        memory.add_assistant("Zagreb.");
        memory
    }

    #[test]
    fn window_returns_most_recent_in_order() {
        let memory = conversation();

        assert!(memory.window(0).is_empty());
        assert_eq!(
            &[Turn::user("And of Croatia?"), Turn::assistant("Zagreb.")],
            memory.window(2)
        );
        assert_eq!(memory.turns(), memory.window(4));
        assert_eq!(memory.turns(), memory.window(100));

        for n in 0..8 {
            assert_eq!(n.min(memory.len()), memory.window(n).len());
        }

        // Windowing does not mutate.
        assert_eq!(4, memory.len());
    }

    #[test]
    fn turns_format_with_role_labels() {
        let memory = conversation();
        let formatted = memory.window(2).iter().map(Turn::to_string).collect::<Vec<_>>();

        assert_eq!(vec!["User: And of Croatia?", "Assistant: Zagreb."], formatted);
    }

    #[test]
    fn turn_parse_is_inverse_of_display() {
        for turn in [
            Turn::user(""),
            Turn::user("multi\nline"),
            Turn::assistant("User: nested label"),
            Turn::assistant("Assistant: twice"),
        ] {
            assert_eq!(Some(turn.clone()), Turn::parse(&turn.to_string()));
        }

        assert_eq!(None, Turn::parse("System: nope"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state/conversation_state.json");

        let mut memory = conversation();
        memory.add_user("Ünïcödé 🦀");
        memory.add_assistant("");
        memory.save(&path).unwrap();

        let mut loaded = ConversationMemory::new();
        loaded.load(&path).unwrap();

        assert_eq!(memory.turns(), loaded.turns());
    }

    #[test]
    fn persisted_format_is_list_of_formatted_turns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        conversation().save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(
            serde_json::json!({
                "turns": [
                    "User: What is the capital of France?",
                    "Assistant: Paris.",
                    "User: And of Croatia?",
                    "Assistant: Zagreb."
                ]
            }),
            raw
        );
    }

    #[test]
    fn save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        conversation().save(&path).unwrap();

        let mut memory = ConversationMemory::new();
        memory.add_user("fresh");
        memory.save(&path).unwrap();

        let mut loaded = ConversationMemory::new();
        loaded.load(&path).unwrap();

        assert_eq!(&[Turn::user("fresh")], loaded.turns());
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();

        let mut memory = conversation();
        memory.load(dir.path().join("missing.json")).unwrap();

        assert!(memory.is_empty());
    }

    #[test]
    fn load_without_turns_key_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{}").unwrap();

        let mut memory = conversation();
        memory.load(&path).unwrap();

        assert!(memory.is_empty());
    }

    #[test]
    fn load_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        std::fs::write(&path, "{ \"turns\": [").unwrap();
        let e = ConversationMemory::new().load(&path).unwrap_err();
        assert!(matches!(e.error, RagErr::CorruptState(_)));

        std::fs::write(&path, r#"{ "turns": ["Narrator: hi"] }"#).unwrap();
        let e = ConversationMemory::new().load(&path).unwrap_err();
        assert!(matches!(e.error, RagErr::CorruptState(_)));
    }

    #[test]
    fn clear_persists_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut memory = conversation();
        memory.save(&path).unwrap();
        memory.clear(&path).unwrap();

        assert!(memory.is_empty());

        let mut loaded = conversation();
        loaded.load(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_to_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        // Parent is a regular file, directories cannot be created under it.
        let e = conversation().save(blocker.join("state.json")).unwrap_err();
        assert!(matches!(e.error, RagErr::IO(_)));
    }

    #[test]
    fn failed_clear_keeps_turns() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let mut memory = conversation();
        let len = memory.len();

        let e = memory.clear(blocker.join("state.json")).unwrap_err();

        assert!(matches!(e.error, RagErr::IO(_)));
        assert_eq!(len, memory.len());
    }
}
