use crate::{core::log::ChatLog, error::RagError, map_err};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

/// A single line in the turn log.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogEvent {
    /// Unix timestamp in seconds.
    pub time: f64,
    pub user: String,
    pub assistant: String,
}

/// Appends every turn as a JSON object on its own line.
#[derive(Debug, Clone)]
pub struct JsonlChatLog {
    path: PathBuf,
}

impl JsonlChatLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChatLog for JsonlChatLog {
    fn log(&self, user: &str, assistant: &str) -> Result<(), RagError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            map_err!(std::fs::create_dir_all(parent));
        }

        let event = LogEvent {
            time: Utc::now().timestamp_micros() as f64 / 1_000_000.,
            user: user.to_string(),
            assistant: assistant.to_string(),
        };

        let mut line = map_err!(serde_json::to_string(&event));
        line.push('\n');

        let mut file = map_err!(OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path));

        map_err!(file.write_all(line.as_bytes()));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_event_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlChatLog::new(dir.path().join("logs/chat_logs.jsonl"));

        log.log("Hi!", "Hello.").unwrap();
        log.log("Memory cleared", "").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let events = content
            .lines()
            .map(|l| serde_json::from_str::<LogEvent>(l).unwrap())
            .collect::<Vec<_>>();

        assert_eq!(2, events.len());
        assert_eq!("Hi!", events[0].user);
        assert_eq!("Hello.", events[0].assistant);
        assert_eq!("Memory cleared", events[1].user);
        assert!(events[0].time > 0.);
        assert!(events[0].time <= events[1].time);
    }
}
