//! # Topic Prefix
//!
//! Handlers are selected by the leading segment of the topic, not the full
//! routing key: `build.linux.success` routes like `build`.

use std::fmt;

use crate::constants::TOPIC_DELIMITER;

/// Leading dot-delimited segment of a topic
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPrefix(String);

impl TopicPrefix {
    /// Segment before the first `.`; the whole topic when there is none
    ///
    /// An empty topic yields an empty prefix, which no registry entry can match.
    pub fn of(topic: &str) -> Self {
        let prefix = topic.split(TOPIC_DELIMITER).next().unwrap_or_default();
        Self(prefix.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TopicPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TopicPrefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
