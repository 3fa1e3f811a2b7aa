//! In-process chat history.
//!
//! Turns are appended in submission order and never edited or removed.
//! Display order is newest first. History lives as long as the session and
//! is not persisted.

use std::fmt::Write;

use crate::models::ChatTurn;

#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn record(&mut self, turn: ChatTurn) {
        self.history.push(turn);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Turns in display order, most recent first.
    pub fn transcript(&self) -> impl Iterator<Item = &ChatTurn> {
        self.history.iter().rev()
    }

    /// The most recent turn.
    pub fn latest(&self) -> Option<&ChatTurn> {
        self.history.last()
    }

    /// Render the whole transcript, most recent first.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for turn in self.transcript() {
            out.push_str(&render_turn(turn));
        }
        out
    }
}

/// Render one turn: question, answer, citations when present, separator.
pub fn render_turn(turn: &ChatTurn) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "You: {}", turn.question);
    let _ = writeln!(out, "Agent: {}", turn.answer);
    if !turn.sources.is_empty() {
        let _ = writeln!(out, "Citations: {}", turn.sources.join(", "));
    }
    out.push_str("---\n");
    out
}
