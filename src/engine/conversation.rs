// chatsql Engine — Conversation State
// Ordered, append-only record of the turns of one interactive session, plus
// the transcript rendering both prompts embed.

use crate::atoms::constants::GREETING;
use crate::atoms::types::{Role, Turn};

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// Single-writer history. Turns are never edited or removed; `reset` starts
/// the conversation over.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History seeded with the assistant's opening line.
    pub fn with_greeting() -> Self {
        Self { turns: vec![Turn::assistant(GREETING)] }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns, oldest first.
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn reset(&mut self) {
        *self = Self::with_greeting();
    }
}

/// Render turns as a transcript, one `Role: text` entry per turn, oldest
/// first. With a `window`, only the most recent `window` turns are kept.
pub fn render(turns: &[Turn], window: Option<usize>) -> String {
    let start = window.map(|w| turns.len().saturating_sub(w)).unwrap_or(0);
    turns[start..]
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rough token estimate (~4 chars per token).
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_seeds_history() {
        let h = ConversationHistory::with_greeting();
        assert_eq!(h.snapshot(), &[Turn::assistant("I'm here to help you query your database.")]);
    }

    #[test]
    fn append_preserves_insertion_order() {
        let mut h = ConversationHistory::new();
        for i in 0..5 {
            h.append(Turn::user(format!("q{}", i)));
            h.append(Turn::assistant(format!("a{}", i)));
        }
        assert_eq!(h.len(), 10);
        let texts: Vec<&str> = h.snapshot().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["q0", "a0", "q1", "a1", "q2", "a2", "q3", "a3", "q4", "a4"]);
    }

    #[test]
    fn render_is_oldest_first_and_role_tagged() {
        let turns = vec![
            Turn::assistant("hello"),
            Turn::user("how many phones?"),
            Turn::assistant("12"),
        ];
        assert_eq!(render(&turns, None), "Assistant: hello\nUser: how many phones?\nAssistant: 12");
    }

    #[test]
    fn render_turn_i_before_turn_i_plus_one() {
        let turns: Vec<Turn> = (0..20).map(|i| Turn::user(format!("message-{:02}", i))).collect();
        let text = render(&turns, None);
        for i in 0..19 {
            let a = text.find(&format!("message-{:02}", i)).unwrap();
            let b = text.find(&format!("message-{:02}", i + 1)).unwrap();
            assert!(a < b);
        }
    }

    #[test]
    fn window_keeps_most_recent() {
        let turns = vec![Turn::user("one"), Turn::assistant("two"), Turn::user("three")];
        assert_eq!(render(&turns, Some(2)), "Assistant: two\nUser: three");
        assert_eq!(render(&turns, Some(10)), render(&turns, None));
        assert_eq!(render(&turns, Some(0)), "");
    }

    #[test]
    fn reset_restores_greeting_only() {
        let mut h = ConversationHistory::with_greeting();
        h.append(Turn::user("x"));
        h.reset();
        assert_eq!(h.len(), 1);
        assert_eq!(h.snapshot()[0].role, Role::Assistant);
    }

    #[test]
    fn token_estimate() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens(&"a".repeat(400)), 100);
    }
}
