//! Typewriter dialogue with conversation chains and yes/no choices.
//!
//! The sequencer never runs code on completion. Whatever the caller attached
//! to a conversation is handed back by [`DialogueSequencer::advance`] or
//! [`DialogueSequencer::answer`] once the sequencer is already idle, so the
//! caller may immediately start another conversation.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default milliseconds per revealed character.
pub const DEFAULT_REVEAL_INTERVAL_MS: u64 = 30;

/// What the sequencer is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueMode {
    /// Nothing on screen.
    Idle,
    /// The current line is still being revealed.
    PlayingLine,
    /// The current line is fully shown and waits for an advance.
    AwaitingAdvance,
    /// The final line of a choice is shown and waits for yes or no.
    AwaitingBinaryChoice,
}

/// Result of an advance signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance<C> {
    /// Not waiting for an advance; nothing changed.
    Ignored,
    /// Moved on to the next line.
    NextLine,
    /// The conversation ended; carries its completion, if any.
    Finished(Option<C>),
}

#[derive(Debug, Clone)]
enum Pending<C> {
    Nothing,
    OnFinish(C),
    Choice { yes: C, no: C },
}

/// Plays queued lines one character at a time.
#[derive(Debug, Clone)]
pub struct DialogueSequencer<C> {
    reveal_interval_ms: u64,
    mode: DialogueMode,
    lines: Vec<String>,
    cursor: usize,
    /// Characters of the current line revealed so far.
    revealed: usize,
    /// Time accumulated towards the next character.
    carry_ms: u64,
    pending: Pending<C>,
}

impl<C> Default for DialogueSequencer<C> {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_INTERVAL_MS)
    }
}

impl<C> DialogueSequencer<C> {
    /// Create an idle sequencer revealing one character per interval.
    pub fn new(reveal_interval_ms: u64) -> Self {
        Self {
            reveal_interval_ms: reveal_interval_ms.max(1),
            mode: DialogueMode::Idle,
            lines: Vec::new(),
            cursor: 0,
            revealed: 0,
            carry_ms: 0,
            pending: Pending::Nothing,
        }
    }

    pub fn mode(&self) -> DialogueMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.mode != DialogueMode::Idle
    }

    pub fn is_awaiting_choice(&self) -> bool {
        self.mode == DialogueMode::AwaitingBinaryChoice
    }

    /// Full text of the line on screen.
    pub fn current_text(&self) -> Option<&str> {
        if self.is_active() {
            self.lines.get(self.cursor).map(String::as_str)
        } else {
            None
        }
    }

    /// The revealed part of the line on screen.
    pub fn visible_text(&self) -> String {
        self.current_text()
            .map(|line| line.chars().take(self.revealed).collect())
            .unwrap_or_default()
    }

    /// Show a single line with no completion.
    pub fn show(&mut self, text: impl Into<String>) -> bool {
        self.start(vec![text.into()], Pending::Nothing)
    }

    /// Play `lines` back to back, returning `completion` when the last ends.
    ///
    /// Rejected unless idle. An empty conversation is rejected too.
    pub fn show_conversation<I, S>(&mut self, lines: I, completion: Option<C>) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pending = match completion {
            Some(c) => Pending::OnFinish(c),
            None => Pending::Nothing,
        };
        self.start(lines.into_iter().map(Into::into).collect(), pending)
    }

    /// Play `lines` whose last line is a yes/no prompt.
    ///
    /// Once the prompt is fully revealed the sequencer waits in
    /// [`DialogueMode::AwaitingBinaryChoice`] until [`answer`](Self::answer).
    pub fn show_choice<I, S>(&mut self, lines: I, yes: C, no: C) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.start(
            lines.into_iter().map(Into::into).collect(),
            Pending::Choice { yes, no },
        )
    }

    /// Feed elapsed time into the reveal.
    pub fn update(&mut self, elapsed_ms: u64) {
        if self.mode != DialogueMode::PlayingLine {
            return;
        }
        self.carry_ms = self.carry_ms.saturating_add(elapsed_ms);
        let steps = (self.carry_ms / self.reveal_interval_ms) as usize;
        self.carry_ms %= self.reveal_interval_ms;
        self.revealed = self.revealed.saturating_add(steps).min(self.line_len());
        if self.revealed >= self.line_len() {
            self.finish_reveal();
        }
    }

    /// Reveal the rest of the current line without advancing.
    pub fn skip(&mut self) -> bool {
        if self.mode != DialogueMode::PlayingLine {
            return false;
        }
        self.revealed = self.line_len();
        self.finish_reveal();
        true
    }

    /// Move past a fully revealed line.
    pub fn advance(&mut self) -> Advance<C> {
        if self.mode != DialogueMode::AwaitingAdvance {
            debug!(mode = ?self.mode, "advance ignored");
            return Advance::Ignored;
        }
        if self.cursor + 1 < self.lines.len() {
            self.cursor += 1;
            self.begin_line();
            return Advance::NextLine;
        }
        let completion = match self.finish() {
            Pending::OnFinish(c) => Some(c),
            // A choice always ends in AwaitingBinaryChoice, never here.
            Pending::Choice { .. } | Pending::Nothing => None,
        };
        Advance::Finished(completion)
    }

    /// Answer the pending yes/no prompt.
    pub fn answer(&mut self, yes: bool) -> Option<C> {
        if self.mode != DialogueMode::AwaitingBinaryChoice {
            debug!(mode = ?self.mode, "answer ignored");
            return None;
        }
        match self.finish() {
            Pending::Choice { yes: on_yes, no: on_no } => Some(if yes { on_yes } else { on_no }),
            _ => None,
        }
    }

    /// Clear the screen without returning any completion.
    pub fn dismiss(&mut self) {
        if self.is_active() {
            debug!("dialogue dismissed");
        }
        self.finish();
    }

    fn start(&mut self, lines: Vec<String>, pending: Pending<C>) -> bool {
        if self.is_active() {
            debug!(mode = ?self.mode, "dialogue busy; rejecting new lines");
            return false;
        }
        if lines.is_empty() {
            debug!("refusing to play an empty conversation");
            return false;
        }
        self.lines = lines;
        self.cursor = 0;
        self.pending = pending;
        self.begin_line();
        true
    }

    fn begin_line(&mut self) {
        self.mode = DialogueMode::PlayingLine;
        self.revealed = 0;
        self.carry_ms = 0;
        if self.line_len() == 0 {
            self.finish_reveal();
        }
    }

    fn finish_reveal(&mut self) {
        let on_last_line = self.cursor + 1 >= self.lines.len();
        self.mode = match self.pending {
            Pending::Choice { .. } if on_last_line => DialogueMode::AwaitingBinaryChoice,
            _ => DialogueMode::AwaitingAdvance,
        };
    }

    fn finish(&mut self) -> Pending<C> {
        self.mode = DialogueMode::Idle;
        self.lines.clear();
        self.cursor = 0;
        self.revealed = 0;
        self.carry_ms = 0;
        std::mem::replace(&mut self.pending, Pending::Nothing)
    }

    fn line_len(&self) -> usize {
        self.lines
            .get(self.cursor)
            .map(|line| line.chars().count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reveal_all<C>(dialogue: &mut DialogueSequencer<C>) {
        dialogue.update(60_000);
    }

    #[test]
    fn test_show_reveals_per_interval() {
        let mut dialogue: DialogueSequencer<()> = DialogueSequencer::new(30);
        assert!(dialogue.show("Empty."));
        assert_eq!(dialogue.mode(), DialogueMode::PlayingLine);
        assert_eq!(dialogue.visible_text(), "");

        dialogue.update(29);
        assert_eq!(dialogue.visible_text(), "");
        dialogue.update(1);
        assert_eq!(dialogue.visible_text(), "E");
        dialogue.update(90);
        assert_eq!(dialogue.visible_text(), "Empt");

        dialogue.update(60);
        assert_eq!(dialogue.visible_text(), "Empty.");
        assert_eq!(dialogue.mode(), DialogueMode::AwaitingAdvance);
    }

    #[test]
    fn test_huge_elapsed_finishes_line() {
        let mut dialogue: DialogueSequencer<()> = DialogueSequencer::new(1);
        dialogue.show("Hello");
        dialogue.update(3);
        dialogue.update(u64::MAX);
        assert_eq!(dialogue.mode(), DialogueMode::AwaitingAdvance);
        assert_eq!(dialogue.visible_text(), "Hello");
    }

    #[test]
    fn test_reveal_counts_characters() {
        let mut dialogue: DialogueSequencer<()> = DialogueSequencer::new(10);
        dialogue.show("🌹ab");
        dialogue.update(10);
        assert_eq!(dialogue.visible_text(), "🌹");
        dialogue.update(20);
        assert_eq!(dialogue.mode(), DialogueMode::AwaitingAdvance);
    }

    #[test]
    fn test_conversation_completion_fires_once() {
        let mut dialogue = DialogueSequencer::new(30);
        assert!(dialogue.show_conversation(["A", "B"], Some("done")));

        reveal_all(&mut dialogue);
        assert_eq!(dialogue.advance(), Advance::NextLine);
        assert_eq!(dialogue.current_text(), Some("B"));

        reveal_all(&mut dialogue);
        assert_eq!(dialogue.advance(), Advance::Finished(Some("done")));
        assert!(!dialogue.is_active());
        assert_eq!(dialogue.advance(), Advance::Ignored);
    }

    #[test]
    fn test_completion_can_start_another_conversation() {
        let mut dialogue = DialogueSequencer::new(30);
        dialogue.show_conversation(["first"], Some(1));
        reveal_all(&mut dialogue);

        let Advance::Finished(Some(next)) = dialogue.advance() else {
            panic!("conversation should have finished");
        };
        assert_eq!(next, 1);
        assert!(dialogue.show_conversation(["second"], Some(2)));
        assert_eq!(dialogue.current_text(), Some("second"));
    }

    #[test]
    fn test_rejects_while_active() {
        let mut dialogue = DialogueSequencer::new(30);
        dialogue.show_conversation(["A", "B"], Some("first"));

        assert!(!dialogue.show("intruder"));
        assert!(!dialogue.show_conversation(["X"], Some("second")));

        reveal_all(&mut dialogue);
        dialogue.advance();
        assert_eq!(dialogue.current_text(), Some("B"));
        reveal_all(&mut dialogue);
        assert_eq!(dialogue.advance(), Advance::Finished(Some("first")));
    }

    #[test]
    fn test_rejects_empty_conversation() {
        let mut dialogue: DialogueSequencer<()> = DialogueSequencer::new(30);
        assert!(!dialogue.show_conversation(Vec::<String>::new(), None));
        assert!(!dialogue.is_active());
    }

    #[test]
    fn test_advance_ignored_while_playing() {
        let mut dialogue: DialogueSequencer<()> = DialogueSequencer::new(30);
        dialogue.show_conversation(["Hello there", "Bye"], None);

        assert_eq!(dialogue.advance(), Advance::Ignored);
        assert!(dialogue.skip());
        assert_eq!(dialogue.visible_text(), "Hello there");
        assert_eq!(dialogue.current_text(), Some("Hello there"));
        assert!(!dialogue.skip());
    }

    #[test]
    fn test_single_show_finishes_without_completion() {
        let mut dialogue: DialogueSequencer<u8> = DialogueSequencer::new(30);
        dialogue.show("Villager 2: The water is calm today.");
        dialogue.skip();
        assert_eq!(dialogue.advance(), Advance::Finished(None));
    }

    #[test]
    fn test_choice_waits_for_answer() {
        let mut dialogue = DialogueSequencer::new(30);
        dialogue.show_choice(["(Should I eat them?)", "Press Y for Yes, N for No"], "eat", "leave");

        reveal_all(&mut dialogue);
        assert_eq!(dialogue.mode(), DialogueMode::AwaitingAdvance);
        assert_eq!(dialogue.answer(true), None);

        dialogue.advance();
        reveal_all(&mut dialogue);
        assert!(dialogue.is_awaiting_choice());
        assert_eq!(dialogue.advance(), Advance::Ignored);

        assert_eq!(dialogue.answer(false), Some("leave"));
        assert!(!dialogue.is_active());
        assert_eq!(dialogue.answer(true), None);
    }

    #[test]
    fn test_choice_mode_ignores_prompt_text() {
        let mut dialogue = DialogueSequencer::new(30);
        dialogue.show_conversation(["Press Y for Yes, N for No"], Some("plain"));
        reveal_all(&mut dialogue);
        assert_eq!(dialogue.mode(), DialogueMode::AwaitingAdvance);
        assert_eq!(dialogue.answer(true), None);
    }

    #[test]
    fn test_dismiss_drops_completion() {
        let mut dialogue = DialogueSequencer::new(30);
        dialogue.show_conversation(["(I take a bite...)"], Some("never"));
        dialogue.dismiss();

        assert!(!dialogue.is_active());
        assert_eq!(dialogue.current_text(), None);
        assert!(dialogue.show("(The world is spinning...)"));
    }

    #[test]
    fn test_empty_line_is_immediately_revealed() {
        let mut dialogue: DialogueSequencer<()> = DialogueSequencer::new(30);
        dialogue.show("");
        assert_eq!(dialogue.mode(), DialogueMode::AwaitingAdvance);
    }
}
