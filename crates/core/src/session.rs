//! The practice session sequencer.
//!
//! A pure state machine over the content catalog and the progress record.
//! Every user intent and every gateway completion is an explicit method call;
//! each call mutates the session context in place and returns the side-effect
//! commands it caused. The runtime must invoke [`Sequencer::react`] after
//! applying any event so the one self-triggering transition (entering
//! `WaitingForPeer` during roleplay) fires without being tied to rendering.

use crate::Command;
use crate::analysis::AnalysisResult;
use crate::catalog::{Catalog, Dialogue, DialogueTurn, Speaker, VocabItem};
use crate::progress::ProgressState;
use tracing::info;

/// Which kind of content the learner is drilling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeMode {
    Sentence,
    Word,
}

/// The two sub-phases of dialogue practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    /// Read-and-repeat over every turn, regardless of role.
    Learning,
    /// The learner plays one role; the system speaks the other role's lines.
    Roleplay,
}

/// The activity the session is currently engaged in.
///
/// `Recording`, `Analyzing` and `WaitingForPeer` each represent exactly one
/// outstanding external operation, which is how the session keeps a single
/// gateway call in flight without any locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    Idle,
    Recording,
    Analyzing,
    Result,
    WaitingForPeer,
}

/// The transient position within the catalog. Never persisted.
#[derive(Debug, Clone)]
pub struct SessionCursor {
    pub mode: PracticeMode,
    pub phase: DialoguePhase,
    pub dialogue_index: usize,
    pub turn_index: usize,
    pub word_index: usize,
    pub user_role: Speaker,
    pub activity: ActivityState,
    pub last_analysis: Option<AnalysisResult>,
}

impl Default for SessionCursor {
    fn default() -> Self {
        Self {
            mode: PracticeMode::Sentence,
            phase: DialoguePhase::Learning,
            dialogue_index: 0,
            turn_index: 0,
            word_index: 0,
            user_role: Speaker::B,
            activity: ActivityState::Idle,
            last_analysis: None,
        }
    }
}

/// The session sequencer: catalog, progress record and cursor in one context
/// object, so transitions are deterministic and unit-testable without any UI.
#[derive(Debug)]
pub struct Sequencer {
    catalog: Catalog,
    progress: ProgressState,
    cursor: SessionCursor,
}

impl Sequencer {
    /// Creates a sequencer positioned at the first incomplete item.
    ///
    /// The dialogue scan resumes at the first dialogue with *either* phase
    /// still open, so a dialogue whose learning is done but whose roleplay is
    /// not will be revisited before later dialogues.
    pub fn new(catalog: Catalog, progress: ProgressState) -> Self {
        let mut sequencer = Self {
            catalog,
            progress,
            cursor: SessionCursor::default(),
        };
        sequencer.rescan_resume_position();
        sequencer
    }

    fn rescan_resume_position(&mut self) {
        self.cursor.dialogue_index = self
            .catalog
            .dialogues
            .iter()
            .position(|d| {
                !self.progress.is_learning_completed(d.id)
                    || !self.progress.is_roleplay_completed(d.id)
            })
            .unwrap_or(0);
        self.cursor.word_index = self
            .catalog
            .words
            .iter()
            .position(|w| !self.progress.is_word_completed(w.id))
            .unwrap_or(0);
    }

    // --- Read access for the presentation layer ---

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn cursor(&self) -> &SessionCursor {
        &self.cursor
    }

    pub fn current_dialogue(&self) -> Option<&Dialogue> {
        self.catalog.dialogue(self.cursor.dialogue_index)
    }

    pub fn current_turn(&self) -> Option<&DialogueTurn> {
        self.current_dialogue()
            .and_then(|d| d.turns.get(self.cursor.turn_index))
    }

    pub fn current_word(&self) -> Option<&VocabItem> {
        self.catalog.word(self.cursor.word_index)
    }

    /// The target-language text of the item under the cursor, if any.
    pub fn current_text(&self) -> Option<&str> {
        match self.cursor.mode {
            PracticeMode::Sentence => self.current_turn().map(|t| t.text_target.as_str()),
            PracticeMode::Word => self.current_word().map(|w| w.text_target.as_str()),
        }
    }

    /// True when the cursor has moved past the end of the active content list.
    pub fn is_exhausted(&self) -> bool {
        match self.cursor.mode {
            PracticeMode::Sentence => self.cursor.dialogue_index >= self.catalog.dialogues.len(),
            PracticeMode::Word => self.cursor.word_index >= self.catalog.words.len(),
        }
    }

    /// Whether the UI should offer advancing past the current scored result.
    ///
    /// This is an affordance, not a hard block: [`advance`](Self::advance)
    /// itself never checks the score.
    pub fn can_advance(&self) -> bool {
        self.cursor.activity == ActivityState::Result
            && self
                .cursor
                .last_analysis
                .as_ref()
                .is_some_and(|a| a.passes(self.progress.target_accuracy))
    }

    /// True when showing the "roleplay complete" marker: a result state with
    /// no scored analysis attached.
    pub fn roleplay_just_completed(&self) -> bool {
        self.cursor.activity == ActivityState::Result && self.cursor.last_analysis.is_none()
    }

    // --- Transitions ---

    /// Plays the reference audio for the current item. No state change; the
    /// speak call is fire-and-forget from the state machine's point of view.
    pub fn play(&self) -> Vec<Command> {
        match self.current_text() {
            Some(text) => vec![Command::Speak(text.to_string())],
            None => Vec::new(),
        }
    }

    /// Enters `Recording`. Valid from `Idle` and from a scored `Result` (the
    /// "retry" path). The unscored roleplay-complete marker is refused: only
    /// the final turn would be re-scored, and advancing past it would earn
    /// the completion bonus again. The caller must have already acquired the
    /// capture device; a denied microphone never reaches the sequencer.
    pub fn begin_recording(&mut self) -> Vec<Command> {
        let can_record = match self.cursor.activity {
            ActivityState::Idle => true,
            ActivityState::Result => self.cursor.last_analysis.is_some(),
            _ => false,
        };
        if can_record {
            self.cursor.activity = ActivityState::Recording;
        }
        Vec::new()
    }

    /// Alias for the `Result --retry--> Recording` transition.
    pub fn retry(&mut self) -> Vec<Command> {
        self.begin_recording()
    }

    /// Finalizes the capture and requests scoring. An empty sample still goes
    /// to the gateway, which is responsible for the degenerate score.
    pub fn finish_recording(&mut self) -> Vec<Command> {
        if self.cursor.activity != ActivityState::Recording {
            return Vec::new();
        }
        self.cursor.activity = ActivityState::Analyzing;
        let reference_text = self.current_text().unwrap_or_default().to_string();
        vec![Command::Analyze { reference_text }]
    }

    /// Stores the scoring outcome. Gateway failures arrive here too, as the
    /// synthesized zero-score result; `Result` is always reachable.
    pub fn analysis_complete(&mut self, result: AnalysisResult) -> Vec<Command> {
        if self.cursor.activity != ActivityState::Analyzing {
            return Vec::new();
        }
        self.cursor.activity = ActivityState::Result;
        self.cursor.last_analysis = Some(result);
        Vec::new()
    }

    /// Moves to the next item after a result, applying the completion and
    /// daily-count rules for the active mode and phase.
    pub fn advance(&mut self) -> Vec<Command> {
        if self.cursor.activity != ActivityState::Result {
            return Vec::new();
        }
        // The unscored roleplay-complete marker has nothing to advance past;
        // leaving it goes through a phase or library change instead.
        if self.cursor.last_analysis.is_none() {
            return Vec::new();
        }
        self.cursor.last_analysis = None;
        self.cursor.activity = ActivityState::Idle;

        match self.cursor.mode {
            PracticeMode::Word => self.advance_word(),
            PracticeMode::Sentence => match self.cursor.phase {
                DialoguePhase::Learning => self.advance_learning_turn(),
                DialoguePhase::Roleplay => self.advance_roleplay_turn(),
            },
        }
    }

    fn advance_word(&mut self) -> Vec<Command> {
        let Some(word) = self.current_word() else {
            return Vec::new();
        };
        let word_id = word.id;
        let newly_completed = self.progress.complete_word(word_id);

        let current = self.cursor.word_index;
        self.cursor.word_index = self
            .catalog
            .words
            .iter()
            .enumerate()
            .position(|(idx, w)| idx > current && !self.progress.is_word_completed(w.id))
            .unwrap_or(self.catalog.words.len());

        if newly_completed {
            vec![Command::PersistProgress]
        } else {
            Vec::new()
        }
    }

    fn advance_learning_turn(&mut self) -> Vec<Command> {
        let Some(dialogue) = self.current_dialogue() else {
            return Vec::new();
        };
        let dialogue_id = dialogue.id;
        let turn_count = dialogue.turns.len();
        let Some(turn) = self.current_turn() else {
            return Vec::new();
        };
        let turn_id = turn.id;

        let mut dirty = self.progress.complete_turn(turn_id);

        if self.cursor.turn_index + 1 < turn_count {
            self.cursor.turn_index += 1;
        } else {
            if !self.progress.is_learning_completed(dialogue_id) {
                self.progress.complete_dialogue_learning(dialogue_id);
                dirty = true;
            }
            info!(dialogue_id, "Learning phase complete, switching to roleplay");
            self.cursor.phase = DialoguePhase::Roleplay;
            self.cursor.turn_index = 0;
        }

        if dirty {
            vec![Command::PersistProgress]
        } else {
            Vec::new()
        }
    }

    fn advance_roleplay_turn(&mut self) -> Vec<Command> {
        let Some(dialogue) = self.current_dialogue() else {
            return Vec::new();
        };
        if self.cursor.turn_index + 1 < dialogue.turns.len() {
            self.cursor.turn_index += 1;
            Vec::new()
        } else {
            self.finish_roleplay()
        }
    }

    /// Completes the roleplay phase: idempotent id recording, a +5 daily bonus
    /// on every completion, and the unscored "phase complete" result marker.
    fn finish_roleplay(&mut self) -> Vec<Command> {
        let Some(dialogue) = self.current_dialogue() else {
            return Vec::new();
        };
        let dialogue_id = dialogue.id;
        self.progress.complete_roleplay(dialogue_id);
        info!(dialogue_id, "Roleplay phase complete");
        self.cursor.activity = ActivityState::Result;
        self.cursor.last_analysis = None;
        vec![Command::PersistProgress]
    }

    /// Reports that the peer's spoken line (plus the fixed pause after it)
    /// finished playing.
    pub fn peer_line_finished(&mut self) -> Vec<Command> {
        if self.cursor.activity != ActivityState::WaitingForPeer {
            return Vec::new();
        }
        let Some(dialogue) = self.current_dialogue() else {
            return Vec::new();
        };
        if self.cursor.turn_index + 1 < dialogue.turns.len() {
            self.cursor.turn_index += 1;
            self.cursor.activity = ActivityState::Idle;
            Vec::new()
        } else {
            self.finish_roleplay()
        }
    }

    /// The single self-triggering transition: when idle on a roleplay turn
    /// that belongs to the other role, start speaking it and wait.
    ///
    /// Must be called after every applied event. It only fires from `Idle`,
    /// so it cannot re-trigger while a line is already being spoken.
    pub fn react(&mut self) -> Vec<Command> {
        if self.cursor.activity != ActivityState::Idle
            || self.cursor.mode != PracticeMode::Sentence
            || self.cursor.phase != DialoguePhase::Roleplay
        {
            return Vec::new();
        }
        let Some(turn) = self.current_turn() else {
            return Vec::new();
        };
        if turn.speaker == self.cursor.user_role {
            return Vec::new();
        }
        let text = turn.text_target.clone();
        self.cursor.activity = ActivityState::WaitingForPeer;
        vec![Command::SpeakPeerLine(text)]
    }

    // --- Explicit user-initiated mode and selection changes ---

    pub fn set_mode(&mut self, mode: PracticeMode) -> Vec<Command> {
        self.cursor.mode = mode;
        self.cursor.activity = ActivityState::Idle;
        self.cursor.last_analysis = None;
        if mode == PracticeMode::Sentence && self.cursor.phase != DialoguePhase::Learning {
            self.cursor.phase = DialoguePhase::Learning;
            self.cursor.turn_index = 0;
        }
        Vec::new()
    }

    pub fn set_phase(&mut self, phase: DialoguePhase) -> Vec<Command> {
        self.cursor.phase = phase;
        self.cursor.turn_index = 0;
        self.cursor.activity = ActivityState::Idle;
        self.cursor.last_analysis = None;
        Vec::new()
    }

    pub fn set_role(&mut self, role: Speaker) -> Vec<Command> {
        self.cursor.user_role = role;
        Vec::new()
    }

    /// Jumps to a dialogue from the library view, restarting it at the
    /// learning phase.
    pub fn select_dialogue(&mut self, index: usize) -> Vec<Command> {
        if index >= self.catalog.dialogues.len() {
            return Vec::new();
        }
        self.cursor.dialogue_index = index;
        self.cursor.turn_index = 0;
        self.cursor.phase = DialoguePhase::Learning;
        self.cursor.activity = ActivityState::Idle;
        self.cursor.last_analysis = None;
        Vec::new()
    }

    /// Jumps to a word from the library view.
    pub fn select_word(&mut self, index: usize) -> Vec<Command> {
        if index >= self.catalog.words.len() {
            return Vec::new();
        }
        self.cursor.word_index = index;
        self.cursor.activity = ActivityState::Idle;
        self.cursor.last_analysis = None;
        Vec::new()
    }

    /// The restart affordance offered once the catalog is exhausted. Progress
    /// is kept; only the cursor is re-derived.
    pub fn restart(&mut self) -> Vec<Command> {
        self.cursor = SessionCursor::default();
        self.rescan_resume_position();
        Vec::new()
    }

    // --- Settings ---

    pub fn set_daily_goal(&mut self, goal: u32) -> Vec<Command> {
        self.progress.set_daily_goal(goal);
        vec![Command::PersistProgress]
    }

    pub fn set_target_accuracy(&mut self, accuracy: u32) -> Vec<Command> {
        self.progress.set_target_accuracy(accuracy);
        vec![Command::PersistProgress]
    }
}
