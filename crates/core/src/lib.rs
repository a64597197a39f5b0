pub mod analysis;
pub mod catalog;
pub mod progress;
pub mod session;

/// Represents side effects that the sequencer asks an external runtime to perform.
///
/// This enum is the primary API for decoupling the sequencer's state
/// transitions from the runtime's execution of side effects (playing audio,
/// calling the scoring service, writing the progress file). The sequencer never
/// performs I/O itself; it only emits commands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Play the reference audio for the given target-language text.
    /// Fire-and-forget: completion does not feed back into the sequencer.
    Speak(String),
    /// Speak the peer's line during roleplay. The runtime must report
    /// completion back via `Sequencer::peer_line_finished`.
    SpeakPeerLine(String),
    /// Score the learner's recorded attempt against the reference text.
    /// The runtime attaches the captured audio sample and reports the result
    /// back via `Sequencer::analysis_complete`.
    Analyze { reference_text: String },
    /// The progress record changed and must be written out before control
    /// returns to the user.
    PersistProgress,
}
