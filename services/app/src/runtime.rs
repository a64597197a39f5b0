//! The runtime event loop: executes the commands the session sequencer emits
//! and feeds completions back into it.
//!
//! Runs on the main thread because the live `Recorder` stream is not `Send`.
//! Playback streams are created inside `spawn_blocking` closures and never
//! cross threads.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use echomaster_core::Command;
use echomaster_core::analysis::AnalysisResult;
use echomaster_core::session::{ActivityState, Sequencer};

use crate::audio;
use crate::gateway::{GatewayError, SpeechGateway};
use crate::sound::{self, Recorder};
use crate::store::ProgressStore;
use crate::ui::input::{Intent, parse_intent};
use crate::ui::{View, display};

/// Pause between the end of the peer's spoken line and the next turn.
pub const PEER_LINE_GAP: Duration = Duration::from_millis(800);

/// Everything that can wake the runtime loop.
#[derive(Debug)]
pub enum Event {
    /// A line typed at the prompt.
    Line(String),
    /// The scoring request finished, successfully or not.
    AnalysisDone(AnalysisResult),
    /// The peer's line (and the pause after it) finished playing.
    PeerLineDone,
}

pub struct Runtime {
    sequencer: Sequencer,
    gateway: Arc<dyn SpeechGateway>,
    store: ProgressStore,
    view: View,
    recorder: Option<Recorder>,
    /// Encoded WAV payload of the attempt awaiting analysis.
    pending_attempt: Option<String>,
    event_tx: mpsc::Sender<Event>,
    event_rx: mpsc::Receiver<Event>,
}

/// Collapses a gateway outcome into the result the session stores: failures
/// and timeouts become the zero-score placeholder, never a stuck session.
fn score_or_failed(outcome: Result<AnalysisResult, GatewayError>) -> AnalysisResult {
    match outcome {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "Analysis failed, recording a zero score");
            AnalysisResult::failed()
        }
    }
}

impl Runtime {
    pub fn new(sequencer: Sequencer, gateway: Arc<dyn SpeechGateway>, store: ProgressStore) -> Self {
        let (event_tx, event_rx) = mpsc::channel(64);
        Self {
            sequencer,
            gateway,
            store,
            view: View::Practice,
            recorder: None,
            pending_attempt: None,
            event_tx,
            event_rx,
        }
    }

    /// Runs until the learner quits or stdin closes.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.spawn_line_reader();
        display::render(&self.sequencer, self.view)?;

        loop {
            let event = tokio::select! {
                maybe_event = self.event_rx.recv() => match maybe_event {
                    Some(event) => event,
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            };
            if !self.apply(event) {
                break;
            }
            // Let the session self-trigger (peer lines in roleplay) after
            // every applied event.
            let reactions = self.sequencer.react();
            self.execute(reactions);
            display::render(&self.sequencer, self.view)?;
        }

        info!("Session ended");
        Ok(())
    }

    /// Forwards stdin lines into the event queue from a dedicated thread.
    fn spawn_line_reader(&self) {
        let line_tx = self.event_tx.clone();
        std::thread::spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if line_tx.blocking_send(Event::Line(line)).is_err() {
                    break;
                }
            }
        });
    }

    /// Applies one event. Returns `false` when the loop should stop.
    fn apply(&mut self, event: Event) -> bool {
        match event {
            Event::Line(line) => {
                if line.trim().is_empty() {
                    return true;
                }
                match parse_intent(&line) {
                    Some(intent) => return self.handle_intent(intent),
                    None => {
                        let _ = display::render_error("Unknown command. Type 'h' for help.");
                    }
                }
            }
            Event::AnalysisDone(result) => {
                let commands = self.sequencer.analysis_complete(result);
                self.execute(commands);
            }
            Event::PeerLineDone => {
                let commands = self.sequencer.peer_line_finished();
                self.execute(commands);
            }
        }
        true
    }

    fn handle_intent(&mut self, intent: Intent) -> bool {
        match intent {
            Intent::Play => {
                let commands = self.sequencer.play();
                self.execute(commands);
            }
            Intent::Record => match self.sequencer.cursor().activity {
                ActivityState::Recording => self.stop_recording(),
                ActivityState::Idle => self.start_recording(),
                // From a result only a scored one may be re-attempted; the
                // roleplay-complete marker never reopens the microphone.
                ActivityState::Result if self.sequencer.cursor().last_analysis.is_some() => {
                    self.start_recording()
                }
                _ => {}
            },
            Intent::Retry => {
                let cursor = self.sequencer.cursor();
                if cursor.activity == ActivityState::Result && cursor.last_analysis.is_some() {
                    self.start_recording();
                }
            }
            Intent::Advance => {
                let cursor = self.sequencer.cursor();
                if cursor.activity == ActivityState::Result
                    && cursor.last_analysis.is_some()
                    && !self.sequencer.can_advance()
                {
                    let _ = display::render_error("Score below target. Type 't' to retry.");
                } else {
                    let commands = self.sequencer.advance();
                    self.execute(commands);
                }
            }
            Intent::SetMode(mode) => {
                self.abandon_capture();
                let commands = self.sequencer.set_mode(mode);
                self.execute(commands);
                self.view = View::Practice;
            }
            Intent::SetPhase(phase) => {
                self.abandon_capture();
                let commands = self.sequencer.set_phase(phase);
                self.execute(commands);
            }
            Intent::SetRole(role) => {
                let commands = self.sequencer.set_role(role);
                self.execute(commands);
            }
            Intent::SelectDialogue(index) => {
                self.abandon_capture();
                let commands = self.sequencer.select_dialogue(index);
                self.execute(commands);
                self.view = View::Practice;
            }
            Intent::SelectWord(index) => {
                self.abandon_capture();
                let commands = self.sequencer.select_word(index);
                self.execute(commands);
                self.view = View::Practice;
            }
            Intent::SetDailyGoal(goal) => {
                let commands = self.sequencer.set_daily_goal(goal);
                self.execute(commands);
            }
            Intent::SetTargetAccuracy(accuracy) => {
                let commands = self.sequencer.set_target_accuracy(accuracy);
                self.execute(commands);
            }
            Intent::Restart => {
                self.abandon_capture();
                let commands = self.sequencer.restart();
                self.execute(commands);
                self.view = View::Practice;
            }
            Intent::Show(view) => self.view = view,
            Intent::Help => {
                let _ = display::render_help();
            }
            Intent::Quit => return false,
        }
        true
    }

    /// Closes a live capture without scoring it, for intents that move the
    /// cursor away from the item being recorded.
    fn abandon_capture(&mut self) {
        if self.recorder.take().is_some() {
            info!("Recording abandoned");
        }
        self.pending_attempt = None;
    }

    /// Opens the microphone, then tells the session. A denied or missing
    /// device leaves the session exactly where it was.
    fn start_recording(&mut self) {
        match Recorder::start() {
            Ok(recorder) => {
                self.recorder = Some(recorder);
                let commands = self.sequencer.begin_recording();
                self.execute(commands);
            }
            Err(e) => {
                warn!(error = %e, "Could not open the microphone");
                let _ = display::render_error(&format!("Microphone unavailable: {e}"));
            }
        }
    }

    fn stop_recording(&mut self) {
        let Some(recorder) = self.recorder.take() else {
            warn!("Recording state without a live recorder");
            return;
        };
        let (samples, capture_rate) = recorder.stop();
        match sound::prepare_upload_payload(&samples, capture_rate) {
            Ok(payload) => self.pending_attempt = Some(payload),
            Err(e) => {
                // The analysis executor turns the missing payload into a
                // zero-score result, so the session still reaches Result.
                error!(error = %e, "Could not encode the recorded attempt");
                self.pending_attempt = None;
            }
        }
        let commands = self.sequencer.finish_recording();
        self.execute(commands);
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Speak(text) => self.spawn_speak(text),
                Command::SpeakPeerLine(text) => self.spawn_peer_line(text),
                Command::Analyze { reference_text } => self.spawn_analysis(reference_text),
                Command::PersistProgress => {
                    if let Err(e) = self.store.save(self.sequencer.progress()) {
                        error!(error = %e, "Failed to persist progress");
                        let _ = display::render_error("Warning: progress could not be saved.");
                    }
                }
            }
        }
    }

    /// Fire-and-forget reference playback.
    fn spawn_speak(&self, text: String) {
        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            match gateway.synthesize(&text).await {
                Ok(samples) => play_blocking(samples).await,
                Err(e) => warn!(error = %e, "Speech synthesis failed"),
            }
        });
    }

    /// Speaks the peer's roleplay line, then reports completion after the
    /// scripted pause. Completion is reported even when synthesis fails, so
    /// the roleplay can never stall on a gateway error.
    fn spawn_peer_line(&self, text: String) {
        let gateway = self.gateway.clone();
        let done_tx = self.event_tx.clone();
        tokio::spawn(async move {
            match gateway.synthesize(&text).await {
                Ok(samples) => play_blocking(samples).await,
                Err(e) => warn!(error = %e, "Peer line synthesis failed"),
            }
            tokio::time::sleep(PEER_LINE_GAP).await;
            let _ = done_tx.send(Event::PeerLineDone).await;
        });
    }

    fn spawn_analysis(&mut self, reference_text: String) {
        let gateway = self.gateway.clone();
        let done_tx = self.event_tx.clone();
        let payload = self.pending_attempt.take();
        tokio::spawn(async move {
            let result = match payload {
                Some(payload) => score_or_failed(gateway.analyze(&reference_text, &payload).await),
                None => {
                    warn!("No captured attempt to analyze");
                    AnalysisResult::failed()
                }
            };
            let _ = done_tx.send(Event::AnalysisDone(result)).await;
        });
    }
}

/// Runs blocking playback off the async loop.
async fn play_blocking(samples: Vec<f32>) {
    let played = tokio::task::spawn_blocking(move || {
        sound::play_pcm(&samples, audio::TTS_PCM16_SAMPLE_RATE)
    })
    .await;
    match played {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Playback failed"),
        Err(e) => warn!(error = %e, "Playback task panicked"),
    }
}
