//! Renders the session onto the terminal with crossterm styling.

use crossterm::{
    execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use echomaster_core::progress::ProgressState;
use echomaster_core::session::{ActivityState, DialoguePhase, PracticeMode, Sequencer};
use std::io::{Write, stdout};

use super::View;

pub fn render(seq: &Sequencer, view: View) -> std::io::Result<()> {
    match view {
        View::Practice => render_practice(seq),
        View::Library => render_library(seq),
        View::Stats => render_stats(seq),
        View::Settings => render_settings(seq),
    }
}

fn mode_label(seq: &Sequencer) -> String {
    match seq.cursor().mode {
        PracticeMode::Word => "Words".to_string(),
        PracticeMode::Sentence => {
            let phase = match seq.cursor().phase {
                DialoguePhase::Learning => "Learning",
                DialoguePhase::Roleplay => "Roleplay",
            };
            format!("Dialogue / {} / You are {}", phase, seq.cursor().user_role)
        }
    }
}

/// One-line daily progress summary for the header.
fn progress_summary(progress: &ProgressState) -> String {
    let goal_met = if progress.daily_count >= progress.daily_goal {
        "  goal met!"
    } else {
        ""
    };
    format!(
        "Today: {}/{}{}",
        progress.daily_count, progress.daily_goal, goal_met
    )
}

fn completion_mark(done: bool) -> &'static str {
    if done { "[x]" } else { "[ ]" }
}

fn render_header(seq: &Sequencer) -> std::io::Result<()> {
    let mut stdout = stdout();
    execute!(
        stdout,
        Print("\n"),
        SetAttribute(Attribute::Bold),
        SetForegroundColor(Color::Cyan),
        Print("EchoMaster"),
        ResetColor,
        SetAttribute(Attribute::Reset),
        Print(format!("  {}  |  ", mode_label(seq))),
        SetForegroundColor(Color::Yellow),
        Print(progress_summary(seq.progress())),
        ResetColor,
        Print("\n"),
    )
}

fn render_practice(seq: &Sequencer) -> std::io::Result<()> {
    render_header(seq)?;
    let mut stdout = stdout();

    if seq.is_exhausted() {
        execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("You have worked through everything in this list!\n"),
            ResetColor,
            Print("Type 'restart' to go again, or 'mode' to switch.\n"),
        )?;
        return stdout.flush();
    }

    match seq.cursor().mode {
        PracticeMode::Sentence => {
            if let (Some(dialogue), Some(turn)) = (seq.current_dialogue(), seq.current_turn()) {
                execute!(
                    stdout,
                    Print(format!(
                        "{}  (turn {}/{})\n",
                        dialogue.title,
                        seq.cursor().turn_index + 1,
                        dialogue.turns.len()
                    )),
                    SetForegroundColor(Color::Cyan),
                    Print(format!("{}: ", turn.speaker)),
                    ResetColor,
                    SetAttribute(Attribute::Bold),
                    Print(format!("{}\n", turn.text_target)),
                    SetAttribute(Attribute::Reset),
                    SetForegroundColor(Color::DarkGrey),
                    Print(format!("    {}\n", turn.text_native)),
                    ResetColor,
                )?;
            }
        }
        PracticeMode::Word => {
            if let Some(word) = seq.current_word() {
                execute!(
                    stdout,
                    SetAttribute(Attribute::Bold),
                    Print(format!("{}\n", word.text_target)),
                    SetAttribute(Attribute::Reset),
                    SetForegroundColor(Color::DarkGrey),
                    Print(format!("    {}  ({})\n", word.text_native, word.category)),
                    ResetColor,
                )?;
            }
        }
    }

    render_activity(seq)?;
    stdout.flush()
}

fn render_activity(seq: &Sequencer) -> std::io::Result<()> {
    let mut stdout = stdout();
    match seq.cursor().activity {
        ActivityState::Idle => execute!(
            stdout,
            SetForegroundColor(Color::DarkGrey),
            Print("p = play   r = record   lib / stats / settings   h = help\n"),
            ResetColor,
        ),
        ActivityState::Recording => execute!(
            stdout,
            SetForegroundColor(Color::Red),
            Print("* Recording... type 'r' to stop\n"),
            ResetColor,
        ),
        ActivityState::Analyzing => execute!(
            stdout,
            SetForegroundColor(Color::Yellow),
            Print("Analyzing your pronunciation...\n"),
            ResetColor,
        ),
        ActivityState::WaitingForPeer => execute!(
            stdout,
            SetForegroundColor(Color::Cyan),
            Print(format!(
                "Your partner ({}) is speaking...\n",
                seq.cursor().user_role.other()
            )),
            ResetColor,
        ),
        ActivityState::Result => render_result(seq),
    }
}

fn render_result(seq: &Sequencer) -> std::io::Result<()> {
    let mut stdout = stdout();

    let Some(analysis) = seq.cursor().last_analysis.as_ref() else {
        // Roleplay completed: a result with nothing to score.
        return execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("Roleplay complete! +5 toward today's goal.\n"),
            ResetColor,
            Print("Type 'phase l' to practice this dialogue again, or 'lib' to pick another.\n"),
        );
    };

    let passed = analysis.passes(seq.progress().target_accuracy);
    let score_color = if passed { Color::Green } else { Color::Red };
    execute!(
        stdout,
        Print("Score: "),
        SetForegroundColor(score_color),
        SetAttribute(Attribute::Bold),
        Print(format!("{:.0}", analysis.overall_score)),
        SetAttribute(Attribute::Reset),
        ResetColor,
        Print(format!(
            " (target {})\n{}\n",
            seq.progress().target_accuracy,
            analysis.summary
        )),
    )?;

    for feedback in &analysis.feedback {
        let color = if feedback.is_correct {
            Color::Green
        } else {
            Color::Red
        };
        execute!(
            stdout,
            Print("  "),
            SetForegroundColor(color),
            Print(feedback.word.clone()),
            ResetColor,
            Print(format!(" {:.0}", feedback.score)),
        )?;
        if let Some(tip) = &feedback.tip {
            execute!(
                stdout,
                SetForegroundColor(Color::DarkGrey),
                Print(format!("  - {}", tip)),
                ResetColor,
            )?;
        }
        execute!(stdout, Print("\n"))?;
    }

    if passed {
        execute!(
            stdout,
            SetForegroundColor(Color::DarkGrey),
            Print("n = next   t = retry\n"),
            ResetColor,
        )
    } else {
        execute!(
            stdout,
            SetForegroundColor(Color::DarkGrey),
            Print("Below target. t = retry\n"),
            ResetColor,
        )
    }
}

fn render_library(seq: &Sequencer) -> std::io::Result<()> {
    render_header(seq)?;
    let mut stdout = stdout();
    let progress = seq.progress();

    execute!(
        stdout,
        SetAttribute(Attribute::Bold),
        Print("Dialogues  (learn/roleplay)\n"),
        SetAttribute(Attribute::Reset),
    )?;
    for (i, dialogue) in seq.catalog().dialogues.iter().enumerate() {
        execute!(
            stdout,
            Print(format!(
                "  {:>2}. {} {}  {}  ({})\n",
                i + 1,
                completion_mark(progress.is_learning_completed(dialogue.id)),
                completion_mark(progress.is_roleplay_completed(dialogue.id)),
                dialogue.title,
                dialogue.category,
            )),
        )?;
    }

    execute!(
        stdout,
        SetAttribute(Attribute::Bold),
        Print("Words\n"),
        SetAttribute(Attribute::Reset),
    )?;
    for (i, word) in seq.catalog().words.iter().enumerate() {
        execute!(
            stdout,
            Print(format!(
                "  {:>2}. {} {}\n",
                i + 1,
                completion_mark(progress.is_word_completed(word.id)),
                word.text_target,
            )),
        )?;
    }

    execute!(
        stdout,
        SetForegroundColor(Color::DarkGrey),
        Print("d <n> = open dialogue   w <n> = open word   practice = back\n"),
        ResetColor,
    )?;
    stdout.flush()
}

fn render_stats(seq: &Sequencer) -> std::io::Result<()> {
    render_header(seq)?;
    let mut stdout = stdout();
    let progress = seq.progress();
    let catalog = seq.catalog();

    execute!(
        stdout,
        Print(format!(
            "Daily goal:          {}/{}\n",
            progress.daily_count, progress.daily_goal
        )),
        Print(format!(
            "Dialogues learned:   {}/{}\n",
            progress.completed_ids.len(),
            catalog.dialogues.len()
        )),
        Print(format!(
            "Roleplays finished:  {}/{}\n",
            progress.roleplay_completed_ids.len(),
            catalog.dialogues.len()
        )),
        Print(format!(
            "Turns completed:     {}\n",
            progress.completed_turn_ids.len()
        )),
        Print(format!(
            "Words completed:     {}/{}\n",
            progress.completed_word_ids.len(),
            catalog.words.len()
        )),
        SetForegroundColor(Color::DarkGrey),
        Print("practice = back\n"),
        ResetColor,
    )?;
    stdout.flush()
}

fn render_settings(seq: &Sequencer) -> std::io::Result<()> {
    render_header(seq)?;
    let mut stdout = stdout();
    let progress = seq.progress();

    execute!(
        stdout,
        Print(format!(
            "Daily goal:       {}   (goal <n>, 10-100)\n",
            progress.daily_goal
        )),
        Print(format!(
            "Target accuracy:  {}   (accuracy <n>, 50-100)\n",
            progress.target_accuracy
        )),
        SetForegroundColor(Color::DarkGrey),
        Print("practice = back\n"),
        ResetColor,
    )?;
    stdout.flush()
}

pub fn render_help() -> std::io::Result<()> {
    let mut stdout = stdout();
    execute!(
        stdout,
        Print("\n"),
        SetAttribute(Attribute::Bold),
        Print("Commands\n"),
        SetAttribute(Attribute::Reset),
        Print("  p / play            hear the reference audio\n"),
        Print("  r / rec             start or stop recording\n"),
        Print("  n / next            continue after a result\n"),
        Print("  t / retry           try the current item again\n"),
        Print("  m <s|w>             switch between dialogue and word practice\n"),
        Print("  phase <l|r>         switch between learning and roleplay\n"),
        Print("  role <a|b>          pick your roleplay part\n"),
        Print("  d <n> / w <n>       open a dialogue or word from the library\n"),
        Print("  goal <n>            set the daily goal\n"),
        Print("  accuracy <n>        set the target accuracy\n"),
        Print("  lib / stats / settings / practice\n"),
        Print("  restart             start over after finishing everything\n"),
        Print("  q / quit            leave\n"),
    )?;
    stdout.flush()
}

pub fn render_error(message: &str) -> std::io::Result<()> {
    let mut stdout = stdout();
    execute!(
        stdout,
        SetForegroundColor(Color::Red),
        Print(format!("{}\n", message)),
        ResetColor,
    )?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn progress() -> ProgressState {
        ProgressState::new(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
    }

    #[test]
    fn test_progress_summary() {
        let mut p = progress();
        p.daily_count = 4;
        assert_eq!(progress_summary(&p), "Today: 4/20");

        p.daily_count = 20;
        assert_eq!(progress_summary(&p), "Today: 20/20  goal met!");

        p.daily_count = 27;
        assert_eq!(progress_summary(&p), "Today: 27/20  goal met!");
    }

    #[test]
    fn test_completion_mark() {
        assert_eq!(completion_mark(true), "[x]");
        assert_eq!(completion_mark(false), "[ ]");
    }
}
