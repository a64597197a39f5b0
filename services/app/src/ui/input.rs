//! Parses typed command lines into user intents.

use echomaster_core::catalog::Speaker;
use echomaster_core::session::{DialoguePhase, PracticeMode};

use super::View;

/// Everything the learner can ask for from the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Hear the reference audio for the current item.
    Play,
    /// Toggle recording: start when idle, stop-and-score while recording.
    Record,
    /// Move past the current result.
    Advance,
    Retry,
    SetMode(PracticeMode),
    SetPhase(DialoguePhase),
    SetRole(Speaker),
    /// Jump to a dialogue by its 1-based library position.
    SelectDialogue(usize),
    /// Jump to a word by its 1-based library position.
    SelectWord(usize),
    SetDailyGoal(u32),
    SetTargetAccuracy(u32),
    Restart,
    Show(View),
    Help,
    Quit,
}

/// Parses one trimmed input line. `None` means the line was not a command.
pub fn parse_intent(line: &str) -> Option<Intent> {
    let mut parts = line.trim().split_whitespace();
    let head = parts.next()?.to_lowercase();
    let arg = parts.next();

    let intent = match head.as_str() {
        "p" | "play" => Intent::Play,
        "r" | "rec" | "record" => Intent::Record,
        "n" | "next" => Intent::Advance,
        "t" | "retry" => Intent::Retry,
        "m" | "mode" => match arg?.to_lowercase().as_str() {
            "s" | "sentence" => Intent::SetMode(PracticeMode::Sentence),
            "w" | "word" => Intent::SetMode(PracticeMode::Word),
            _ => return None,
        },
        "phase" => match arg?.to_lowercase().as_str() {
            "l" | "learning" => Intent::SetPhase(DialoguePhase::Learning),
            "r" | "roleplay" => Intent::SetPhase(DialoguePhase::Roleplay),
            _ => return None,
        },
        "role" => match arg?.to_lowercase().as_str() {
            "a" => Intent::SetRole(Speaker::A),
            "b" => Intent::SetRole(Speaker::B),
            _ => return None,
        },
        "d" | "dialogue" => Intent::SelectDialogue(parse_position(arg?)?),
        "w" | "word" => Intent::SelectWord(parse_position(arg?)?),
        "goal" => Intent::SetDailyGoal(arg?.parse().ok()?),
        "accuracy" => Intent::SetTargetAccuracy(arg?.parse().ok()?),
        "restart" => Intent::Restart,
        "practice" => Intent::Show(View::Practice),
        "lib" | "library" => Intent::Show(View::Library),
        "stats" => Intent::Show(View::Stats),
        "settings" => Intent::Show(View::Settings),
        "h" | "help" | "?" => Intent::Help,
        "q" | "quit" | "exit" => Intent::Quit,
        _ => return None,
    };
    Some(intent)
}

/// 1-based on screen, 0-based in the session.
fn parse_position(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok()?.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_letter_commands() {
        assert_eq!(parse_intent("p"), Some(Intent::Play));
        assert_eq!(parse_intent("r"), Some(Intent::Record));
        assert_eq!(parse_intent("n"), Some(Intent::Advance));
        assert_eq!(parse_intent("t"), Some(Intent::Retry));
        assert_eq!(parse_intent("q"), Some(Intent::Quit));
        assert_eq!(parse_intent("?"), Some(Intent::Help));
    }

    #[test]
    fn test_mode_phase_and_role() {
        assert_eq!(
            parse_intent("mode word"),
            Some(Intent::SetMode(PracticeMode::Word))
        );
        assert_eq!(
            parse_intent("m s"),
            Some(Intent::SetMode(PracticeMode::Sentence))
        );
        assert_eq!(
            parse_intent("phase roleplay"),
            Some(Intent::SetPhase(DialoguePhase::Roleplay))
        );
        assert_eq!(parse_intent("role a"), Some(Intent::SetRole(Speaker::A)));
        assert_eq!(parse_intent("ROLE B"), Some(Intent::SetRole(Speaker::B)));
    }

    #[test]
    fn test_selection_is_one_based() {
        assert_eq!(parse_intent("d 1"), Some(Intent::SelectDialogue(0)));
        assert_eq!(parse_intent("w 12"), Some(Intent::SelectWord(11)));
        // Position zero does not exist on screen.
        assert_eq!(parse_intent("d 0"), None);
    }

    #[test]
    fn test_settings_commands() {
        assert_eq!(parse_intent("goal 30"), Some(Intent::SetDailyGoal(30)));
        assert_eq!(
            parse_intent("accuracy 75"),
            Some(Intent::SetTargetAccuracy(75))
        );
        assert_eq!(parse_intent("goal abc"), None);
    }

    #[test]
    fn test_view_switching() {
        assert_eq!(parse_intent("lib"), Some(Intent::Show(View::Library)));
        assert_eq!(parse_intent("stats"), Some(Intent::Show(View::Stats)));
        assert_eq!(parse_intent("settings"), Some(Intent::Show(View::Settings)));
        assert_eq!(parse_intent("practice"), Some(Intent::Show(View::Practice)));
    }

    #[test]
    fn test_garbage_and_missing_arguments() {
        assert_eq!(parse_intent(""), None);
        assert_eq!(parse_intent("   "), None);
        assert_eq!(parse_intent("frobnicate"), None);
        assert_eq!(parse_intent("mode"), None);
        assert_eq!(parse_intent("mode turbo"), None);
        assert_eq!(parse_intent("role c"), None);
        assert_eq!(parse_intent("d"), None);
    }

    #[test]
    fn test_whitespace_tolerance() {
        assert_eq!(parse_intent("  play  "), Some(Intent::Play));
        assert_eq!(
            parse_intent("  mode   word "),
            Some(Intent::SetMode(PracticeMode::Word))
        );
    }
}
