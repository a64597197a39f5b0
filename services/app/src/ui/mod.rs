//! Terminal presentation: command parsing and view rendering.

pub mod display;
pub mod input;

/// The screen the terminal is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Practice,
    Library,
    Stats,
    Settings,
}
