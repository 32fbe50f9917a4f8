use itertools::Itertools;

use crate::evaluator::{CellState, Evaluation};
use crate::MAX_GUESSES;

pub const SHARE_TITLE: &str = "كلمه";

pub fn glyph(state: CellState) -> &'static str {
    match state {
        CellState::Correct => "🟩",
        CellState::Present => "🟨",
        CellState::Absent => "⬛",
    }
}

/// Spoiler-free summary of a finished game for the clipboard or share sheet.
///
/// ```
/// use kalima::evaluator::CellState::*;
/// use kalima::share::share_text;
///
/// let text = share_text(&[vec![Correct, Present, Absent, Absent, Correct]], true);
/// assert_eq!(text, "كلمه 1/6\n\n🟩🟨⬛⬛🟩");
/// ```
pub fn share_text(evaluations: &[Evaluation], won: bool) -> String {
    let score = if won {
        evaluations.len().to_string()
    } else {
        "X".to_string()
    };
    let grid = evaluations
        .iter()
        .map(|row| row.iter().map(|s| glyph(*s)).join(""))
        .join("\n");

    format!("{SHARE_TITLE} {score}/{MAX_GUESSES}\n\n{grid}")
}
