use super::types::{PositionSample, ReadableSample};

pub const GAME_SEQUENCE_LABEL: &str = "Game Sequence: ";
pub const CURRENT_POSITION_LABEL: &str = "Current Position: ";
pub const LEGAL_MOVES_LABEL: &str = "Legal Moves: ";
pub const GAME_OVER: &str = "Game Over.";

/// Renders `items` as a bracketed list of single-quoted strings,
/// e.g. `['e4', 'e5']`, or `[]` when empty.
pub fn python_list_repr<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::with_capacity(2 + items.len() * 8);
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('\'');
        out.push_str(item.as_ref());
        out.push('\'');
    }
    out.push(']');
    out
}

/// Builds the training pair for one position.
///
/// The `input` layout is parsed back by the rerank pass, so labels and line
/// breaks must stay exactly as written here.
pub fn sample_to_readable(sample: &PositionSample) -> ReadableSample {
    let input = format!(
        "{GAME_SEQUENCE_LABEL}{}\n{CURRENT_POSITION_LABEL}{}\n{} to move.\n{LEGAL_MOVES_LABEL}{}",
        python_list_repr(&sample.move_sequence),
        sample.board_state,
        sample.side_to_move,
        python_list_repr(&sample.legal_moves),
    );

    let output = sample
        .next_move
        .clone()
        .unwrap_or_else(|| GAME_OVER.to_string());

    ReadableSample { input, output }
}

/// Drops every `Game Sequence: ` line from `input`. Text without the marker
/// is returned unchanged.
pub fn strip_game_sequence(input: &str) -> String {
    if !input.contains("Game Sequence") {
        return input.to_string();
    }

    input
        .split('\n')
        .filter(|line| !line.starts_with(GAME_SEQUENCE_LABEL))
        .collect::<Vec<_>>()
        .join("\n")
}
