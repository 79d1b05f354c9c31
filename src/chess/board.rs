use shakmaty::{Board, Color, Role};
use std::fmt::Write;

const COLORS: [Color; 2] = [Color::White, Color::Black];

fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}

/// Renders the piece inventory of `board`, one `\n`-terminated line per
/// (color, role) pair: white first, then pawn through king.
///
/// ```text
/// white has 8 pawns on: a2,b2,c2,d2,e2,f2,g2,h2
/// white has 1 queen on: d1
/// black has no bishop
/// ```
pub fn describe_board(board: &Board) -> String {
    let mut description = String::with_capacity(512);

    for color in COLORS {
        for role in Role::ALL {
            let squares = board.by_piece(role.of(color));
            let count = squares.count();
            let color = color_name(color);
            let role = role_name(role);

            if count == 0 {
                let _ = writeln!(description, "{color} has no {role}");
                continue;
            }

            let names = squares
                .into_iter()
                .map(|sq| sq.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let plural = if count > 1 { "s" } else { "" };
            let _ = writeln!(description, "{color} has {count} {role}{plural} on: {names}");
        }
    }

    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::fen::Fen;
    use shakmaty::{CastlingMode, Chess, Position};

    fn board_from_fen(fen: &str) -> Board {
        let fen: Fen = fen.parse().unwrap();
        let pos: Chess = fen.into_position(CastlingMode::Standard).unwrap();
        pos.board().clone()
    }

    #[test]
    fn test_describe_initial_position() {
        let description = describe_board(Chess::default().board());

        let expected = "\
white has 8 pawns on: a2,b2,c2,d2,e2,f2,g2,h2
white has 2 knights on: b1,g1
white has 2 bishops on: c1,f1
white has 2 rooks on: a1,h1
white has 1 queen on: d1
white has 1 king on: e1
black has 8 pawns on: a7,b7,c7,d7,e7,f7,g7,h7
black has 2 knights on: b8,g8
black has 2 bishops on: c8,f8
black has 2 rooks on: a8,h8
black has 1 queen on: d8
black has 1 king on: e8
";
        assert_eq!(description, expected);
    }

    #[test]
    fn test_describe_missing_pieces_and_singular() {
        let board = board_from_fen("4k3/8/8/8/8/8/4P3/4K2R w K - 0 1");
        let description = describe_board(&board);
        let lines: Vec<&str> = description.lines().collect();

        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "white has 1 pawn on: e2");
        assert_eq!(lines[1], "white has no knight");
        assert_eq!(lines[3], "white has 1 rook on: h1");
        assert_eq!(lines[6], "black has no pawn");
        assert_eq!(lines[11], "black has 1 king on: e8");
        assert!(description.ends_with('\n'));
    }

    #[test]
    fn test_describe_squares_ascend_from_a1() {
        let board = board_from_fen("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        let description = describe_board(&board);

        assert!(description.contains("white has 2 rooks on: a1,h1\n"));
    }
}
