use super::board::describe_board;
use super::error::{CorpusError, Result};
use super::types::{GameRecord, PositionSample};
use rand::Rng;
use rand::seq::IndexedRandom;
use shakmaty::san::SanPlus;
use shakmaty::{Chess, Move, Position};

/// SAN of every legal move at `pos`, in move generator order.
pub fn legal_sans(pos: &Chess) -> Vec<String> {
    pos.legal_moves()
        .into_iter()
        .map(|m| SanPlus::from_move(pos.clone(), m).to_string())
        .collect()
}

/// Resolves `token` against `pos`, returning the move together with its
/// canonical SAN (check and mate suffixes recomputed from the position).
pub fn parse_san(pos: &Chess, token: &str) -> Option<(Move, String)> {
    let san: SanPlus = token.parse().ok()?;
    let m = san.san.to_move(pos).ok()?;
    let canonical = SanPlus::from_move(pos.clone(), m).to_string();
    Some((m, canonical))
}

fn snapshot(pos: &Chess, history: &[String]) -> PositionSample {
    PositionSample {
        move_sequence: history.to_vec(),
        side_to_move: pos.turn().into(),
        board_state: describe_board(pos.board()),
        legal_moves: legal_sans(pos),
        next_move: None,
    }
}

/// Walks `game` from the initial position and emits one sample per position
/// reached, followed by up to `extension` positions reached through uniformly
/// random legal moves.
///
/// Each sample's `next_move` is the move leading to the following sample.
/// Generation stops at the first position without legal moves.
pub fn generate_samples<R: Rng + ?Sized>(
    game: &GameRecord,
    extension: usize,
    rng: &mut R,
) -> Result<Vec<PositionSample>> {
    let mut pos = Chess::default();
    let mut history: Vec<String> = Vec::with_capacity(game.move_sequence.len() + extension);
    let mut samples = Vec::with_capacity(game.move_sequence.len() + extension + 1);
    samples.push(snapshot(&pos, &history));

    for (ply, token) in game.move_sequence.iter().enumerate() {
        let (m, san) = parse_san(&pos, token).ok_or_else(|| CorpusError::IllegalMove {
            ply: ply + 1,
            san: token.clone(),
        })?;

        pos.play_unchecked(m);
        history.push(san);
        samples.push(snapshot(&pos, &history));
    }

    for _ in 0..extension {
        let legal = pos.legal_moves();
        let Some(m) = legal.choose(rng).cloned() else {
            break;
        };

        history.push(SanPlus::from_move(pos.clone(), m).to_string());
        pos.play_unchecked(m);
        samples.push(snapshot(&pos, &history));
    }

    for (i, played) in history.iter().enumerate() {
        samples[i].next_move = Some(played.clone());
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::types::Side;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn game(moves: &[&str]) -> GameRecord {
        GameRecord::new(1500.0, moves.iter().map(|m| m.to_string()).collect())
    }

    #[test]
    fn test_one_sample_per_ply_plus_initial() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let moves = ["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"];
        let samples = generate_samples(&game(&moves), 0, &mut rng).unwrap();

        assert_eq!(samples.len(), moves.len() + 1);
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(sample.move_sequence.len(), i);
        }
    }

    #[test]
    fn test_initial_sample() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let samples = generate_samples(&game(&["d4"]), 0, &mut rng).unwrap();
        let first = &samples[0];

        assert!(first.move_sequence.is_empty());
        assert_eq!(first.side_to_move, Side::White);
        assert_eq!(first.legal_moves.len(), 20);
        assert_eq!(first.next_move.as_deref(), Some("d4"));
        assert!(first.board_state.starts_with("white has 8 pawns on:"));
    }

    #[test]
    fn test_next_move_links_consecutive_samples() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let moves = ["e4", "e5", "Nf3", "Nf6", "Nxe5"];
        let samples = generate_samples(&game(&moves), 0, &mut rng).unwrap();

        for pair in samples.windows(2) {
            let next = pair[0].next_move.as_ref().expect("next move");
            assert_eq!(pair[1].move_sequence.last(), Some(next));
            assert!(pair[0].legal_moves.contains(next));
        }
        assert_eq!(samples.last().unwrap().next_move, None);
        assert_eq!(samples[1].side_to_move, Side::Black);
    }

    #[test]
    fn test_repeated_moves_keep_their_own_successor() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let moves = ["Nf3", "Nf6", "Ng1", "Ng8", "Nf3", "Nf6", "e4"];
        let samples = generate_samples(&game(&moves), 0, &mut rng).unwrap();

        assert_eq!(samples[4].next_move.as_deref(), Some("Nf3"));
        assert_eq!(samples[6].next_move.as_deref(), Some("e4"));
    }

    #[test]
    fn test_checkmate_ends_generation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let moves = ["f3", "e5", "g4", "Qh4#"];
        let samples = generate_samples(&game(&moves), 10, &mut rng).unwrap();

        assert_eq!(samples.len(), 5);
        let last = samples.last().unwrap();
        assert!(last.legal_moves.is_empty());
        assert_eq!(last.next_move, None);
        assert_eq!(samples[3].next_move.as_deref(), Some("Qh4#"));
    }

    #[test]
    fn test_history_is_rendered_with_check_suffix() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        // source notation without the mate marker
        let moves = ["f3", "e5", "g4", "Qh4"];
        let samples = generate_samples(&game(&moves), 0, &mut rng).unwrap();

        assert_eq!(samples[4].move_sequence.last().map(String::as_str), Some("Qh4#"));
    }

    #[test]
    fn test_random_extension_appends_linked_positions() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let moves = ["e4", "e5"];
        let samples = generate_samples(&game(&moves), 2, &mut rng).unwrap();

        assert_eq!(samples.len(), 5);
        assert_eq!(samples[2].move_sequence, vec!["e4", "e5"]);
        let bridge = samples[2].next_move.as_ref().expect("extension move");
        assert_eq!(samples[3].move_sequence.last(), Some(bridge));
        assert_eq!(samples[4].move_sequence.len(), 4);
        assert_eq!(samples[4].next_move, None);
    }

    #[test]
    fn test_random_extension_is_reproducible_with_seed() {
        let a = generate_samples(&game(&["d4"]), 12, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        let b = generate_samples(&game(&["d4"]), 12, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extension_until_exhaustion_ends_without_legal_moves() {
        // fool's mate position: no move can be drawn
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let samples =
            generate_samples(&game(&["f3", "e5", "g4", "Qh4#"]), 3, &mut rng).unwrap();
        let last = samples.last().unwrap();
        assert_eq!(last.next_move.is_none(), last.legal_moves.is_empty());
    }

    #[test]
    fn test_illegal_move_is_reported_with_ply() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let err = generate_samples(&game(&["e4", "e5", "Ke3"]), 0, &mut rng).unwrap_err();

        match err {
            CorpusError::IllegalMove { ply, san } => {
                assert_eq!(ply, 3);
                assert_eq!(san, "Ke3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_game_yields_single_sample() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let samples = generate_samples(&game(&[]), 0, &mut rng).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].next_move, None);
        assert_eq!(samples[0].legal_moves.len(), 20);
    }
}
