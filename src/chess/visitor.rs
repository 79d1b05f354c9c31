use super::error::ErrorAccumulator;
use super::types::GameRecord;
use pgn_reader::{Nag, RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use std::io::Read;
use std::ops::ControlFlow;

macro_rules! pgn_visitor_skip_variations {
    () => {
        fn nag(&mut self, _: &mut Self::Movetext, _: Nag) -> ControlFlow<Self::Output> {
            ControlFlow::Continue(())
        }

        fn comment(
            &mut self,
            _: &mut Self::Movetext,
            _: RawComment<'_>,
        ) -> ControlFlow<Self::Output> {
            ControlFlow::Continue(())
        }

        fn partial_comment(
            &mut self,
            _: &mut Self::Movetext,
            _: RawComment<'_>,
        ) -> ControlFlow<Self::Output> {
            ControlFlow::Continue(())
        }

        fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
            ControlFlow::Continue(Skip(true))
        }
    };
}

/// Streaming PGN visitor (pgn-reader).
///
/// Keeps the players' ratings and the mainline SAN moves; comments, NAGs and
/// variations are skipped.
pub struct GameVisitor {
    headers: HeaderFields,
    parse_error: ErrorAccumulator,
    pub current_game: Option<GameRecord>,
}

#[derive(Default)]
struct HeaderFields {
    white_elo: String,
    black_elo: String,
}

impl HeaderFields {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn set_known_tag(&mut self, key: &[u8], value: RawTag<'_>) {
        let slot: &mut String = match key {
            b"WhiteElo" => &mut self.white_elo,
            b"BlackElo" => &mut self.black_elo,
            _ => return,
        };

        if !slot.is_empty() {
            return;
        }

        let bytes = value.as_bytes();
        if bytes.is_empty() {
            return;
        }

        *slot = String::from_utf8_lossy(bytes).into_owned();
    }
}

impl Default for GameVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl GameVisitor {
    pub fn new() -> Self {
        Self {
            headers: HeaderFields::default(),
            parse_error: ErrorAccumulator::default(),
            current_game: None,
        }
    }

    /// Rating as a number; `?`, `-` and empty mean unrated (0) without a
    /// diagnostic, anything else unparsable is recorded.
    fn parse_elo_field(raw: &str, label: &str, parse_error: &mut ErrorAccumulator) -> f64 {
        let s = raw.trim();
        if s.is_empty() || s == "?" || s == "-" {
            return 0.0;
        }
        match s.parse::<u32>() {
            Ok(v) => f64::from(v),
            Err(_) => {
                parse_error.push(&format!("Conversion error: {label}='{s}'"));
                0.0
            }
        }
    }

    fn build_game_record(&mut self, move_sequence: Vec<String>) {
        let white_elo =
            Self::parse_elo_field(&self.headers.white_elo, "WhiteElo", &mut self.parse_error);
        let black_elo =
            Self::parse_elo_field(&self.headers.black_elo, "BlackElo", &mut self.parse_error);

        self.current_game = Some(GameRecord {
            average_elo: (white_elo + black_elo) / 2.0,
            move_sequence,
            parse_error: self.parse_error.take(),
        });
    }
}

impl Visitor for GameVisitor {
    type Tags = ();
    type Movetext = Vec<String>;
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.headers.clear();
        self.parse_error = ErrorAccumulator::default();
        self.current_game = None;
        ControlFlow::Continue(())
    }

    fn tag(
        &mut self,
        _: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        self.headers.set_known_tag(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(Vec::with_capacity(128))
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        movetext.push(san.to_string());
        ControlFlow::Continue(())
    }

    pgn_visitor_skip_variations!();

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        self.build_game_record(movetext);
    }
}

pub type PgnInput = Box<dyn Read + Send>;

/// One open archive together with its reader position.
pub struct PgnReaderState {
    pub pgn_reader: Reader<PgnInput>,
    pub next_game_index: usize,
    pub visitor: GameVisitor,
}

impl PgnReaderState {
    pub fn new(input: PgnInput) -> Self {
        Self {
            pgn_reader: Reader::new(input),
            next_game_index: 1,
            visitor: GameVisitor::new(),
        }
    }
}
