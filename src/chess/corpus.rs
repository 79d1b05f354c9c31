use super::config::{CorpusConfig, EloBand};
use super::readable::sample_to_readable;
use super::samples::generate_samples;
use super::types::{GameRecord, ReadableSample};
use rand::Rng;
use rand::seq::SliceRandom;

/// Games whose average rating lies inside `band` (bounds inclusive), in
/// input order.
pub fn filter_by_elo(games: &[GameRecord], band: &EloBand) -> Vec<GameRecord> {
    games
        .iter()
        .filter(|game| band.contains(game.average_elo))
        .cloned()
        .collect()
}

/// Splits off the last `validation_games` records. When fewer records exist,
/// all of them go to validation.
pub fn split_validation(
    mut games: Vec<GameRecord>,
    validation_games: usize,
) -> (Vec<GameRecord>, Vec<GameRecord>) {
    let at = games.len().saturating_sub(validation_games);
    let validation = games.split_off(at);
    (games, validation)
}

/// Flattens every game into readable samples. Games that cannot be replayed
/// are logged and skipped.
pub fn games_to_readables<R: Rng + ?Sized>(
    games: &[GameRecord],
    extension: usize,
    rng: &mut R,
) -> Vec<ReadableSample> {
    let mut readables = Vec::new();

    for (idx, game) in games.iter().enumerate() {
        match generate_samples(game, extension, rng) {
            Ok(samples) => readables.extend(samples.iter().map(sample_to_readable)),
            Err(e) => log::warn!("Skipping game {}: {}", idx + 1, e),
        }
    }

    readables
}

pub fn cap<T>(items: &mut Vec<T>, max: usize) {
    items.truncate(max);
}

#[derive(Debug, Clone)]
pub struct CorpusSplit {
    pub band: EloBand,
    /// Number of games that passed the band filter.
    pub games: usize,
    pub train: Vec<ReadableSample>,
    pub validation: Vec<ReadableSample>,
}

/// Runs the whole selection pipeline for one Elo band: shuffle games, filter,
/// split, flatten, shuffle samples, cap both sides.
pub fn assemble<R: Rng + ?Sized>(
    mut games: Vec<GameRecord>,
    config: &CorpusConfig,
    band: &EloBand,
    rng: &mut R,
) -> CorpusSplit {
    games.shuffle(rng);

    let selected = filter_by_elo(&games, band);
    let selected_count = selected.len();
    let (train_games, val_games) = split_validation(selected, config.validation_games);

    log::info!(
        "Band '{}': {} games selected ({} train / {} validation)",
        band.name,
        selected_count,
        train_games.len(),
        val_games.len()
    );

    let mut train = games_to_readables(&train_games, config.random_extension, rng);
    let mut validation = games_to_readables(&val_games, config.random_extension, rng);

    train.shuffle(rng);
    validation.shuffle(rng);

    cap(&mut train, config.max_train_samples);
    cap(&mut validation, config.max_val_samples);

    CorpusSplit {
        band: band.clone(),
        games: selected_count,
        train,
        validation,
    }
}
