use super::corpus::CorpusSplit;
use super::error::{CorpusError, Result};
use super::readable::strip_game_sequence;
use super::types::ReadableSample;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn write_readables<W: Write>(mut writer: W, samples: &[ReadableSample]) -> Result<()> {
    for (idx, sample) in samples.iter().enumerate() {
        serde_json::to_writer(&mut writer, sample)
            .map_err(|source| CorpusError::Json { line: idx + 1, source })?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_readables<R: BufRead>(reader: R) -> Result<Vec<ReadableSample>> {
    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let sample = serde_json::from_str(&line)
            .map_err(|source| CorpusError::Json { line: idx + 1, source })?;
        samples.push(sample);
    }
    Ok(samples)
}

/// Copies a JSONL corpus, dropping the `Game Sequence:` line from every
/// input. Returns the number of records written.
pub fn strip_jsonl<R: BufRead, W: Write>(reader: R, writer: W) -> Result<usize> {
    let mut samples = read_readables(reader)?;
    for sample in &mut samples {
        sample.input = strip_game_sequence(&sample.input);
    }
    write_readables(writer, &samples)?;
    Ok(samples.len())
}

/// File names used for one band's corpus, e.g. `low_elo_4287_games_training.jsonl`.
pub fn split_file_names(band: &str, games: usize) -> (String, String) {
    (
        format!("{band}_elo_{games}_games_training.jsonl"),
        format!("{band}_elo_{games}_games_val.jsonl"),
    )
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|source| CorpusError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufWriter::new(file))
}

/// Writes both halves of `split` into `out_dir` and returns their paths.
pub fn export_split(split: &CorpusSplit, out_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let (train_name, val_name) = split_file_names(&split.band.name, split.games);
    let train_path = out_dir.join(train_name);
    let val_path = out_dir.join(val_name);

    write_readables(create(&train_path)?, &split.train)?;
    write_readables(create(&val_path)?, &split.validation)?;

    log::info!(
        "Wrote {} training samples to {} and {} validation samples to {}",
        split.train.len(),
        train_path.display(),
        split.validation.len(),
        val_path.display()
    );
    Ok((train_path, val_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::config::EloBand;
    use std::fs;
    use std::io::BufReader;

    fn sample(input: &str, output: &str) -> ReadableSample {
        ReadableSample {
            input: input.to_string(),
            output: output.to_string(),
        }
    }

    #[test]
    fn test_write_then_read_preserves_newlines_in_input() {
        let samples = vec![
            sample("Game Sequence: []\nCurrent Position: x\n\nWhite to move.", "e4"),
            sample("Legal Moves: []", "Game Over."),
        ];
        let mut buf = Vec::new();
        write_readables(&mut buf, &samples).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with(r#"{"input":"Game Sequence: []\nCurrent Position"#));

        assert_eq!(read_readables(buf.as_slice()).unwrap(), samples);
    }

    #[test]
    fn test_read_accepts_spaced_json() {
        let text = "{\"input\": \"a\", \"output\": \"b\"}\n\n";
        assert_eq!(read_readables(text.as_bytes()).unwrap(), vec![sample("a", "b")]);
    }

    #[test]
    fn test_read_reports_line_number() {
        let text = "{\"input\": \"a\", \"output\": \"b\"}\nnot json\n";
        let err = read_readables(text.as_bytes()).unwrap_err();
        assert!(matches!(err, CorpusError::Json { line: 2, .. }));
    }

    #[test]
    fn test_strip_jsonl() {
        let samples = vec![
            sample("Game Sequence: ['e4']\nBlack to move.\nLegal Moves: ['e5']", "e5"),
            sample("Black to move.", "Game Over."),
        ];
        let mut input = Vec::new();
        write_readables(&mut input, &samples).unwrap();

        let mut out = Vec::new();
        let written = strip_jsonl(input.as_slice(), &mut out).unwrap();

        assert_eq!(written, 2);
        let stripped = read_readables(out.as_slice()).unwrap();
        assert_eq!(stripped[0], sample("Black to move.\nLegal Moves: ['e5']", "e5"));
        assert_eq!(stripped[1], samples[1]);
    }

    #[test]
    fn test_split_file_names() {
        assert_eq!(
            split_file_names("low", 4287),
            (
                "low_elo_4287_games_training.jsonl".to_string(),
                "low_elo_4287_games_val.jsonl".to_string()
            )
        );
    }

    #[test]
    fn test_export_split_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let split = CorpusSplit {
            band: EloBand::new("low", 1300.0, 1650.0),
            games: 2,
            train: vec![sample("t1", "e4"), sample("t2", "d4")],
            validation: vec![sample("v1", "Game Over.")],
        };

        let (train_path, val_path) = export_split(&split, dir.path()).unwrap();

        assert_eq!(train_path.file_name().unwrap(), "low_elo_2_games_training.jsonl");
        let train = read_readables(BufReader::new(fs::File::open(&train_path).unwrap())).unwrap();
        let val = read_readables(BufReader::new(fs::File::open(&val_path).unwrap())).unwrap();
        assert_eq!(train, split.train);
        assert_eq!(val, split.validation);
    }
}
