use crate::history::RoundRecord;
use crate::store::Result;
use itertools::Itertools;
use std::fs::OpenOptions;
use std::path::Path;

const HEADER: [&str; 11] = [
    "date",
    "difficulty",
    "mode",
    "operations",
    "duration_secs",
    "time_taken_secs",
    "correct",
    "attempted",
    "score",
    "accuracy",
    "pace",
];

/// Append a finished round to the CSV log, writing the header on first use
pub fn append_round<P: AsRef<Path>>(path: P, record: &RoundRecord) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // header only for a fresh file
    let needs_header = !path.exists();

    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    if needs_header {
        writer.write_record(HEADER)?;
    }

    writer.write_record([
        record.created_at.to_rfc3339(),
        record.difficulty.to_string(),
        record.mode.to_string(),
        record.operations.iter().join(" "),
        record.duration_secs.to_string(),
        record.time_taken_secs.to_string(),
        record.correct.to_string(),
        record.attempted.to_string(),
        record.score.to_string(),
        record.accuracy.to_string(),
        format!("{:.2}", record.pace),
    ])?;
    writer.flush()?;
    Ok(())
}
