//! CSV export and import of recorded sessions.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{SecondsFormat, Utc};

use crate::models::{Channel, Sample, SessionId, SessionRecord};
use crate::session::summarize;

pub const SAMPLE_HEADER: &str = "channel,force_kg,timestamp_ms,event_flag";

fn write_sample_row<W: Write>(w: &mut W, sample: &Sample) -> std::io::Result<()> {
    writeln!(
        w,
        "{},{},{},{}",
        sample.channel(),
        sample.force_kg(),
        sample.timestamp_ms(),
        u8::from(sample.event_flag())
    )
}

/// Writes one session's samples in arrival order.
pub fn write_samples_csv<W: Write>(w: &mut W, samples: &[Sample]) -> std::io::Result<()> {
    writeln!(w, "{SAMPLE_HEADER}")?;
    for sample in samples {
        write_sample_row(w, sample)?;
    }
    Ok(())
}

pub fn save_session_csv<P: AsRef<Path>>(path: P, record: &SessionRecord) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    write_samples_csv(&mut w, &record.samples)?;
    w.flush()?;
    Ok(())
}

/// Writes several sessions into one file, each row prefixed with the session
/// id and creation time.
pub fn write_sessions_csv<W: Write>(
    w: &mut W,
    sessions: &[(SessionId, SessionRecord)],
) -> std::io::Result<()> {
    writeln!(w, "session_id,created_at,{SAMPLE_HEADER}")?;
    for (id, record) in sessions {
        let created_at = record.created_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        for sample in &record.samples {
            write!(w, "{id},{created_at},")?;
            write_sample_row(w, sample)?;
        }
    }
    Ok(())
}

pub fn save_sessions_csv<P: AsRef<Path>>(
    path: P,
    sessions: &[(SessionId, SessionRecord)],
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    write_sessions_csv(&mut w, sessions)?;
    w.flush()?;
    Ok(())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn parse_sample_row(line: &str) -> Result<Sample> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [channel, force, timestamp, flag] = fields.as_slice() else {
        bail!("expected 4 fields, found {}", fields.len());
    };

    let channel = Channel::parse(channel).ok_or_else(|| anyhow!("unknown channel '{channel}'"))?;
    let force_kg: f64 = force
        .parse()
        .with_context(|| format!("invalid force_kg '{force}'"))?;
    let timestamp_ms: i64 = timestamp
        .parse()
        .with_context(|| format!("invalid timestamp_ms '{timestamp}'"))?;
    let event_flag = parse_flag(flag).ok_or_else(|| anyhow!("invalid event_flag '{flag}'"))?;

    Ok(Sample::new(channel, force_kg, timestamp_ms, event_flag))
}

/// Reads samples written by [`write_samples_csv`]. Blank lines are skipped.
pub fn read_samples_csv<R: BufRead>(reader: R) -> Result<Vec<Sample>> {
    let mut lines = reader.lines();
    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| anyhow!("CSV is empty"))?;
    if header.trim() != SAMPLE_HEADER {
        bail!("unexpected CSV header '{}'", header.trim());
    }

    let mut samples = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Header is line 1.
        let sample = parse_sample_row(&line).with_context(|| format!("line {}", index + 2))?;
        samples.push(sample);
    }

    Ok(samples)
}

/// Loads a CSV as a finished session named `label`.
pub fn load_session_csv<P: AsRef<Path>>(path: P, label: String) -> Result<SessionRecord> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let samples = read_samples_csv(BufReader::new(file))
        .with_context(|| format!("failed to read {}", path.display()))?;
    let summary = summarize(&samples).with_context(|| format!("{} has no samples", path.display()))?;

    Ok(SessionRecord {
        summary,
        samples,
        created_at: Utc::now(),
        label: Some(label),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new(Channel::Left, 2.0, 1_000, false),
            Sample::new(Channel::Right, 1.25, 1_000, false),
            Sample::new(Channel::Left, 3.5, 1_200, true),
        ]
    }

    #[test]
    fn writes_expected_csv() {
        let mut buf = Vec::new();
        write_samples_csv(&mut buf, &samples()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "channel,force_kg,timestamp_ms,event_flag",
                "left,2,1000,0",
                "right,1.25,1000,0",
                "left,3.5,1200,1",
            ]
        );
    }

    #[test]
    fn export_all_prefixes_session_columns() {
        let record = SessionRecord {
            summary: summarize(&samples()).unwrap(),
            samples: samples(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap(),
            label: None,
        };
        let mut buf = Vec::new();
        write_sessions_csv(&mut buf, &[(SessionId::from("abc"), record)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("session_id,created_at,channel,force_kg,timestamp_ms,event_flag")
        );
        assert_eq!(lines.next(), Some("abc,2024-05-01T22:00:00.000Z,left,2,1000,0"));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn import_reads_back_what_export_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("night.csv");
        let original = SessionRecord {
            summary: summarize(&samples()).unwrap(),
            samples: samples(),
            created_at: Utc::now(),
            label: None,
        };
        save_session_csv(&path, &original).unwrap();

        let imported = load_session_csv(&path, "demo".to_string()).unwrap();
        assert_eq!(imported.samples, original.samples);
        assert_eq!(imported.summary, original.summary);
        assert_eq!(imported.label.as_deref(), Some("demo"));
    }

    #[test]
    fn import_rejects_bad_rows_with_line_number() {
        let csv = "channel,force_kg,timestamp_ms,event_flag\nleft,1.0,0,0\nmiddle,1.0,0,0\n";
        let err = read_samples_csv(csv.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("line 3"));

        let err = read_samples_csv("a,b\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("unexpected CSV header"));
    }

    #[test]
    fn import_accepts_sensor_ids_and_boolean_words() {
        let csv = "channel,force_kg,timestamp_ms,event_flag\n1,0.5,10,true\n\n2,0.7,10,false\n";
        let parsed = read_samples_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            parsed,
            vec![
                Sample::new(Channel::Left, 0.5, 10, true),
                Sample::new(Channel::Right, 0.7, 10, false),
            ]
        );
    }

    #[test]
    fn header_only_file_cannot_be_imported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, format!("{SAMPLE_HEADER}\n")).unwrap();
        assert!(load_session_csv(&path, "empty".to_string()).is_err());
    }
}
