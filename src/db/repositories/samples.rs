use anyhow::Result;
use rusqlite::{params, Connection, Transaction};

use crate::db::helpers::{parse_channel, to_i64};
use crate::models::Sample;

/// SQLite turns a bound NaN into NULL; do it explicitly so the column
/// contract is visible. Infinities are stored as REAL.
fn stored_force(force_kg: f64) -> Option<f64> {
    (!force_kg.is_nan()).then_some(force_kg)
}

/// Writes `samples` in arrival order; `seq` preserves that order on reload.
pub(crate) fn insert_samples(tx: &Transaction<'_>, session_id: &str, samples: &[Sample]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO samples (session_id, seq, channel, force_kg, timestamp_ms, event_flag)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for (seq, sample) in samples.iter().enumerate() {
        stmt.execute(params![
            session_id,
            to_i64(seq)?,
            sample.channel().as_str(),
            stored_force(sample.force_kg()),
            sample.timestamp_ms(),
            sample.event_flag(),
        ])?;
    }

    Ok(())
}

pub(crate) fn load_samples(conn: &Connection, session_id: &str) -> Result<Vec<Sample>> {
    let mut stmt = conn.prepare(
        "SELECT channel, force_kg, timestamp_ms, event_flag
         FROM samples
         WHERE session_id = ?1
         ORDER BY seq ASC",
    )?;

    let mut rows = stmt.query(params![session_id])?;
    let mut samples = Vec::new();
    while let Some(row) = rows.next()? {
        let channel: String = row.get(0)?;
        let force_kg: Option<f64> = row.get(1)?;
        samples.push(Sample::new(
            parse_channel(&channel)?,
            force_kg.unwrap_or(f64::NAN),
            row.get(2)?,
            row.get(3)?,
        ));
    }

    Ok(samples)
}
