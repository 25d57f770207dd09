use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_channel, parse_datetime, to_i64, to_usize},
};
use crate::models::{Channel, SessionId, SessionListing, SessionRecord};
use crate::session::{ChannelStats, SessionStore, SessionSummary};

use super::samples::{insert_samples, load_samples};

const SESSION_COLUMNS: &str =
    "id, created_at, label, total_readings, start_time_ms, end_time_ms";

/// `sessions` row before its channel statistics are attached.
struct SessionRow {
    id: String,
    listing: SessionListing,
}

fn row_to_session(row: &Row) -> Result<SessionRow> {
    let id: String = row.get("id")?;
    let created_at: String = row.get("created_at")?;
    let total_readings: i64 = row.get("total_readings")?;

    let summary = SessionSummary::from_parts(
        to_usize(total_readings, "total_readings")?,
        BTreeMap::new(),
        row.get("start_time_ms")?,
        row.get("end_time_ms")?,
    );

    Ok(SessionRow {
        listing: SessionListing {
            id: SessionId::from(id.as_str()),
            created_at: parse_datetime(&created_at, "created_at")?,
            label: row.get("label")?,
            summary,
        },
        id,
    })
}

fn load_channel_stats(conn: &Connection, session_id: &str) -> Result<BTreeMap<Channel, ChannelStats>> {
    let mut stmt = conn.prepare(
        "SELECT channel, count, min_kg, max_kg, mean_kg
         FROM channel_stats
         WHERE session_id = ?1",
    )?;

    let mut rows = stmt.query(params![session_id])?;
    let mut per_channel = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let channel: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        per_channel.insert(
            parse_channel(&channel)?,
            ChannelStats {
                count: to_usize(count, "count")?,
                min: row.get(2)?,
                max: row.get(3)?,
                mean: row.get(4)?,
            },
        );
    }

    Ok(per_channel)
}

fn attach_stats(conn: &Connection, row: SessionRow) -> Result<SessionListing> {
    let mut listing = row.listing;
    let per_channel = load_channel_stats(conn, &row.id)?;
    listing.summary = SessionSummary::from_parts(
        listing.summary.total_readings(),
        per_channel,
        listing.summary.start_time_ms(),
        listing.summary.end_time_ms(),
    );
    Ok(listing)
}

fn query_listings(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<SessionListing>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut session_rows = Vec::new();
    while let Some(row) = rows.next()? {
        session_rows.push(row_to_session(row)?);
    }

    session_rows
        .into_iter()
        .map(|row| attach_stats(conn, row))
        .collect()
}

impl Database {
    /// Writes the session, its statistics and its samples in one transaction.
    pub async fn insert_session_record(&self, record: Arc<SessionRecord>) -> Result<SessionId> {
        let id = SessionId::new();
        let session_id = id.to_string();

        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let summary = &record.summary;

            tx.execute(
                "INSERT INTO sessions (id, created_at, label, total_readings, start_time_ms, end_time_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session_id,
                    format_datetime(&record.created_at),
                    record.label,
                    to_i64(summary.total_readings())?,
                    summary.start_time_ms(),
                    summary.end_time_ms(),
                ],
            )?;

            for (channel, stats) in summary.per_channel() {
                tx.execute(
                    "INSERT INTO channel_stats (session_id, channel, count, min_kg, max_kg, mean_kg)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        session_id,
                        channel.as_str(),
                        to_i64(stats.count)?,
                        stats.min,
                        stats.max,
                        stats.mean,
                    ],
                )?;
            }

            insert_samples(&tx, &session_id, &record.samples)?;

            tx.commit()?;
            Ok(())
        })
        .await?;

        Ok(id)
    }

    pub async fn list_session_listings(&self) -> Result<Vec<SessionListing>> {
        self.execute(|conn| {
            query_listings(
                conn,
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY created_at DESC, rowid DESC"
                ),
                [],
            )
        })
        .await
    }

    pub async fn list_sessions_paginated(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SessionListing>> {
        let limit = to_i64(limit)?;
        let offset = to_i64(offset)?;
        self.execute(move |conn| {
            query_listings(
                conn,
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT ?1 OFFSET ?2"
                ),
                params![limit, offset],
            )
        })
        .await
    }

    pub async fn get_session_record(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        let session_id = id.to_string();
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                    params![session_id],
                    |row| Ok(row_to_session(row)),
                )
                .optional()?
                .transpose()?;

            let Some(row) = row else {
                return Ok(None);
            };

            let listing = attach_stats(conn, row)?;
            let samples = load_samples(conn, &session_id)?;

            Ok(Some(SessionRecord {
                summary: listing.summary,
                samples,
                created_at: listing.created_at,
                label: listing.label,
            }))
        })
        .await
    }

    /// Removes a session; statistics and samples go with it through
    /// `ON DELETE CASCADE`. Returns whether a session was found.
    pub async fn delete_session(&self, id: &SessionId) -> Result<bool> {
        let session_id = id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
            Ok(rows_affected > 0)
        })
        .await
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn save_session(&self, record: Arc<SessionRecord>) -> Result<SessionId> {
        self.insert_session_record(record).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionListing>> {
        self.list_session_listings().await
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        self.get_session_record(id).await
    }
}
