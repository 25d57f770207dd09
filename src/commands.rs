use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};

use crate::db::Database;
use crate::export::{load_session_csv, save_session_csv, save_sessions_csv};
use crate::models::{Channel, SessionId, SessionListing, SessionRecord};
use crate::report::{event_report, ChannelReport};
use crate::sensing::{
    AcquisitionController, ChannelTransport, FrameDecoder, LiveSource, SyntheticSource, FRAME_LEN,
};
use crate::session::{SessionManager, SessionStore, SessionSummary, StopError, SummaryError};
use crate::settings::SettingsStore;

/// Everything a subcommand needs.
pub struct AppContext {
    pub settings: SettingsStore,
    pub db: Database,
}

const STATUS_INTERVAL: Duration = Duration::from_secs(1);

fn format_summary(summary: &SessionSummary) -> String {
    let mut lines = vec![
        format!("  readings: {}", summary.total_readings()),
        format!(
            "  span:     {} .. {} ms ({:.1} s)",
            summary.start_time_ms(),
            summary.end_time_ms(),
            summary.duration_ms() as f64 / 1000.0
        ),
    ];

    for channel in Channel::ALL {
        match summary.channel(channel) {
            Some(stats) => lines.push(format!(
                "  {:<6} n={} min={:.2} max={:.2} mean={:.2} kg",
                channel.as_str(),
                stats.count,
                stats.min,
                stats.max,
                stats.mean
            )),
            None => lines.push(format!("  {:<6} no readings", channel.as_str())),
        }
    }

    lines.join("\n")
}

fn format_listing(listing: &SessionListing) -> String {
    let label = listing
        .label
        .as_deref()
        .map(|label| format!(" [{label}]"))
        .unwrap_or_default();
    format!(
        "{}  {}  {:>7} readings  {:>8.1} s{}",
        listing.id,
        listing.created_at.format("%Y-%m-%d %H:%M:%S"),
        listing.summary.total_readings(),
        listing.summary.duration_ms() as f64 / 1000.0,
        label
    )
}

async fn print_status(manager: &SessionManager, window: usize) {
    let status = manager.status().await;
    let recent = manager.snapshot(Some(window)).await;
    let event = manager.current_state().await;

    let latest: Vec<String> = Channel::ALL
        .into_iter()
        .map(|channel| {
            recent
                .iter()
                .rev()
                .find(|sample| sample.channel() == channel)
                .map(|sample| format!("{}={:.2}kg", channel.as_str(), sample.force_kg()))
                .unwrap_or_else(|| format!("{}=-", channel.as_str()))
        })
        .collect();

    println!(
        "{:>7} readings  {}  event: {}",
        status.sample_count,
        latest.join(" "),
        event.label().unwrap_or("none")
    );
}

pub async fn record(ctx: &AppContext, seconds: Option<u64>, discard: bool) -> Result<()> {
    let settings = ctx.settings.get();
    let manager = SessionManager::new(Arc::new(ctx.db.clone()));
    let source = SyntheticSource::new(settings.synthetic.clone());
    let controller = AcquisitionController::new(manager.clone(), Box::new(source));

    controller.start().await?;
    println!("Recording... press Ctrl-C to stop");

    let deadline = async {
        match seconds {
            Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval(STATUS_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!("Failed to listen for Ctrl-C: {err}");
                }
                break;
            }
            _ = &mut deadline => break,
            _ = ticker.tick() => print_status(&manager, settings.window_size).await,
        }
    }

    finish(&manager, &controller, discard).await
}

async fn finish(
    manager: &SessionManager,
    controller: &AcquisitionController,
    discard: bool,
) -> Result<()> {
    match controller.stop(!discard).await {
        Ok(outcome) => {
            match outcome.session_id {
                Some(id) => println!("Saved session {id}"),
                None => println!("Session discarded"),
            }
            println!("{}", format_summary(&outcome.summary));
            Ok(())
        }
        Err(StopError::Summary(SummaryError::EmptyBuffer)) => {
            println!("No readings were recorded");
            Ok(())
        }
        Err(StopError::Persist { record, source }) => {
            warn!("Saving failed ({source:#}); retrying once");
            let summary = record.summary.clone();
            let id = manager
                .persist(record)
                .await
                .map_err(|err| anyhow!("session could not be saved: {err}"))?;
            println!("Saved session {id}");
            println!("{}", format_summary(&summary));
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Feeds a file of captured frames through the live decoding path.
pub async fn replay(ctx: &AppContext, path: &Path, discard: bool) -> Result<()> {
    let settings = ctx.settings.get();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    if bytes.len() % FRAME_LEN != 0 {
        warn!(
            "{} ends with a partial frame of {} bytes; it will be dropped",
            path.display(),
            bytes.len() % FRAME_LEN
        );
    }

    let decoder = FrameDecoder::new(settings.event_layout);
    info!(
        "Replaying {} frames from {} ({:?} event layout)",
        bytes.len() / FRAME_LEN,
        path.display(),
        decoder.layout()
    );

    let (tx, transport) = ChannelTransport::channel(64);
    let manager = SessionManager::new(Arc::new(ctx.db.clone()));
    let source = LiveSource::new(transport, decoder);
    let controller = AcquisitionController::new(manager.clone(), Box::new(source));
    controller.start().await?;

    let feeder = tokio::spawn(async move {
        for frame in bytes.chunks(FRAME_LEN) {
            if tx.send(frame.to_vec()).await.is_err() {
                break;
            }
        }
    });

    controller.wait_for_source_end().await;
    if let Err(err) = feeder.await {
        warn!("Frame feeder failed: {err}");
    }

    finish(&manager, &controller, discard).await
}

pub async fn list(ctx: &AppContext, limit: Option<usize>, offset: usize) -> Result<()> {
    let sessions = match limit {
        Some(limit) => ctx.db.list_sessions_paginated(limit, offset).await?,
        None => ctx
            .db
            .list_sessions()
            .await?
            .into_iter()
            .skip(offset)
            .collect(),
    };

    if sessions.is_empty() {
        println!("No sessions stored");
        return Ok(());
    }

    for listing in &sessions {
        println!("{}", format_listing(listing));
    }
    Ok(())
}

async fn fetch(ctx: &AppContext, id: &str) -> Result<SessionRecord> {
    ctx.db
        .get_session(&SessionId::from(id))
        .await?
        .ok_or_else(|| anyhow!("session {id} not found"))
}

pub async fn show(ctx: &AppContext, id: &str) -> Result<()> {
    let record = fetch(ctx, id).await?;
    println!("Session {id}");
    println!("  created:  {}", record.created_at.to_rfc3339());
    if let Some(label) = &record.label {
        println!("  label:    {label}");
    }
    println!("{}", format_summary(&record.summary));
    Ok(())
}

fn format_report(report: &BTreeMap<Channel, ChannelReport>) -> String {
    report
        .iter()
        .map(|(channel, entry)| format!("  {:<6} {entry}", channel.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn report(ctx: &AppContext, id: &str) -> Result<()> {
    let record = fetch(ctx, id).await?;
    println!("Event report for session {id}");
    println!("{}", format_report(&event_report(&record.samples)));
    Ok(())
}

pub async fn export(ctx: &AppContext, id: &str, path: &Path) -> Result<()> {
    let record = fetch(ctx, id).await?;
    save_session_csv(path, &record)?;
    info!("Exported session {id} to {}", path.display());
    println!("Wrote {} samples to {}", record.samples.len(), path.display());
    Ok(())
}

pub async fn export_all(ctx: &AppContext, path: &Path) -> Result<()> {
    let listings = ctx.db.list_sessions().await?;
    let mut sessions = Vec::with_capacity(listings.len());
    for listing in listings {
        let record = ctx
            .db
            .get_session(&listing.id)
            .await?
            .ok_or_else(|| anyhow!("session {} disappeared during export", listing.id))?;
        sessions.push((listing.id, record));
    }

    save_sessions_csv(path, &sessions)?;
    println!("Wrote {} sessions to {}", sessions.len(), path.display());
    Ok(())
}

pub async fn import(ctx: &AppContext, path: &Path, label: Option<String>) -> Result<()> {
    let label = match label {
        Some(label) => label,
        None => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .context("cannot derive a label from the file name; pass --label")?,
    };

    let record = load_session_csv(path, label)?;
    let readings = record.summary.total_readings();
    let id = ctx.db.save_session(Arc::new(record)).await?;
    info!("Imported {} as session {id}", path.display());
    println!("Imported {readings} readings as session {id}");
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: &str) -> Result<()> {
    if !ctx.db.delete_session(&SessionId::from(id)).await? {
        bail!("session {id} not found");
    }
    println!("Deleted session {id}");
    Ok(())
}
