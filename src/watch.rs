use std::path::Path;

use crate::error::{Error, Result};
use crate::library::{collect_show_info, populate_season};
use crate::orchestrator::{Orchestrator, RunMode};
use crate::prompt::Prompt;
use crate::rename_engine::{RenameJob, SeasonDescriptor};
use crate::torrent_status::TorrentStatus;
use crate::watch_registry::{WatchRecord, WatchRegistry, normalize_source};

const SEASON_QUESTION: &str = "Please enter the season str, i.e Season 01, Specials, Extras";

/// Values given on the command line; anything missing is asked for.
#[derive(Debug, Clone, Default)]
pub struct WatchRequest {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub show_name: Option<String>,
    pub season: Option<String>,
}

fn value_or_ask<P: Prompt + ?Sized>(prompt: &mut P, value: Option<String>, question: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(prompt.ask(question)?.trim().to_string()),
    }
}

pub fn add_watch<P: Prompt + ?Sized>(
    registry: &mut WatchRegistry,
    prompt: &mut P,
    request: WatchRequest,
) -> Result<WatchRecord> {
    let source = value_or_ask(prompt, request.source, "Please enter the source path")?;
    let destination = value_or_ask(prompt, request.destination, "Please enter the destination path")?;
    let show_name = value_or_ask(prompt, request.show_name, "Show name i.e Show Name")?;
    let season = value_or_ask(prompt, request.season, SEASON_QUESTION)?;

    SeasonDescriptor::parse(&season)?;
    let source = normalize_source(&source);
    tracing::info!(source = %source, destination = %destination, show = %show_name, season = %season, "adding watch");

    if registry.contains(&source) {
        prompt.tell("Watch already exists");
        tracing::error!(source = %source, "watch already exists");
        return Err(Error::DuplicateWatch(source));
    }
    if !Path::new(&source).exists() {
        prompt.tell("Source does not exist");
        tracing::error!(source = %source, "source does not exist");
        return Err(Error::SourceMissing(source.into()));
    }

    let destination = if destination.is_empty() {
        destination
    } else {
        normalize_source(&destination)
    };

    let destination = if !destination.is_empty() && Path::new(&destination).exists() {
        destination
    } else {
        prompt.tell("Destination does not exist, starting rename process");
        tracing::warn!(destination = %destination, "destination does not exist, populating library");

        let library_root = normalize_source(&prompt.ask("Please enter the plex library root path")?);
        let show = collect_show_info(prompt, Some(show_name.as_str()))?;
        let created = populate_season(prompt, Path::new(&source), Path::new(&library_root), &show, &season)?;
        created.display().to_string()
    };

    let record = WatchRecord {
        source,
        destination,
        show_name,
        season,
    };
    registry.insert(record.clone())?;
    prompt.tell(&format!(
        "Watch {} added successfully, with destination {}, show name {}, season {}",
        record.source, record.destination, record.show_name, record.season
    ));

    Ok(record)
}

pub fn list_watches<P: Prompt + ?Sized>(registry: &WatchRegistry, prompt: &mut P) -> Vec<WatchRecord> {
    let records = registry.records();
    prompt.tell("Listing all watches");
    for record in &records {
        prompt.tell(&format!(
            "Show: {}, Season: {}, Source: {}, Destination: {}",
            record.show_name, record.season, record.source, record.destination
        ));
    }
    records
}

/// `Ok(None)` when the source is not watched.
pub fn remove_watch<P: Prompt + ?Sized>(
    registry: &mut WatchRegistry,
    prompt: &mut P,
    source: Option<String>,
) -> Result<Option<WatchRecord>> {
    let source = normalize_source(&value_or_ask(prompt, source, "Please enter the source path")?);

    match registry.remove(&source) {
        Some(record) => {
            prompt.tell(&format!("Watch {source} removed successfully"));
            Ok(Some(record))
        }
        None => {
            prompt.tell(&format!("Watch {source} not found"));
            tracing::warn!(source = %source, "watch not found for removal");
            Ok(None)
        }
    }
}

/// Replace every field of an existing watch. `Ok(None)` when the source is not watched.
pub fn update_watch<P: Prompt + ?Sized>(
    registry: &mut WatchRegistry,
    prompt: &mut P,
    request: WatchRequest,
) -> Result<Option<WatchRecord>> {
    let source = normalize_source(&value_or_ask(prompt, request.source, "Please enter the source path")?);

    if !registry.contains(&source) {
        prompt.tell(&format!("Watch {source} not found"));
        tracing::warn!(source = %source, "watch not found for update");
        return Ok(None);
    }

    let destination = value_or_ask(prompt, request.destination, "Please enter the destination path")?;
    let show_name = value_or_ask(prompt, request.show_name, "Show name i.e Show Name")?;
    let season = value_or_ask(prompt, request.season, SEASON_QUESTION)?;
    SeasonDescriptor::parse(&season)?;

    let record = WatchRecord {
        source,
        destination: normalize_source(&destination),
        show_name,
        season,
    };
    registry.update(record.clone())?;
    prompt.tell(&format!(
        "Watch {} updated successfully, with destination {}, show name {}, season {}",
        record.source, record.destination, record.show_name, record.season
    ));

    Ok(Some(record))
}

pub fn normalize_watch_keys<P: Prompt + ?Sized>(registry: &mut WatchRegistry, prompt: &mut P) -> usize {
    let changed = registry.normalize_keys();
    prompt.tell(&format!("Normalized {changed} watch source path(s)"));
    changed
}

#[derive(Debug, Default)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    pub skipped: Vec<String>,
    pub moved: usize,
}

/// Move new episodes of every watch whose download is not in progress.
pub async fn refresh_watches<P: Prompt + ?Sized>(
    registry: &WatchRegistry,
    status: &dyn TorrentStatus,
    prompt: &mut P,
) -> Result<RefreshReport> {
    prompt.tell("Refreshing the library");

    let downloading = match status.downloading_paths().await {
        Ok(paths) => paths,
        Err(e) => {
            prompt.tell(&format!("Could not query the torrent client: {e}"));
            tracing::error!(error = %e, "torrent status query failed");
            return Err(e);
        }
    };

    let mut report = RefreshReport::default();
    for record in registry.records() {
        let source = normalize_source(&record.source);

        if downloading.contains(&source) {
            prompt.tell(&format!("Skipping {source}, still downloading"));
            tracing::info!(source = %source, "skipping watch with active download");
            report.skipped.push(source);
            continue;
        }
        if !Path::new(&source).exists() {
            prompt.tell(&format!("Skipping {source}, source no longer exists"));
            tracing::warn!(source = %source, show = %record.show_name, season = %record.season, "watch source does not exist");
            report.skipped.push(source);
            continue;
        }

        prompt.tell(&format!("Refreshing {source}"));
        let job = RenameJob::new(&source, &record.destination, &record.show_name, &record.season).inspect_err(|e| {
            tracing::error!(source = %source, show = %record.show_name, season = %record.season, error = %e, "invalid watch");
        })?;
        let moved = Orchestrator::new(RunMode::Unattended, &mut *prompt)?.run(&job)?;

        report.moved += moved.moved.len();
        report.refreshed.push(source);
    }

    tracing::info!(
        refreshed = report.refreshed.len(),
        skipped = report.skipped.len(),
        moved = report.moved,
        "refresh finished"
    );
    Ok(report)
}
