//! Folder hierarchy construction and bulk upload
//!
//! Builds the destination tree in the file store and streams every
//! harvested attachment into it, one at a time, reporting incremental
//! progress. A single attachment's failure is logged and skipped; the
//! run continues and the final stats carry the failure count.
//!
//! Uploads are strictly sequential: each one must reference an
//! already-created parent folder id, and the progress counter must
//! advance monotonically.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::categorize::MONTH_NAMES;
use crate::drive::FileStore;
use crate::gmail::{MailSource, decode_base64};
use crate::models::{AttachmentDescriptor, EmailDetail, Progress};

/// Name of the subfolder for emails whose date did not parse.
const UNDATED_FOLDER: &str = "No-Date";

/// How the destination tree is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeMode {
    /// Every attachment goes directly under the destination folder.
    Flat,
    /// Destination folder -> year subfolders -> "NN - Month" subfolders.
    ByDate,
}

/// Statistics from one organize run.
#[derive(Debug, Default, Clone)]
pub struct OrganizeStats {
    /// Attachments uploaded successfully.
    pub uploaded: usize,
    /// Attachments skipped after a fetch or upload failure.
    pub failed: usize,
    /// Remote folders created.
    pub folders_created: usize,
    /// Duration of the run.
    pub duration_ms: u64,
}

impl OrganizeStats {
    /// True when at least one attachment was dropped.
    pub fn is_degraded(&self) -> bool {
        self.failed > 0
    }
}

/// Folder ids created during one run, keyed by (parent id, name).
///
/// Lives for exactly one `organize` call, so a folder with the same
/// name under the same parent is created at most once per run. Nothing
/// survives the run; a rerun cannot reuse folders from a prior one.
struct FolderCache {
    ids: HashMap<(Option<String>, String), String>,
}

impl FolderCache {
    fn new() -> Self {
        Self {
            ids: HashMap::new(),
        }
    }

    /// Return the folder's id, creating it remotely on first sight.
    fn ensure(
        &mut self,
        store: &dyn FileStore,
        name: &str,
        parent_id: Option<&str>,
        stats: &mut OrganizeStats,
    ) -> Result<String> {
        let key = (parent_id.map(str::to_string), name.to_string());
        if let Some(id) = self.ids.get(&key) {
            return Ok(id.clone());
        }

        let node = store
            .create_folder(name, parent_id)
            .with_context(|| format!("Failed to create folder {:?}", name))?;
        stats.folders_created += 1;
        self.ids.insert(key, node.id.clone());
        Ok(node.id)
    }
}

/// Attachments grouped for the dated layout: years in encounter order,
/// months ascending by their two-digit key.
struct DatedGroups<'a> {
    year_order: Vec<String>,
    months_by_year: HashMap<String, BTreeMap<String, Vec<&'a AttachmentDescriptor>>>,
    undated: Vec<&'a AttachmentDescriptor>,
}

fn group_by_date(details: &[EmailDetail]) -> DatedGroups<'_> {
    let mut groups = DatedGroups {
        year_order: Vec::new(),
        months_by_year: HashMap::new(),
        undated: Vec::new(),
    };

    for detail in details {
        match detail.year_month() {
            Some((year, month)) => {
                let year_key = year.to_string();
                if !groups.months_by_year.contains_key(&year_key) {
                    groups.year_order.push(year_key.clone());
                }
                groups
                    .months_by_year
                    .entry(year_key)
                    .or_default()
                    .entry(format!("{:02}", month))
                    .or_default()
                    .extend(detail.attachments.iter());
            }
            None => groups.undated.extend(detail.attachments.iter()),
        }
    }

    groups
}

/// Organize all harvested attachments into the destination folder.
///
/// Creating the destination (or a year/month subfolder) is fatal to the
/// run: nothing can be placed without its parent. Everything per
/// attachment is not: a failed content fetch or upload logs, counts,
/// and moves on.
///
/// `progress` fires after every upload attempt, success or failure;
/// `processed` reaches `total` exactly at completion. Completion of
/// this function signals the run finished, not that every item
/// succeeded; consult the returned stats for per-item outcomes.
pub fn organize(
    source: &dyn MailSource,
    store: &dyn FileStore,
    details: &[EmailDetail],
    destination: &str,
    mode: OrganizeMode,
    mut progress: impl FnMut(Progress),
) -> Result<OrganizeStats> {
    let start = Instant::now();
    let mut stats = OrganizeStats::default();
    let mut cache = FolderCache::new();

    let total: usize = details.iter().map(|d| d.attachments.len()).sum();
    let mut tracker = Progress::new(total);

    info!(
        "Organizing {} attachments into {:?} ({:?} layout)",
        total, destination, mode
    );

    let root_id = cache.ensure(store, destination, None, &mut stats)?;

    match mode {
        OrganizeMode::Flat => {
            for detail in details {
                for attachment in &detail.attachments {
                    upload_one(
                        source,
                        store,
                        attachment,
                        &root_id,
                        &mut stats,
                        &mut tracker,
                        &mut progress,
                    );
                }
            }
        }
        OrganizeMode::ByDate => {
            let groups = group_by_date(details);

            for year_key in &groups.year_order {
                let year_id = cache.ensure(store, year_key, Some(&root_id), &mut stats)?;

                for (month_key, attachments) in &groups.months_by_year[year_key] {
                    let month_id = cache.ensure(store, month_key, Some(&year_id), &mut stats)?;

                    // Renamed after creation so name-sorted listings
                    // stay in chronological order.
                    let display_name = format!("{} - {}", month_key, month_display(month_key));
                    if let Err(e) = store.rename(&month_id, &display_name) {
                        warn!("Failed to rename month folder {:?}: {}", month_key, e);
                    }

                    for attachment in attachments {
                        upload_one(
                            source,
                            store,
                            attachment,
                            &month_id,
                            &mut stats,
                            &mut tracker,
                            &mut progress,
                        );
                    }
                }
            }

            if !groups.undated.is_empty() {
                let undated_id = cache.ensure(store, UNDATED_FOLDER, Some(&root_id), &mut stats)?;
                for attachment in &groups.undated {
                    upload_one(
                        source,
                        store,
                        attachment,
                        &undated_id,
                        &mut stats,
                        &mut tracker,
                        &mut progress,
                    );
                }
            }
        }
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Organize finished: {} uploaded, {} failed, {} folders in {}ms",
        stats.uploaded, stats.failed, stats.folders_created, stats.duration_ms
    );
    Ok(stats)
}

/// Fetch, decode, and upload one attachment, then advance progress.
///
/// Runs for every attachment exactly once; the progress counter moves
/// whether or not the item succeeded, so the total is never decremented.
fn upload_one(
    source: &dyn MailSource,
    store: &dyn FileStore,
    attachment: &AttachmentDescriptor,
    parent_id: &str,
    stats: &mut OrganizeStats,
    tracker: &mut Progress,
    progress: &mut impl FnMut(Progress),
) {
    match fetch_and_upload(source, store, attachment, parent_id) {
        Ok(()) => stats.uploaded += 1,
        Err(e) => {
            warn!("Skipping attachment {:?}: {}", attachment.filename, e);
            stats.failed += 1;
        }
    }

    tracker.processed += 1;
    debug!(
        "Progress: {}/{} ({}%)",
        tracker.processed,
        tracker.total,
        tracker.percent()
    );
    progress(*tracker);
}

fn fetch_and_upload(
    source: &dyn MailSource,
    store: &dyn FileStore,
    attachment: &AttachmentDescriptor,
    parent_id: &str,
) -> Result<()> {
    let payload = source.get_attachment(&attachment.message_id, &attachment.attachment_id)?;
    let bytes = decode_base64(&payload).context("Attachment payload is not valid base64")?;
    store.upload(parent_id, &attachment.filename, &bytes)
}

/// "03" -> "March". Falls back to the raw key for an out-of-range
/// month, which can only come from a malformed grouping key.
fn month_display(month_key: &str) -> &str {
    month_key
        .parse::<usize>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .map(|m| MONTH_NAMES[m - 1])
        .unwrap_or(month_key)
}
