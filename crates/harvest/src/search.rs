//! Message harvesting pipeline
//!
//! Resolves a criterion into a mail-store query, pages through the
//! search results, and expands every hit into an [`EmailDetail`].
//!
//! The page walk is deliberately blocking and non-streaming: the caller
//! sorts the complete result set by date, so nothing useful can happen
//! before the last page arrives.

use anyhow::Result;
use log::{debug, info};
use rayon::prelude::*;

use crate::gmail::{MailSource, extract_detail};
use crate::models::{EmailDetail, MessageId, SearchCriterion};

/// Result of one harvest.
///
/// Per-message failures are dropped from `details`, never fatal;
/// `failed_messages` is the explicit degraded-result indicator.
#[derive(Debug, Default)]
pub struct HarvestOutcome {
    /// Matching messages, sorted by descending date.
    pub details: Vec<EmailDetail>,
    /// Messages whose detail fetch failed and were dropped.
    pub failed_messages: usize,
}

impl HarvestOutcome {
    /// Total attachments across all harvested messages.
    pub fn attachment_count(&self) -> usize {
        self.details.iter().map(|d| d.attachments.len()).sum()
    }
}

/// Collect every message id matching the criterion.
///
/// The query always conjoins `has:attachment`. Pages are followed until
/// the continuation token is absent; a failure on any page aborts the
/// whole search with no partial result.
pub fn search_message_ids(
    source: &dyn MailSource,
    criterion: &SearchCriterion,
) -> Result<Vec<MessageId>> {
    let query = format!("{} has:attachment", criterion.predicate());
    debug!("Search query: {}", query);

    let mut ids: Vec<MessageId> = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = source.search_page(&query, page_token.as_deref())?;

        if let Some(refs) = page.messages {
            ids.extend(refs.into_iter().map(|r| MessageId::new(r.id)));
        }

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(ids)
}

/// Harvest every matching message into an [`EmailDetail`].
///
/// Detail fetches are independent, so they run as an unordered
/// concurrent batch; each failure is isolated to its own message and
/// never cancels a sibling. The date sort happens after all fetches
/// resolve, producing a deterministic final order.
pub fn search_emails(
    source: &dyn MailSource,
    criterion: &SearchCriterion,
) -> Result<HarvestOutcome> {
    let ids = search_message_ids(source, criterion)?;
    info!(
        "Found {} messages with attachments matching {:?}",
        ids.len(),
        criterion.value
    );

    let results: Vec<Option<EmailDetail>> = ids
        .par_iter()
        .map(|id| extract_detail(source, id))
        .collect();

    let mut outcome = HarvestOutcome::default();
    for result in results {
        match result {
            Some(detail) => outcome.details.push(detail),
            None => outcome.failed_messages += 1,
        }
    }

    outcome.details.sort_by(EmailDetail::cmp_by_date_desc);

    if outcome.failed_messages > 0 {
        info!(
            "Harvest degraded: {} of {} messages dropped",
            outcome.failed_messages,
            ids.len()
        );
    }

    Ok(outcome)
}
