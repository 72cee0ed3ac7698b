//! Integration tests for the harvest pipeline
//!
//! These tests drive the search and organize flows end to end against
//! in-memory fakes of the mail source and file store.

use anyhow::{Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use harvest::gmail::api::{
    GmailMessage, Header, MessagePart, MessagePayload, MessageRef, PartBody, SearchResponse,
};
use harvest::{
    EmailDetail, FileStore, FolderNode, MailSource, MessageId, OrganizeMode, Progress,
    SearchCriterion, organize, search_emails, search_message_ids,
};

/// One stored fake message: headers plus flat attachment leaves.
struct FakeMessage {
    subject: &'static str,
    from: &'static str,
    date: &'static str,
    attachments: Vec<(&'static str, &'static str)>,
}

/// In-memory MailSource serving canned pages and messages.
#[derive(Default)]
struct FakeMailSource {
    /// Message ids returned per page, in order.
    pages: Vec<Vec<&'static str>>,
    messages: HashMap<String, FakeMessage>,
    /// Message ids whose detail fetch fails.
    broken_messages: HashSet<String>,
    /// Attachment ids whose content fetch fails.
    broken_attachments: HashSet<String>,
    queries_seen: Mutex<Vec<String>>,
}

impl FakeMailSource {
    fn with_pages(pages: Vec<Vec<&'static str>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    fn add_message(
        &mut self,
        id: &'static str,
        subject: &'static str,
        from: &'static str,
        date: &'static str,
        attachments: Vec<(&'static str, &'static str)>,
    ) {
        self.messages.insert(
            id.to_string(),
            FakeMessage {
                subject,
                from,
                date,
                attachments,
            },
        );
    }
}

impl MailSource for FakeMailSource {
    fn search_page(&self, query: &str, page_token: Option<&str>) -> Result<SearchResponse> {
        self.queries_seen.lock().unwrap().push(query.to_string());

        let page_index: usize = match page_token {
            None => 0,
            Some(token) => token.parse().expect("fake page token"),
        };
        let refs = self.pages[page_index]
            .iter()
            .map(|id| MessageRef { id: id.to_string() })
            .collect();
        let next = if page_index + 1 < self.pages.len() {
            Some((page_index + 1).to_string())
        } else {
            None
        };

        Ok(SearchResponse {
            messages: Some(refs),
            next_page_token: next,
            result_size_estimate: None,
        })
    }

    fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        if self.broken_messages.contains(id.as_str()) {
            return Err(anyhow!("simulated detail failure for {}", id.as_str()));
        }
        let fake = self
            .messages
            .get(id.as_str())
            .ok_or_else(|| anyhow!("unknown message {}", id.as_str()))?;

        let headers = vec![
            Header {
                name: "Subject".to_string(),
                value: fake.subject.to_string(),
            },
            Header {
                name: "From".to_string(),
                value: fake.from.to_string(),
            },
            Header {
                name: "Date".to_string(),
                value: fake.date.to_string(),
            },
        ];
        let parts = fake
            .attachments
            .iter()
            .map(|(filename, attachment_id)| MessagePart {
                filename: Some(filename.to_string()),
                body: Some(PartBody {
                    attachment_id: Some(attachment_id.to_string()),
                    size: Some(64),
                    data: None,
                }),
                ..Default::default()
            })
            .collect();

        Ok(GmailMessage {
            id: id.as_str().to_string(),
            payload: Some(MessagePayload {
                headers: Some(headers),
                parts: Some(parts),
            }),
        })
    }

    fn get_attachment(&self, message_id: &MessageId, attachment_id: &str) -> Result<String> {
        if self.broken_attachments.contains(attachment_id) {
            return Err(anyhow!("simulated content failure for {}", attachment_id));
        }
        let content = format!("content of {}/{}", message_id.as_str(), attachment_id);
        Ok(URL_SAFE_NO_PAD.encode(content))
    }
}

#[derive(Debug, Default)]
struct FakeStoreState {
    /// (id, name, parent) for every folder created, in call order.
    folders: Vec<(String, String, Option<String>)>,
    /// (id, new_name) for every rename issued.
    renames: Vec<(String, String)>,
    /// (parent, name, byte length) for every successful upload.
    uploads: Vec<(String, String, usize)>,
    next_id: usize,
}

/// In-memory FileStore recording every call.
#[derive(Default)]
struct FakeFileStore {
    state: Mutex<FakeStoreState>,
    /// Filenames whose upload fails.
    broken_uploads: HashSet<String>,
}

impl FileStore for FakeFileStore {
    fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<FolderNode> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("folder-{}", state.next_id);
        state.folders.push((
            id.clone(),
            name.to_string(),
            parent_id.map(str::to_string),
        ));
        Ok(FolderNode {
            id,
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
        })
    }

    fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .renames
            .push((id.to_string(), new_name.to_string()));
        Ok(())
    }

    fn upload(&self, parent_id: &str, name: &str, bytes: &[u8]) -> Result<()> {
        if self.broken_uploads.contains(name) {
            return Err(anyhow!("simulated upload failure for {}", name));
        }
        self.state
            .lock()
            .unwrap()
            .uploads
            .push((parent_id.to_string(), name.to_string(), bytes.len()));
        Ok(())
    }

    fn list_folders(&self) -> Result<Vec<FolderNode>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .folders
            .iter()
            .map(|(id, name, parent)| FolderNode {
                id: id.clone(),
                name: name.clone(),
                parent_id: parent.clone(),
            })
            .collect())
    }

    fn move_folder(&self, _id: &str, _destination_id: &str) -> Result<()> {
        Ok(())
    }

    fn download(&self, _id: &str) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn list_spreadsheets(&self, _folder_id: &str) -> Result<Vec<harvest::drive::api::DriveFile>> {
        Ok(Vec::new())
    }
}

fn criterion(input: &str) -> SearchCriterion {
    SearchCriterion::parse(input).unwrap()
}

#[test]
fn test_pagination_accumulates_all_pages() {
    let source = FakeMailSource::with_pages(vec![
        vec!["m1", "m2", "m3"],
        vec!["m4", "m5", "m6"],
        vec!["m7"],
    ]);

    let ids = search_message_ids(&source, &criterion("gruhas.com")).unwrap();
    assert_eq!(ids.len(), 7);

    let unique: HashSet<&str> = ids.iter().map(|id| id.as_str()).collect();
    assert_eq!(unique.len(), 7);
}

#[test]
fn test_search_query_conjoins_attachment_term() {
    let source = FakeMailSource::with_pages(vec![vec![]]);
    search_message_ids(&source, &criterion("gruhas.com")).unwrap();

    let queries = source.queries_seen.lock().unwrap();
    assert_eq!(queries[0], "from:*@gruhas.com has:attachment");
}

#[test]
fn test_harvest_two_messages_sorted_descending() {
    let mut source = FakeMailSource::with_pages(vec![vec!["m1", "m2"]]);
    source.add_message(
        "m1",
        "Older report",
        "Accounts <accounts@gruhas.com>",
        "Mon, 05 Feb 2024 10:00:00 +0530",
        vec![("feb.xlsx", "a1")],
    );
    source.add_message(
        "m2",
        "Newer report",
        "Accounts <accounts@gruhas.com>",
        "Tue, 05 Mar 2024 10:00:00 +0530",
        vec![("mar.xlsx", "a2")],
    );

    let outcome = search_emails(&source, &criterion("gruhas.com")).unwrap();

    assert_eq!(outcome.details.len(), 2);
    assert_eq!(outcome.failed_messages, 0);
    assert_eq!(outcome.details[0].subject, "Newer report");
    assert_eq!(outcome.details[1].subject, "Older report");
    assert_eq!(outcome.details[0].from_name, "Accounts");
    assert_eq!(outcome.details[0].from_email, "accounts@gruhas.com");
    assert_eq!(outcome.attachment_count(), 2);
}

#[test]
fn test_harvest_isolates_failed_message() {
    let mut source = FakeMailSource::with_pages(vec![vec!["m1", "m2", "m3"]]);
    source.add_message(
        "m1",
        "First",
        "a@x.com",
        "Mon, 05 Feb 2024 10:00:00 +0000",
        vec![("one.pdf", "a1")],
    );
    source.add_message(
        "m3",
        "Third",
        "a@x.com",
        "Wed, 07 Feb 2024 10:00:00 +0000",
        vec![("three.pdf", "a3")],
    );
    source.broken_messages.insert("m2".to_string());

    let outcome = search_emails(&source, &criterion("x.com")).unwrap();

    assert_eq!(outcome.details.len(), 2);
    assert_eq!(outcome.failed_messages, 1);
}

#[test]
fn test_harvest_sorts_unparsable_dates_last() {
    let mut source = FakeMailSource::with_pages(vec![vec!["m1", "m2"]]);
    source.add_message(
        "m1",
        "Undated",
        "a@x.com",
        "not a real date",
        vec![("u.pdf", "a1")],
    );
    source.add_message(
        "m2",
        "Dated",
        "a@x.com",
        "Mon, 05 Feb 2024 10:00:00 +0000",
        vec![("d.pdf", "a2")],
    );

    let outcome = search_emails(&source, &criterion("x.com")).unwrap();

    assert_eq!(outcome.details[0].subject, "Dated");
    assert_eq!(outcome.details[1].subject, "Undated");
    assert_eq!(outcome.details[1].sort_key, None);
    // Unparsable dates pass through to the display unmodified.
    assert_eq!(outcome.details[1].display_date, "not a real date");
}

/// Build a detail directly, bypassing the mail source.
fn make_detail(date: &'static str, attachments: Vec<(&str, &str, &str)>) -> EmailDetail {
    let sort_key = chrono::DateTime::parse_from_rfc2822(date)
        .ok()
        .map(|dt| dt.timestamp_millis());
    EmailDetail {
        subject: "s".to_string(),
        from_name: "n".to_string(),
        from_email: "e@x.com".to_string(),
        raw_date: date.to_string(),
        sort_key,
        display_date: date.to_string(),
        attachments: attachments
            .into_iter()
            .map(|(filename, attachment_id, message_id)| harvest::AttachmentDescriptor {
                filename: filename.to_string(),
                attachment_id: attachment_id.to_string(),
                message_id: MessageId::new(message_id),
            })
            .collect(),
    }
}

#[test]
fn test_organize_dated_creates_each_folder_once() {
    let source = FakeMailSource::default();
    let store = FakeFileStore::default();

    // Two different emails, both March 2024: one year folder and one
    // month folder, created exactly once each.
    let details = vec![
        make_detail(
            "Fri, 15 Mar 2024 12:00:00 +0530",
            vec![("a.pdf", "a1", "m1")],
        ),
        make_detail(
            "Sat, 16 Mar 2024 12:00:00 +0530",
            vec![("b.pdf", "a2", "m2")],
        ),
    ];

    let stats = organize(
        &source,
        &store,
        &details,
        "Gruhas",
        OrganizeMode::ByDate,
        |_| {},
    )
    .unwrap();

    assert_eq!(stats.uploaded, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.folders_created, 3);
    assert!(!stats.is_degraded());

    let state = store.state.lock().unwrap();
    let names: Vec<&str> = state.folders.iter().map(|(_, name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["Gruhas", "2024", "03"]);

    // Month folder renamed to keep name-sorted listings chronological.
    assert_eq!(state.renames.len(), 1);
    assert_eq!(state.renames[0].1, "03 - March");

    // Both uploads landed in the month folder.
    let month_id = &state.folders[2].0;
    assert!(state.uploads.iter().all(|(parent, _, _)| parent == month_id));
}

#[test]
fn test_organize_dated_layout_structure() {
    let source = FakeMailSource::default();
    let store = FakeFileStore::default();

    let details = vec![
        make_detail(
            "Sat, 15 Jun 2024 12:00:00 +0530",
            vec![("jun.pdf", "a1", "m1")],
        ),
        make_detail(
            "Mon, 15 Jan 2024 12:00:00 +0530",
            vec![("jan.pdf", "a2", "m2")],
        ),
        make_detail(
            "Wed, 15 Mar 2023 12:00:00 +0530",
            vec![("old.pdf", "a3", "m3")],
        ),
    ];

    organize(
        &source,
        &store,
        &details,
        "Archive",
        OrganizeMode::ByDate,
        |_| {},
    )
    .unwrap();

    let state = store.state.lock().unwrap();

    // Root first; years in encounter order (2024 before 2023); months
    // within 2024 ascending (01 before 06).
    let names: Vec<&str> = state.folders.iter().map(|(_, name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["Archive", "2024", "01", "06", "2023", "03"]);

    // Year folders hang off the root, month folders off their year.
    let root_id = state.folders[0].0.clone();
    assert_eq!(state.folders[1].2.as_deref(), Some(root_id.as_str()));
    let year_2024_id = state.folders[1].0.clone();
    assert_eq!(state.folders[2].2.as_deref(), Some(year_2024_id.as_str()));
}

#[test]
fn test_organize_flat_uploads_under_root() {
    let source = FakeMailSource::default();
    let store = FakeFileStore::default();

    let details = vec![
        make_detail(
            "Fri, 15 Mar 2024 12:00:00 +0530",
            vec![("a.pdf", "a1", "m1"), ("b.pdf", "a2", "m1")],
        ),
        make_detail(
            "Mon, 15 Jan 2024 12:00:00 +0530",
            vec![("c.pdf", "a3", "m2")],
        ),
    ];

    let stats = organize(
        &source,
        &store,
        &details,
        "Everything",
        OrganizeMode::Flat,
        |_| {},
    )
    .unwrap();

    assert_eq!(stats.uploaded, 3);
    assert_eq!(stats.folders_created, 1);

    let state = store.state.lock().unwrap();
    let root_id = &state.folders[0].0;
    assert_eq!(state.uploads.len(), 3);
    assert!(state.uploads.iter().all(|(parent, _, _)| parent == root_id));
    assert!(state.renames.is_empty());
}

#[test]
fn test_organize_progress_is_monotonic_despite_failures() {
    let source = FakeMailSource::default();
    let mut store = FakeFileStore::default();
    store.broken_uploads.insert("bad.pdf".to_string());

    let details = vec![make_detail(
        "Fri, 15 Mar 2024 12:00:00 +0530",
        vec![
            ("ok1.pdf", "a1", "m1"),
            ("bad.pdf", "a2", "m1"),
            ("ok2.pdf", "a3", "m1"),
        ],
    )];

    let mut seen: Vec<Progress> = Vec::new();
    let stats = organize(
        &source,
        &store,
        &details,
        "Dest",
        OrganizeMode::ByDate,
        |p| seen.push(p),
    )
    .unwrap();

    assert_eq!(stats.uploaded, 2);
    assert_eq!(stats.failed, 1);
    assert!(stats.is_degraded());

    // One tick per attempt, non-decreasing, ending exactly at total.
    assert_eq!(seen.len(), 3);
    assert!(seen.windows(2).all(|w| w[0].processed <= w[1].processed));
    assert_eq!(seen.last().unwrap().processed, 3);
    assert_eq!(seen.last().unwrap().total, 3);
    assert!(seen.last().unwrap().is_complete());
    assert_eq!(seen.iter().filter(|p| p.is_complete()).count(), 1);
}

#[test]
fn test_organize_failed_attachment_fetch_is_skipped() {
    let mut source = FakeMailSource::default();
    source.broken_attachments.insert("a1".to_string());
    let store = FakeFileStore::default();

    let details = vec![make_detail(
        "Fri, 15 Mar 2024 12:00:00 +0530",
        vec![("gone.pdf", "a1", "m1"), ("kept.pdf", "a2", "m1")],
    )];

    let stats = organize(
        &source,
        &store,
        &details,
        "Dest",
        OrganizeMode::Flat,
        |_| {},
    )
    .unwrap();

    assert_eq!(stats.uploaded, 1);
    assert_eq!(stats.failed, 1);

    let state = store.state.lock().unwrap();
    assert_eq!(state.uploads.len(), 1);
    assert_eq!(state.uploads[0].1, "kept.pdf");
}

#[test]
fn test_organize_undated_emails_get_their_own_folder() {
    let source = FakeMailSource::default();
    let store = FakeFileStore::default();

    let mut undated = make_detail("Fri, 15 Mar 2024 12:00:00 +0530", vec![("u.pdf", "a1", "m1")]);
    undated.sort_key = None;

    let details = vec![
        make_detail(
            "Fri, 15 Mar 2024 12:00:00 +0530",
            vec![("dated.pdf", "a2", "m2")],
        ),
        undated,
    ];

    organize(
        &source,
        &store,
        &details,
        "Dest",
        OrganizeMode::ByDate,
        |_| {},
    )
    .unwrap();

    let state = store.state.lock().unwrap();
    let names: Vec<&str> = state.folders.iter().map(|(_, name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["Dest", "2024", "03", "No-Date"]);

    let no_date_id = &state.folders[3].0;
    let undated_upload = state.uploads.iter().find(|(_, name, _)| name == "u.pdf").unwrap();
    assert_eq!(&undated_upload.0, no_date_id);
}
