//! sift - harvest Gmail attachments into organized Drive folders
//!
//! This is the CLI front end over the harvest crate: search for
//! messages with attachments from a sender, upload the attachments
//! into a Drive folder tree, or ask questions about spreadsheets
//! already organized there.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use std::sync::Arc;

use harvest::{
    AnalysisClient, DriveClient, FileStore, GmailClient, GoogleAuth, GoogleCredentials,
    OrganizeMode, SearchCriterion, categorize, extract_metrics, organize, render_context,
    search_emails,
};

#[derive(Debug, Parser)]
#[command(name = "sift")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List messages with attachments from a sender, newest first
    Search {
        /// Email address, domain, or company name
        sender: String,
        /// Show the categorized destination path for each attachment
        #[arg(long)]
        categorize: bool,
    },
    /// Upload all matching attachments into a Drive folder
    Organize {
        /// Email address, domain, or company name
        sender: String,
        /// Destination folder name (defaults to the sender input)
        #[arg(long)]
        dest: Option<String>,
        /// Nest uploads in year/month subfolders instead of one flat folder
        #[arg(long)]
        by_date: bool,
    },
    /// Ask a question about the spreadsheets in a Drive folder
    Analyze {
        /// Drive folder name (as created by `organize`)
        folder: String,
        /// The question to ask
        question: String,
    },
    /// Drop cached Google tokens
    Logout,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    config::init().context("Failed to initialize config directory")?;

    let cli = Cli::parse();
    match cli.command {
        Command::Search { sender, categorize } => run_search(&sender, categorize),
        Command::Organize {
            sender,
            dest,
            by_date,
        } => run_organize(&sender, dest.as_deref(), by_date),
        Command::Analyze { folder, question } => run_analyze(&folder, &question),
        Command::Logout => {
            auth()?.logout()?;
            println!("Cached tokens removed.");
            Ok(())
        }
    }
}

/// Load credentials and build the shared auth state.
///
/// Missing credentials stop everything here, before any network call.
fn auth() -> Result<Arc<GoogleAuth>> {
    let creds = GoogleCredentials::load().with_context(|| {
        match GoogleCredentials::default_credentials_path() {
            Some(path) => format!(
                "Google credentials not found. Place your OAuth client JSON at {} \
                 or set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET",
                path.display()
            ),
            None => "Google credentials not found".to_string(),
        }
    })?;
    Ok(Arc::new(GoogleAuth::new(creds.client_id, creds.client_secret)))
}

fn run_search(sender: &str, show_categories: bool) -> Result<()> {
    let criterion = SearchCriterion::parse(sender)?;
    let gmail = GmailClient::new(auth()?);

    let outcome = search_emails(&gmail, &criterion)?;
    if outcome.details.is_empty() {
        println!("No emails with attachments found for {:?}", sender);
        return Ok(());
    }

    println!(
        "Found {} emails with {} attachments:\n",
        outcome.details.len(),
        outcome.attachment_count()
    );
    for (index, detail) in outcome.details.iter().enumerate() {
        let sender_line = if detail.from_email.is_empty() {
            detail.from_name.clone()
        } else {
            format!("{} <{}>", detail.from_name, detail.from_email)
        };
        println!("{}. From: {}", index + 1, sender_line);
        println!("   Date: {} (IST)", detail.display_date);
        println!("   Subject: {}", detail.subject);
        for attachment in &detail.attachments {
            if show_categories {
                let path = categorize(&attachment.filename);
                println!("   - {} -> {}", attachment.filename, path.path());
            } else {
                println!("   - {}", attachment.filename);
            }
        }
        println!();
    }

    if outcome.failed_messages > 0 {
        println!(
            "Warning: {} message(s) could not be fetched and are not listed.",
            outcome.failed_messages
        );
    }
    Ok(())
}

fn run_organize(sender: &str, dest: Option<&str>, by_date: bool) -> Result<()> {
    let criterion = SearchCriterion::parse(sender)?;
    let auth = auth()?;
    let gmail = GmailClient::new(auth.clone());
    let drive = DriveClient::new(auth);

    let outcome = search_emails(&gmail, &criterion)?;
    if outcome.details.is_empty() {
        println!("Nothing to organize: no emails with attachments found.");
        return Ok(());
    }
    if outcome.failed_messages > 0 {
        warn!(
            "{} message(s) could not be fetched; their attachments will be missing",
            outcome.failed_messages
        );
    }

    let destination = dest.unwrap_or(sender);
    let mode = if by_date {
        OrganizeMode::ByDate
    } else {
        OrganizeMode::Flat
    };

    let bar = ProgressBar::new(outcome.attachment_count() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} ({percent}%) {msg}")
            .expect("static progress template"),
    );

    let stats = organize(&gmail, &drive, &outcome.details, destination, mode, |p| {
        bar.set_position(p.processed as u64);
    })?;
    bar.finish();

    println!(
        "Uploaded {} attachment(s) into {:?} ({} folder(s) created, {}ms).",
        stats.uploaded, destination, stats.folders_created, stats.duration_ms
    );
    if stats.is_degraded() {
        println!(
            "Warning: {} attachment(s) failed and were skipped; see the log for details.",
            stats.failed
        );
    }
    Ok(())
}

fn run_analyze(folder: &str, question: &str) -> Result<()> {
    // Fail on a missing API key before touching the network.
    let analysis = AnalysisClient::from_env()?;
    let drive = DriveClient::new(auth()?);

    let folder_node = drive
        .list_folders()?
        .into_iter()
        .find(|f| f.name == folder);
    let Some(folder_node) = folder_node else {
        bail!("No Drive folder named {:?} found", folder);
    };

    let files = drive.list_spreadsheets(&folder_node.id)?;
    if files.is_empty() {
        println!("No spreadsheet files found in {:?}.", folder);
        return Ok(());
    }

    for file in files {
        match analyze_file(&drive, &analysis, &file.id, question) {
            Ok(answer) => println!("Analysis of {}:\n{}\n", file.name, answer),
            Err(e) => {
                warn!("Failed to analyze {}: {}", file.name, e);
                println!("Failed to analyze {}; skipped.\n", file.name);
            }
        }
    }
    Ok(())
}

fn analyze_file(
    drive: &DriveClient,
    analysis: &AnalysisClient,
    file_id: &str,
    question: &str,
) -> Result<String> {
    let bytes = drive.download(file_id)?;
    let text = String::from_utf8(bytes).context("File content is not text; only CSV exports are supported")?;
    let metrics = extract_metrics(&text);
    if metrics.is_empty() {
        bail!("no recognizable financial columns");
    }
    analysis.analyze(&render_context(&metrics), question)
}
