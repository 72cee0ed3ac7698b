//! Spreadsheet analysis over the OpenAI chat API
//!
//! The model call is a black box: text in, text out. The deterministic
//! half lives here so it can run and be tested without the network:
//! metric extraction from CSV content (header keyword matching, number
//! cleaning) and the context rendering handed to the model.

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::error::FetchError;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4";

const SYSTEM_PROMPT: &str = "You are a financial analyst expert. Analyze the following financial data and provide insights.
Focus on:
- Revenue trends and growth rates
- Profit margins and their changes
- Key performance indicators
- Notable patterns or anomalies
- Business insights and recommendations

Provide specific numbers and percentages when relevant. Be concise but thorough.
If the data doesn't contain certain metrics, focus on the available information.";

static REVENUE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)revenue|sales|income|turnover").unwrap());
static PROFIT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)profit|earnings|ebitda|net income").unwrap());
static PERIOD_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)period|date|month|quarter|year").unwrap());
static MARGIN_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)margin|profit %|markup").unwrap());

/// Metrics extracted from one spreadsheet.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MetricTable {
    pub periods: Vec<String>,
    pub revenue: Vec<f64>,
    pub profit: Vec<f64>,
    /// Fractions, not percentages (0.12 = 12%).
    pub margins: Vec<f64>,
}

impl MetricTable {
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
            && self.revenue.is_empty()
            && self.profit.is_empty()
            && self.margins.is_empty()
    }
}

/// Identified column positions within one header row.
#[derive(Debug, Default)]
struct ColumnIndices {
    period: Option<usize>,
    revenue: Option<usize>,
    profit: Option<usize>,
    margins: Option<usize>,
}

impl ColumnIndices {
    fn identify(headers: &[&str]) -> Self {
        let mut indices = Self::default();
        for (index, header) in headers.iter().enumerate() {
            if PERIOD_HEADER.is_match(header) {
                indices.period = Some(index);
            }
            if REVENUE_HEADER.is_match(header) {
                indices.revenue = Some(index);
            }
            if PROFIT_HEADER.is_match(header) {
                indices.profit = Some(index);
            }
            if MARGIN_HEADER.is_match(header) {
                indices.margins = Some(index);
            }
        }
        indices
    }

    fn any(&self) -> bool {
        self.period.is_some()
            || self.revenue.is_some()
            || self.profit.is_some()
            || self.margins.is_some()
    }
}

/// Extract financial metrics from CSV text.
///
/// The first row is the header; columns are identified by keyword and
/// every following non-empty row contributes one value per identified
/// column. Unrecognized content yields an empty table, not an error.
pub fn extract_metrics(csv: &str) -> MetricTable {
    let mut lines = csv.lines().filter(|l| !l.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return MetricTable::default();
    };
    let headers: Vec<&str> = header_line.split(',').map(str::trim).collect();
    let indices = ColumnIndices::identify(&headers);
    if !indices.any() {
        return MetricTable::default();
    }

    let mut metrics = MetricTable::default();
    for line in lines {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if let Some(i) = indices.period {
            metrics
                .periods
                .push(cells.get(i).copied().unwrap_or("").to_string());
        }
        if let Some(i) = indices.revenue {
            metrics
                .revenue
                .push(parse_number(cells.get(i).copied().unwrap_or("")));
        }
        if let Some(i) = indices.profit {
            metrics
                .profit
                .push(parse_number(cells.get(i).copied().unwrap_or("")));
        }
        if let Some(i) = indices.margins {
            metrics
                .margins
                .push(parse_number(cells.get(i).copied().unwrap_or("")));
        }
    }
    metrics
}

/// Parse a number out of spreadsheet formatting.
///
/// Strips currency symbols, separators, and spaces; a trailing `%`
/// divides by 100. Anything unparsable becomes 0.
fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '₹' | '$' | ',') && !c.is_whitespace())
        .collect();

    if let Some(stripped) = cleaned.strip_suffix('%') {
        return stripped.parse::<f64>().map(|v| v / 100.0).unwrap_or(0.0);
    }
    cleaned.parse().unwrap_or(0.0)
}

/// Render the metrics as the plain-text context handed to the model.
pub fn render_context(metrics: &MetricTable) -> String {
    if metrics.periods.is_empty() {
        return "No time period information found in the data.".to_string();
    }

    let mut context = String::from("Financial Data Analysis:\n\n");

    context.push_str("Time Periods:\n");
    context.push_str(&metrics.periods.join(", "));
    context.push_str("\n\n");

    if !metrics.revenue.is_empty() {
        context.push_str("Revenue Data:\n");
        for (period, value) in metrics.periods.iter().zip(&metrics.revenue) {
            context.push_str(&format!("{}: {}\n", period, format_currency(*value)));
        }
        context.push('\n');
    }

    if !metrics.profit.is_empty() {
        context.push_str("Profit Data:\n");
        for (period, value) in metrics.periods.iter().zip(&metrics.profit) {
            context.push_str(&format!("{}: {}\n", period, format_currency(*value)));
        }
        context.push('\n');
    }

    if !metrics.margins.is_empty() {
        context.push_str("Profit Margins:\n");
        for (period, value) in metrics.periods.iter().zip(&metrics.margins) {
            context.push_str(&format!("{}: {:.2}%\n", period, value * 100.0));
        }
        context.push('\n');
    }

    context
}

/// Indian-notation currency formatting: crores and lakhs.
fn format_currency(value: f64) -> String {
    if value >= 10_000_000.0 {
        format!("₹{:.2} Cr", value / 10_000_000.0)
    } else if value >= 100_000.0 {
        format!("₹{:.2} L", value / 100_000.0)
    } else {
        format!("₹{:.2}", value)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Client for the natural-language analysis service.
pub struct AnalysisClient {
    api_key: String,
}

impl AnalysisClient {
    /// Load the API key from the environment.
    ///
    /// A missing key is a configuration error raised here, before any
    /// network call is attempted.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;
        Ok(Self { api_key })
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Ask the model one question about the rendered metrics context.
    pub fn analyze(&self, context: &str, query: &str) -> Result<String> {
        let request = serde_json::json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Here is the financial data:\n\n{}\n\nAnalyze this data and answer: {}",
                        context, query
                    ),
                },
            ],
            "temperature": 0.3,
            "max_tokens": 1000,
        });

        let mut response = match ureq::post(OPENAI_URL)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&request)
        {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(FetchError::new("analysis", status).into());
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to send analysis request")),
        };

        let chat: ChatResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse analysis response")?;

        let Some(content) = chat.choices.into_iter().next().and_then(|c| c.message.content)
        else {
            bail!("No analysis received from the model");
        };
        Ok(content)
    }
}
