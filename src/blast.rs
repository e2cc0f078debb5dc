//! NCBI BLAST URL API client
//!
//! Three calls against `Blast.cgi`:
//! ```text
//! Submit  POST CMD=Put&PROGRAM=blastn&DATABASE=nt&QUERY=...   -> "RID = <token>"
//! Poll    GET  CMD=Get&RID=<token>&FORMAT_OBJECT=SearchInfo  -> "Status=<value>"
//! Fetch   GET  CMD=Get&RID=<token>&FORMAT_TYPE=Text          -> text report
//! ```
//!
//! [`wait_for_report`] drives one job through its lifecycle
//! (Submitted -> Waiting* -> Ready | Failed | timed out) against any
//! [`BlastClient`], so it can be exercised without the network.

use anyhow::{Context, Result};
use std::time::Duration;

use crate::error::PipelineError;

pub const NCBI_BLAST_URL: &str = "https://blast.ncbi.nlm.nih.gov/Blast.cgi";

const TOOL_NAME: &str = "contigblast";
const SNIPPET_LEN: usize = 500;

/// Parameters of a search submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub program: String,
    pub database: String,
    /// FASTA text of the query.
    pub query: String,
    /// Entrez organism filter, e.g. `txid2[ORGN]`.
    pub entrez_query: Option<String>,
}

impl SubmitRequest {
    /// A blastn search against nt.
    pub fn blastn_nt(query: String, entrez_query: Option<String>) -> Self {
        Self {
            program: "blastn".to_string(),
            database: "nt".to_string(),
            query,
            entrez_query,
        }
    }
}

/// What the service returned for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub rid: String,
    /// Estimated seconds until the search completes, when reported.
    pub rtoe: Option<u64>,
}

/// Job state as reported by a status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    /// Not finished; carries the raw status text (`WAITING`, `UNKNOWN`, ...).
    Waiting(String),
    Ready {
        /// `ThereAreHits=yes|no`, when present.
        has_hits: Option<bool>,
    },
    Failed,
}

/// An alignment service: submit a query, poll its status, fetch its report.
pub trait BlastClient {
    fn submit(&self, request: &SubmitRequest) -> Result<Submission>;

    fn poll(&self, rid: &str) -> Result<SearchStatus>;

    fn fetch(&self, rid: &str) -> Result<String>;
}

// ============================================================================
// Response parsing
// ============================================================================

/// Value of the first `<key> = <value>` / `<key>=<value>` line.
fn find_value<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    body.lines().find_map(|line| {
        let rest = line.trim().strip_prefix(key)?;
        let value = rest.trim_start().strip_prefix('=')?;
        value.split_whitespace().next()
    })
}

/// Extracts the job identifier from a submission response.
pub fn parse_rid(body: &str) -> Option<String> {
    find_value(body, "RID").map(str::to_string)
}

/// Extracts the estimated time of execution (seconds), if present.
pub fn parse_rtoe(body: &str) -> Option<u64> {
    find_value(body, "RTOE").and_then(|v| v.parse().ok())
}

/// Interprets a SearchInfo response.
pub fn parse_status(body: &str) -> SearchStatus {
    match find_value(body, "Status") {
        Some("READY") => SearchStatus::Ready {
            has_hits: find_value(body, "ThereAreHits").map(|v| v.eq_ignore_ascii_case("yes")),
        },
        Some("FAILED") => SearchStatus::Failed,
        Some(other) => SearchStatus::Waiting(other.to_string()),
        None => SearchStatus::Waiting(String::new()),
    }
}

fn snippet(body: &str) -> String {
    let end = body
        .char_indices()
        .nth(SNIPPET_LEN)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    body[..end].trim().to_string()
}

// ============================================================================
// NCBI client
// ============================================================================

/// Blocking client for the public NCBI BLAST endpoint.
#[derive(Debug, Clone)]
pub struct NcbiBlast {
    pub base_url: String,
    /// Contact address sent with every request, as NCBI asks of API users.
    pub email: Option<String>,
    pub request_timeout: Duration,
}

impl Default for NcbiBlast {
    fn default() -> Self {
        Self {
            base_url: NCBI_BLAST_URL.to_string(),
            email: None,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl NcbiBlast {
    fn get(&self, params: &[(&str, &str)]) -> Result<String> {
        let mut request = ureq::get(&self.base_url).timeout(self.request_timeout);
        for (key, value) in params {
            request = request.query(*key, *value);
        }
        request = request.query("TOOL", TOOL_NAME);
        if let Some(ref email) = self.email {
            request = request.query("EMAIL", email);
        }

        match request.call() {
            Ok(response) => Ok(response.into_string()?),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                anyhow::bail!("BLAST request returned HTTP {}: {}", code, snippet(&body))
            }
            Err(e) => Err(e).with_context(|| format!("BLAST request failed: {}", self.base_url)),
        }
    }
}

impl BlastClient for NcbiBlast {
    fn submit(&self, request: &SubmitRequest) -> Result<Submission> {
        let mut form: Vec<(&str, &str)> = vec![
            ("CMD", "Put"),
            ("PROGRAM", request.program.as_str()),
            ("DATABASE", request.database.as_str()),
            ("QUERY", request.query.as_str()),
            ("TOOL", TOOL_NAME),
        ];
        if let Some(ref entrez) = request.entrez_query {
            form.push(("ENTREZ_QUERY", entrez.as_str()));
        }
        if let Some(ref email) = self.email {
            form.push(("EMAIL", email.as_str()));
        }

        let response = ureq::post(&self.base_url)
            .timeout(self.request_timeout)
            .send_form(&form);
        let body = match response {
            Ok(response) => response.into_string()?,
            Err(ureq::Error::Status(code, response)) => {
                // Rejected queries and throttling come back as 4xx/5xx with the reason in the body.
                let body = response.into_string().unwrap_or_default();
                return Err(PipelineError::SubmissionFailure {
                    snippet: format!("HTTP {}: {}", code, snippet(&body)),
                }
                .into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("BLAST submission failed: {}", self.base_url));
            }
        };

        match parse_rid(&body) {
            Some(rid) => Ok(Submission { rid, rtoe: parse_rtoe(&body) }),
            None => Err(PipelineError::SubmissionFailure { snippet: snippet(&body) }.into()),
        }
    }

    fn poll(&self, rid: &str) -> Result<SearchStatus> {
        let body = self.get(&[("CMD", "Get"), ("RID", rid), ("FORMAT_OBJECT", "SearchInfo")])?;
        Ok(parse_status(&body))
    }

    fn fetch(&self, rid: &str) -> Result<String> {
        self.get(&[("CMD", "Get"), ("RID", rid), ("FORMAT_TYPE", "Text")])
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Fixed-interval polling with a wall-clock ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollConfig {
    /// Short truncated queries: 5 s interval, 5 min ceiling.
    pub const TRUNCATED: PollConfig = PollConfig {
        interval: Duration::from_secs(5),
        timeout: Duration::from_secs(300),
    };

    /// Full-length contigs: 20 s interval, 15 min ceiling.
    pub const FULL_LENGTH: PollConfig = PollConfig {
        interval: Duration::from_secs(20),
        timeout: Duration::from_secs(900),
    };
}

/// Polls `rid` until it is ready, then fetches the text report.
///
/// `sleep` is called between polls with the configured interval. Elapsed time
/// is the sum of the intervals slept; once another interval would exceed the
/// ceiling the job is abandoned with [`PipelineError::Timeout`] and no fetch
/// is made.
pub fn wait_for_report<C, S>(client: &C, rid: &str, config: &PollConfig, mut sleep: S) -> Result<String>
where
    C: BlastClient + ?Sized,
    S: FnMut(Duration),
{
    let mut elapsed = Duration::ZERO;
    let mut polls = 0usize;

    loop {
        polls += 1;
        match client.poll(rid)? {
            SearchStatus::Ready { has_hits } => {
                log::debug!("        {} ready after {} polls ({}s)", rid, polls, elapsed.as_secs());
                if has_hits == Some(false) {
                    log::warn!("BLAST reports no hits for {}", rid);
                }
                return client.fetch(rid);
            }
            SearchStatus::Failed => {
                return Err(PipelineError::RemoteFailure {
                    rid: rid.to_string(),
                    status: "FAILED".to_string(),
                }
                .into());
            }
            SearchStatus::Waiting(status) => {
                if elapsed + config.interval > config.timeout {
                    return Err(PipelineError::Timeout {
                        rid: rid.to_string(),
                        waited_secs: elapsed.as_secs(),
                    }
                    .into());
                }
                log::debug!("        {} status {:?}, {}s elapsed", rid, status, elapsed.as_secs());
                sleep(config.interval);
                elapsed += config.interval;
            }
        }
    }
}
