//! Document text extraction (OCR) interface and polling protocol.
//!
//! The OCR service is asynchronous: a job is started against a stored
//! document, polled until it settles, then its result pages are fetched.
//! [`wait_for_transcript`] drives that loop with a caller-supplied
//! [`PollPolicy`]; sleeping goes through [`Sleeper`] so the host decides how
//! time passes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the uploaded document lives, e.g. an object-store bucket and key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLocation {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Succeeded,
    Failed,
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Page,
    Line,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub block_type: BlockType,
    #[serde(default)]
    pub text: String,
}

/// One page of job results. `next_token` is set while more pages remain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPage {
    pub blocks: Vec<TextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Extraction service error: {0}")]
    Service(String),

    #[error("Text detection job {0} failed")]
    JobFailed(JobId),

    #[error("Text detection job {job} still running after {waited:?} ({attempts} polls)")]
    PollTimeout {
        job: JobId,
        waited: Duration,
        attempts: u32,
    },
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// An OCR backend.
pub trait DocumentExtractor {
    fn start(&mut self, document: &[u8], location: &DocumentLocation)
        -> Result<JobId, ExtractionError>;

    fn status(&mut self, job: &JobId) -> Result<JobStatus, ExtractionError>;

    fn fetch_page(
        &mut self,
        job: &JobId,
        next_token: Option<&str>,
    ) -> Result<ExtractionPage, ExtractionError>;
}

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ---------------------------------------------------------------------------
// Polling policy
// ---------------------------------------------------------------------------

/// Exponential backoff bounded by an overall timeout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Total time allowed to sleep before giving up.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            timeout: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    /// Delay before poll number `attempt + 1` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
        let scaled = self.initial_delay.as_secs_f64() * factor;
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Poll until the job settles or the policy's timeout would be exceeded.
pub fn wait_for_completion<E, S>(
    extractor: &mut E,
    job: &JobId,
    policy: &PollPolicy,
    sleeper: &mut S,
) -> Result<(), ExtractionError>
where
    E: DocumentExtractor + ?Sized,
    S: Sleeper + ?Sized,
{
    let mut waited = Duration::ZERO;
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match extractor.status(job)? {
            JobStatus::Succeeded => {
                debug!(%job, attempts, ?waited, "extraction job succeeded");
                return Ok(());
            }
            JobStatus::Failed => {
                warn!(%job, attempts, "extraction job failed");
                return Err(ExtractionError::JobFailed(job.clone()));
            }
            JobStatus::InProgress => {
                let delay = policy.delay_for(attempts - 1);
                if waited + delay > policy.timeout {
                    return Err(ExtractionError::PollTimeout {
                        job: job.clone(),
                        waited,
                        attempts,
                    });
                }
                sleeper.sleep(delay);
                waited += delay;
            }
        }
    }
}

/// Fetch every result page of a finished job, following next tokens.
pub fn collect_pages<E>(extractor: &mut E, job: &JobId) -> Result<Vec<ExtractionPage>, ExtractionError>
where
    E: DocumentExtractor + ?Sized,
{
    let mut pages = vec![extractor.fetch_page(job, None)?];
    while let Some(token) = pages.last().and_then(|p| p.next_token.clone()) {
        pages.push(extractor.fetch_page(job, Some(&token))?);
    }
    Ok(pages)
}

/// Concatenate every `LINE` block, each followed by a newline, in document
/// order across all pages.
pub fn assemble_transcript(pages: &[ExtractionPage]) -> String {
    pages
        .iter()
        .flat_map(|p| p.blocks.iter())
        .filter(|b| b.block_type == BlockType::Line)
        .fold(String::new(), |mut acc, b| {
            acc.push_str(&b.text);
            acc.push('\n');
            acc
        })
}

/// Start a job, wait for it, and return the plain-text transcript.
pub fn extract_transcript<E, S>(
    extractor: &mut E,
    document: &[u8],
    location: &DocumentLocation,
    policy: &PollPolicy,
    sleeper: &mut S,
) -> Result<String, ExtractionError>
where
    E: DocumentExtractor + ?Sized,
    S: Sleeper + ?Sized,
{
    let job = extractor.start(document, location)?;
    info!(%job, bucket = %location.bucket, key = %location.key, "text detection started");
    wait_for_transcript(extractor, &job, policy, sleeper)
}

/// Wait for an already-started job and return its transcript.
pub fn wait_for_transcript<E, S>(
    extractor: &mut E,
    job: &JobId,
    policy: &PollPolicy,
    sleeper: &mut S,
) -> Result<String, ExtractionError>
where
    E: DocumentExtractor + ?Sized,
    S: Sleeper + ?Sized,
{
    wait_for_completion(extractor, job, policy, sleeper)?;
    let pages = collect_pages(extractor, job)?;
    Ok(assemble_transcript(&pages))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
