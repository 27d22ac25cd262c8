//! Live results: recompute analytics as push events arrive.

use super::hub::{
    survey_channel, EventHub, PushEvent, DEFAULT_CAPACITY, NEW_RESPONSE, SURVEYS_CHANNEL,
    SURVEY_DELETED, SURVEY_UPDATED,
};
use crate::analysis::compute_analytics;
use crate::models::{AnalyticsData, Response};
use crate::source::{Snapshot, SurveySource};
use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// What applying an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Analytics were recomputed.
    Updated,
    /// Nothing changed: the event concerned another survey, or a reload
    /// failed and the previous results were kept.
    Ignored,
    /// The survey was deleted; stop following.
    Deleted,
}

/// Latest snapshot and analytics of the survey being watched.
#[derive(Debug)]
pub struct LiveResults {
    source: SurveySource,
    survey_id: String,
    snapshot: Snapshot,
    analytics: AnalyticsData,
}

impl LiveResults {
    pub fn new(source: SurveySource, survey_id: impl Into<String>, snapshot: Snapshot) -> Self {
        let analytics = compute_analytics(&snapshot.questions, &snapshot.responses);
        Self {
            source,
            survey_id: survey_id.into(),
            snapshot,
            analytics,
        }
    }

    pub fn survey_id(&self) -> &str {
        &self.survey_id
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn analytics(&self) -> &AnalyticsData {
        &self.analytics
    }

    /// Reload everything from the source and recompute.
    pub fn reload(&mut self) -> Result<()> {
        self.snapshot = self.source.load()?;
        self.recompute();
        Ok(())
    }

    /// Reload, keeping the current results when the source cannot be read.
    fn reload_or_keep(&mut self) -> bool {
        match self.reload() {
            Ok(()) => true,
            Err(e) => {
                warn!("Reload failed, keeping previous results: {:#}", e);
                false
            }
        }
    }

    fn reload_outcome(&mut self) -> Outcome {
        if self.reload_or_keep() {
            Outcome::Updated
        } else {
            Outcome::Ignored
        }
    }

    fn recompute(&mut self) {
        self.analytics = compute_analytics(&self.snapshot.questions, &self.snapshot.responses);
    }

    /// Apply a push event.
    ///
    /// A new response carried in the payload is appended; without one the
    /// source is reloaded. Survey updates reload, deletions end following.
    /// A failed reload is logged and leaves the results as they were.
    pub fn apply(&mut self, event: &PushEvent) -> Outcome {
        match event.event.as_str() {
            NEW_RESPONSE => match response_from_payload(&event.data) {
                Some(response) => {
                    debug!("Appending response {}", response.id);
                    self.snapshot.responses.push(response);
                    self.recompute();
                    Outcome::Updated
                }
                None => self.reload_outcome(),
            },
            SURVEY_UPDATED if self.concerns(event) => self.reload_outcome(),
            SURVEY_DELETED if self.concerns(event) => Outcome::Deleted,
            _ => Outcome::Ignored,
        }
    }

    fn concerns(&self, event: &PushEvent) -> bool {
        event.survey_id() == Some(self.survey_id.as_str())
    }
}

/// Extract a response from an event payload, either the payload itself or
/// its `response` field. Payloads without answers carry no response.
fn response_from_payload(data: &Value) -> Option<Response> {
    let candidate = data.get("response").unwrap_or(data);
    candidate.get("answers")?;
    match serde_json::from_value(candidate.clone()) {
        Ok(response) => Some(response),
        Err(e) => {
            warn!("Ignoring malformed response payload: {}", e);
            None
        }
    }
}

/// Read newline-delimited JSON events and publish them.
///
/// The hub is dropped when the input ends, which closes every subscription
/// once its buffered events are consumed.
async fn pump_events<R>(input: R, hub: EventHub) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut published = 0;

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read event stream")?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<PushEvent>(line) {
            Ok(event) => {
                debug!("Received {} on {}", event.event, event.channel);
                hub.publish(event);
                published += 1;
            }
            Err(e) => warn!("Skipping malformed event: {}", e),
        }
    }

    Ok(published)
}

/// Follow a survey: apply events from `input` until it ends or the survey is
/// deleted, calling `on_update` with the latest results after each change.
///
/// On deletion the reader task is cancelled, so an input that stays open
/// does not keep this from returning.
pub async fn follow<R, F>(input: R, mut results: LiveResults, mut on_update: F) -> Result<LiveResults>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    F: FnMut(&LiveResults) -> Result<()>,
{
    let hub = EventHub::new(DEFAULT_CAPACITY);
    let mut responses = hub.subscribe(survey_channel(results.survey_id()), NEW_RESPONSE);
    let mut updates = hub.subscribe(SURVEYS_CHANNEL, SURVEY_UPDATED);
    let mut deletions = hub.subscribe(SURVEYS_CHANNEL, SURVEY_DELETED);

    info!(
        "Following survey {} ({} subscriptions)",
        results.survey_id(),
        hub.subscriber_count()
    );
    let reader = tokio::spawn(pump_events(input, hub));
    let mut deleted = false;

    loop {
        let event = tokio::select! {
            biased;
            Some(event) = deletions.next() => event,
            Some(event) = updates.next() => event,
            Some(event) = responses.next() => event,
            else => break,
        };

        if responses.take_lagged() {
            warn!("Missed response events, reloading from source");
            results.reload_or_keep();
        }

        match results.apply(&event) {
            Outcome::Updated => on_update(&results)?,
            Outcome::Ignored => debug!("No change from {} on {}", event.event, event.channel),
            Outcome::Deleted => {
                warn!("Survey {} was deleted, stopping", results.survey_id());
                deleted = true;
                break;
            }
        }
    }

    drop((responses, updates, deletions));
    if deleted {
        reader.abort();
    }
    match reader.await {
        Ok(published) => info!("Processed {} events", published?),
        Err(e) if e.is_cancelled() => debug!("Event reader stopped"),
        Err(e) => return Err(e).context("Event reader task failed"),
    }

    Ok(results)
}
