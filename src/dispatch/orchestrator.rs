//! Fan-out of one encoded batch to many storage objects.
//!
//! The same encoded [`MultiRequest`] is submitted to every target object at
//! once. Each object's reply is classified and decoded independently, on the
//! storage side's execution context, into that object's own outcome; one bad
//! object never affects the others.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::DispatchConfig;
use crate::dispatch::completion::{Completion, CompletionOutcome};
use crate::dispatch::store::{ECANCELED, ObjectStore};
use crate::error::{Result, VecfindError};
use crate::protocol::{MultiRequest, MultiResponse};

/// Final state of one object's call.
#[derive(Debug)]
pub enum ObjectOutcome {
    /// The call was never submitted.
    NotSubmitted(VecfindError),
    /// Reply decoded.
    Succeeded(MultiResponse),
    /// Positive return code with an empty reply: nothing found.
    Empty,
    /// Non-positive return code from the storage side.
    Failed(i32),
    /// The reply could not be decoded or did not match the request.
    Malformed(VecfindError),
}

impl ObjectOutcome {
    /// Short label for summaries and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ObjectOutcome::NotSubmitted(_) => "not_submitted",
            ObjectOutcome::Succeeded(_) => "succeeded",
            ObjectOutcome::Empty => "empty",
            ObjectOutcome::Failed(_) => "failed",
            ObjectOutcome::Malformed(_) => "malformed",
        }
    }

    /// Decoded reply, if any.
    pub fn response(&self) -> Option<&MultiResponse> {
        match self {
            ObjectOutcome::Succeeded(response) => Some(response),
            _ => None,
        }
    }

    /// `Ok(Some(reply))` on success, `Ok(None)` when empty, an error otherwise.
    pub fn into_result(self) -> Result<Option<MultiResponse>> {
        match self {
            ObjectOutcome::Succeeded(response) => Ok(Some(response)),
            ObjectOutcome::Empty => Ok(None),
            ObjectOutcome::Failed(code) => Err(VecfindError::RemoteFailure(code)),
            ObjectOutcome::NotSubmitted(e) | ObjectOutcome::Malformed(e) => Err(e),
        }
    }
}

#[derive(Debug)]
enum Submission {
    Pending(Completion),
    Rejected(VecfindError),
}

/// Calls in flight, one per target object, in submission order.
#[derive(Debug)]
pub struct Batch {
    entries: Vec<(String, Submission)>,
    expected_responses: usize,
    verify_response_count: bool,
    started: Instant,
}

impl Batch {
    /// Number of target objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the batch targets no objects.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Target objects in submission order.
    pub fn object_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// Completion handle of `object_id`, if it was submitted.
    pub fn completion(&self, object_id: &str) -> Option<&Completion> {
        self.entries.iter().find_map(|(id, entry)| match entry {
            Submission::Pending(completion) if id == object_id => Some(completion),
            _ => None,
        })
    }

    /// Number of requests each reply must answer.
    pub fn expected_responses(&self) -> usize {
        self.expected_responses
    }
}

/// Per-object outcomes of a batch, in submission order.
#[derive(Debug)]
pub struct BatchOutcome {
    outcomes: Vec<(String, ObjectOutcome)>,
    elapsed: Duration,
}

/// Outcome counts of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub objects: usize,
    pub succeeded: usize,
    pub empty: usize,
    /// Includes objects that were never submitted.
    pub failed: usize,
    pub malformed: usize,
    pub not_submitted: usize,
    pub results: usize,
    pub elapsed_ms: u64,
}

impl BatchOutcome {
    /// Outcome of `object_id`.
    pub fn get(&self, object_id: &str) -> Option<&ObjectOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == object_id)
            .map(|(_, outcome)| outcome)
    }

    /// Outcomes in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObjectOutcome)> {
        self.outcomes
            .iter()
            .map(|(id, outcome)| (id.as_str(), outcome))
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Check if the batch targeted no objects.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of objects whose reply decoded.
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, ObjectOutcome::Succeeded(_)))
    }

    /// Number of objects that answered with an empty reply.
    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, ObjectOutcome::Empty))
    }

    /// Number of objects that failed, including those never submitted.
    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                ObjectOutcome::Failed(_) | ObjectOutcome::NotSubmitted(_)
            )
        })
    }

    /// Number of objects whose reply could not be decoded.
    pub fn malformed(&self) -> usize {
        self.count(|o| matches!(o, ObjectOutcome::Malformed(_)))
    }

    fn count(&self, pred: impl Fn(&ObjectOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Time from submission to the last completion.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Consume the outcome and return the per-object results.
    pub fn into_inner(self) -> Vec<(String, ObjectOutcome)> {
        self.outcomes
    }

    /// Count outcomes by kind.
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            objects: self.outcomes.len(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            ..Default::default()
        };
        for (_, outcome) in &self.outcomes {
            match outcome {
                ObjectOutcome::NotSubmitted(_) => {
                    summary.failed += 1;
                    summary.not_submitted += 1;
                }
                ObjectOutcome::Succeeded(response) => {
                    summary.succeeded += 1;
                    summary.results += response
                        .responses
                        .iter()
                        .map(|r| r.results.len())
                        .sum::<usize>();
                }
                ObjectOutcome::Empty => summary.empty += 1,
                ObjectOutcome::Failed(_) => summary.failed += 1,
                ObjectOutcome::Malformed(_) => summary.malformed += 1,
            }
        }
        summary
    }
}

/// Classify and decode one finished call.
pub fn classify(
    object_id: &str,
    outcome: CompletionOutcome,
    expected_responses: usize,
    verify_response_count: bool,
) -> ObjectOutcome {
    let CompletionOutcome {
        return_code,
        buffer,
    } = outcome;

    if return_code <= 0 {
        warn!("{object_id}: storage returned {return_code}");
        return ObjectOutcome::Failed(return_code);
    }
    if buffer.is_empty() {
        debug!("{object_id}: empty reply");
        return ObjectOutcome::Empty;
    }

    let decoded = MultiResponse::decode(&buffer).and_then(|response| {
        if verify_response_count {
            response.check_count(expected_responses)?;
        }
        Ok(response)
    });

    match decoded {
        Ok(response) => {
            debug!(
                "{object_id}: {} responses in {} bytes",
                response.len(),
                buffer.len()
            );
            ObjectOutcome::Succeeded(response)
        }
        Err(e) => {
            warn!("{object_id}: malformed reply of {} bytes: {e}", buffer.len());
            ObjectOutcome::Malformed(e)
        }
    }
}

/// Submits find_closest batches and gathers the replies.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: Arc<dyn ObjectStore>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher over `store`.
    pub fn new(store: Arc<dyn ObjectStore>, config: DispatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// The dispatcher configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Submit `encoded` to every object without waiting for replies.
    ///
    /// `encoded` must be an encoded [`MultiRequest`]; its leading count is
    /// the number of responses each reply must carry. Object identifiers
    /// must be unique. An object whose submission fails is recorded as
    /// [`ObjectOutcome::NotSubmitted`] and the others still go out.
    pub fn submit_all<S: AsRef<str>>(
        &self,
        objects: &[S],
        encoded: Arc<[u8]>,
        receive_capacity: u32,
    ) -> Result<Batch> {
        if encoded.len() < 4 {
            return Err(VecfindError::invalid_argument(format!(
                "encoded batch of {} bytes has no request count",
                encoded.len()
            )));
        }
        let expected_responses = LittleEndian::read_u32(&encoded[..4]) as usize;

        let mut seen = HashSet::with_capacity(objects.len());
        for object_id in objects {
            if !seen.insert(object_id.as_ref()) {
                return Err(VecfindError::invalid_argument(format!(
                    "object {} listed twice",
                    object_id.as_ref()
                )));
            }
        }

        let started = Instant::now();
        let entries = objects
            .iter()
            .map(|object_id| {
                let object_id = object_id.as_ref();
                let entry = match self.store.execute_async(
                    object_id,
                    &self.config.class,
                    &self.config.method,
                    Arc::clone(&encoded),
                    receive_capacity,
                ) {
                    Ok(completion) => Submission::Pending(completion),
                    Err(e) => {
                        warn!("{object_id}: submission failed: {e}");
                        Submission::Rejected(e)
                    }
                };
                (object_id.to_string(), entry)
            })
            .collect::<Vec<_>>();

        debug!(
            "submitted {} bytes x {} requests to {} objects",
            encoded.len(),
            expected_responses,
            entries.len()
        );

        Ok(Batch {
            entries,
            expected_responses,
            verify_response_count: self.config.verify_response_count,
            started,
        })
    }

    /// Block until every call in `batch` has resolved.
    ///
    /// Replies are decoded in completion callbacks, on whichever thread
    /// resolves each call. Nothing is retried.
    pub fn await_all(&self, batch: Batch) -> BatchOutcome {
        let Batch {
            entries,
            expected_responses,
            verify_response_count,
            started,
        } = batch;

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut object_ids = Vec::with_capacity(entries.len());
        let mut slots: Vec<Option<ObjectOutcome>> = Vec::with_capacity(entries.len());
        let mut in_flight = 0;

        for (index, (object_id, entry)) in entries.into_iter().enumerate() {
            match entry {
                Submission::Pending(completion) => {
                    let tx = tx.clone();
                    let id = object_id.clone();
                    completion.on_complete(move |outcome| {
                        let outcome =
                            classify(&id, outcome, expected_responses, verify_response_count);
                        // The receiver only goes away once every result is in.
                        let _ = tx.send((index, outcome));
                    });
                    slots.push(None);
                    in_flight += 1;
                }
                Submission::Rejected(e) => slots.push(Some(ObjectOutcome::NotSubmitted(e))),
            }
            object_ids.push(object_id);
        }
        drop(tx);

        for _ in 0..in_flight {
            match rx.recv() {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(_) => break,
            }
        }

        Self::finish(object_ids, slots, started)
    }

    /// Async counterpart of [`await_all`](Self::await_all): awaits every
    /// completion and decodes the replies on the awaiting task.
    pub async fn await_all_async(&self, batch: Batch) -> BatchOutcome {
        let Batch {
            entries,
            expected_responses,
            verify_response_count,
            started,
        } = batch;

        let pending = entries.into_iter().map(|(object_id, entry)| async move {
            let outcome = match entry {
                Submission::Pending(completion) => {
                    let outcome = completion.await;
                    classify(&object_id, outcome, expected_responses, verify_response_count)
                }
                Submission::Rejected(e) => ObjectOutcome::NotSubmitted(e),
            };
            (object_id, Some(outcome))
        });

        let (object_ids, slots) = futures::future::join_all(pending)
            .await
            .into_iter()
            .unzip();
        Self::finish(object_ids, slots, started)
    }

    /// Encode `request` once, send it to every object and wait for all replies.
    pub fn find_closest<S: AsRef<str>>(
        &self,
        objects: &[S],
        request: &MultiRequest,
    ) -> Result<BatchOutcome> {
        let encoded: Arc<[u8]> = Arc::from(request.encode()?);
        let batch = self.submit_all(objects, encoded, self.config.receive_capacity)?;
        Ok(self.await_all(batch))
    }

    /// Async counterpart of [`find_closest`](Self::find_closest).
    pub async fn find_closest_async<S: AsRef<str>>(
        &self,
        objects: &[S],
        request: &MultiRequest,
    ) -> Result<BatchOutcome> {
        let encoded: Arc<[u8]> = Arc::from(request.encode()?);
        let batch = self.submit_all(objects, encoded, self.config.receive_capacity)?;
        Ok(self.await_all_async(batch).await)
    }

    fn finish(
        object_ids: Vec<String>,
        slots: Vec<Option<ObjectOutcome>>,
        started: Instant,
    ) -> BatchOutcome {
        let outcomes = object_ids
            .into_iter()
            .zip(slots)
            .map(|(object_id, slot)| {
                let outcome = slot.unwrap_or(ObjectOutcome::Failed(-ECANCELED));
                (object_id, outcome)
            })
            .collect();

        let outcome = BatchOutcome {
            outcomes,
            elapsed: started.elapsed(),
        };
        let summary = outcome.summary();
        info!(
            "batch done in {} ms: {} objects, {} succeeded, {} empty, {} failed, {} malformed",
            summary.elapsed_ms,
            summary.objects,
            summary.succeeded,
            summary.empty,
            summary.failed,
            summary.malformed
        );
        outcome
    }
}
