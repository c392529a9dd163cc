//! Instrumented in-process oracle
//!
//! Counts calls and concurrent in-flight calls. Selected keys can fail or
//! panic, every call can be delayed, and a token can be cancelled after a
//! number of calls.

use async_trait::async_trait;
use gqa_validator::error::OracleError;
use gqa_validator::models::Record;
use gqa_validator::services::{ClassificationOracle, OracleProposal, ReferenceDocs};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct FakeOracle {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    called_keys: Mutex<Vec<String>>,
    fail_keys: HashSet<String>,
    panic_keys: HashSet<String>,
    proposals: HashMap<String, OracleProposal>,
    delay: Duration,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl FakeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call for `key` with a transport error
    pub fn failing_on(mut self, key: &str) -> Self {
        self.fail_keys.insert(key.to_string());
        self
    }

    /// Panic inside the call for `key`
    pub fn panicking_on(mut self, key: &str) -> Self {
        self.panic_keys.insert(key.to_string());
        self
    }

    /// Answer `key` with `proposal` instead of the default echo
    pub fn with_proposal(mut self, key: &str, proposal: OracleProposal) -> Self {
        self.proposals.insert(key.to_string(), proposal);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cancel `token` once `calls` calls have completed
    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn called_keys(&self) -> Vec<String> {
        self.called_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClassificationOracle for FakeOracle {
    async fn classify(
        &self,
        record: &Record,
        _docs: &ReferenceDocs,
    ) -> Result<OracleProposal, OracleError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.called_keys.lock().unwrap().push(record.item_key.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let done = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after {
            if done >= *after {
                token.cancel();
            }
        }

        if self.panic_keys.contains(&record.item_key) {
            panic!("fake oracle blew up on {}", record.item_key);
        }
        if self.fail_keys.contains(&record.item_key) {
            return Err(OracleError::Transport("simulated outage".to_string()));
        }

        Ok(self
            .proposals
            .get(&record.item_key)
            .cloned()
            .unwrap_or_else(|| OracleProposal {
                l1_validated: record.l1.clone(),
                l2_validated: record.l2.clone(),
                l3_validated: record.l3.clone(),
                gender_validated: record.gender.clone(),
                primary_fop_validated: record.primary_fop.clone(),
                sub_sport_validated: record.sub_sport.clone(),
                corrected_columns: Vec::new(),
                reasoning: format!("{} looks right", record.item_key),
            }))
    }

    fn model(&self) -> &str {
        "fake-oracle"
    }
}
