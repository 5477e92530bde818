// In-memory channel query used by the resolver and dispatcher tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::client::{ChannelMetadata, ChannelQuery, QueryError};
use crate::BoxFuture;

#[derive(Default)]
pub struct MockQuery {
    records: HashMap<String, ChannelMetadata>,
    delays: HashMap<String, Duration>,
    failure: Mutex<Option<QueryError>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockQuery {
    pub fn with(mut self, meta: ChannelMetadata) -> Self {
        self.records.insert(meta.name.clone(), meta);
        self
    }

    pub fn delayed(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Fail every query with `error`.
    pub fn failing(self, error: QueryError) -> Self {
        *self.failure.lock().unwrap() = Some(error);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of queries seen running at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ChannelQuery for MockQuery {
    fn query<'a>(
        &'a self,
        name: &'a str,
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<ChannelMetadata, QueryError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = self.delays.get(name).copied().unwrap_or(Duration::from_millis(5));
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let failure = self.failure.lock().unwrap().as_ref().map(|e| match e {
                QueryError::Network(m) => QueryError::Network(m.clone()),
                QueryError::Value(m) => QueryError::Value(m.clone()),
                QueryError::Credential(m) => QueryError::Credential(m.clone()),
            });
            if let Some(err) = failure {
                return Err(err);
            }

            self.records
                .get(name)
                .cloned()
                .ok_or_else(|| QueryError::Value(format!("unknown channel {}", name)))
        })
    }
}
