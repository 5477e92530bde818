// Concurrent channel lookups over a bounded worker pool

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::debug;

use super::{Channel, ChannelRequest, ChannelResolver};
use crate::core::error::Result;

impl ChannelResolver {
    /// Resolve every name concurrently and return the channels in input order.
    ///
    /// The first failure aborts the outstanding workers and is returned; no
    /// partial results are kept.
    pub async fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Channel>> {
        let names = names.iter().map(|n| n.as_ref().to_string()).collect();
        self.resolve_all_at(names, false, 0).await
    }

    pub(crate) async fn resolve_all_at(
        &self,
        names: Vec<String>,
        find_trend_source: bool,
        depth: usize,
    ) -> Result<Vec<Channel>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let total = names.len();
        let workers = self.options.max_workers.clamp(1, total);
        debug!("Resolving {} channels with {} workers", total, workers);

        // input queue: every assignment is queued before the workers start
        let (in_tx, in_rx) = mpsc::unbounded_channel::<(usize, String)>();
        for assignment in names.into_iter().enumerate() {
            // cannot fail while in_rx is held
            let _ = in_tx.send(assignment);
        }
        drop(in_tx);
        let in_rx = Arc::new(Mutex::new(in_rx));

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<(usize, Result<Channel>)>();

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let resolver = self.clone();
            let in_rx = Arc::clone(&in_rx);
            let out_tx = out_tx.clone();
            pool.spawn(async move {
                loop {
                    let next = { in_rx.lock().await.recv().await };
                    let Some((index, name)) = next else {
                        break;
                    };
                    let result = resolver
                        .resolve_at(ChannelRequest::parse(&name), find_trend_source, depth)
                        .await;
                    if out_tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(out_tx);

        let mut resolved = Vec::with_capacity(total);
        while let Some((index, result)) = out_rx.recv().await {
            match result {
                Ok(channel) => resolved.push((index, channel)),
                Err(e) => {
                    pool.abort_all();
                    return Err(e);
                }
            }
        }

        // surfaces worker panics
        while let Some(joined) = pool.join_next().await {
            joined?;
        }

        resolved.sort_by_key(|(index, _)| *index);
        Ok(resolved.into_iter().map(|(_, channel)| channel).collect())
    }
}
