// Channel resolution: registry fast path, raw, trend and composite channels

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{
    channel_tokens, has_trend_suffix, Channel, ChannelRegistry, ChannelRequest, ChannelType,
    MINUTE_TREND_RATE, SECOND_TREND_RATE,
};
use crate::client::{ChannelQuery, CisClient};
use crate::core::error::{Result, SummaryError};
use crate::models::{ChannelConfig, SummaryMode};
use crate::BoxFuture;

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Per-lookup timeout handed to the remote query.
    pub timeout: Duration,
    /// Upper bound on concurrent lookups in one batch.
    pub max_workers: usize,
    /// Look up the raw source of trend channels and inherit its metadata.
    pub find_trend_source: bool,
    pub max_depth: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions::from(&ChannelConfig::default())
    }
}

impl From<&ChannelConfig> for ResolverOptions {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_workers: config.max_workers.max(1),
            find_trend_source: config.find_trend_source,
            max_depth: config.max_depth,
        }
    }
}

/// Turns channel requests into registered [`Channel`] records.
#[derive(Clone)]
pub struct ChannelResolver {
    registry: Arc<ChannelRegistry>,
    query: Option<Arc<dyn ChannelQuery>>,
    mode: SummaryMode,
    pub(crate) options: ResolverOptions,
}

impl fmt::Debug for ChannelResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelResolver")
            .field("channels", &self.registry.len())
            .field("query", &self.query.is_some())
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish()
    }
}

impl ChannelResolver {
    pub fn new(registry: Arc<ChannelRegistry>, mode: SummaryMode) -> Self {
        Self {
            registry,
            query: None,
            mode,
            options: ResolverOptions::default(),
        }
    }

    /// Build a resolver from configuration, attaching a [`CisClient`] when a
    /// query URL is configured.
    pub fn from_config(
        config: &ChannelConfig,
        mode: SummaryMode,
        registry: Arc<ChannelRegistry>,
    ) -> Self {
        let resolver = Self::new(registry, mode).with_options(ResolverOptions::from(config));
        match &config.query_url {
            Some(url) => resolver.with_query(Arc::new(CisClient::new(url.clone()))),
            None => resolver,
        }
    }

    pub fn with_query(mut self, query: Arc<dyn ChannelQuery>) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn mode(&self) -> SummaryMode {
        self.mode
    }

    /// Resolve one request, registering a new channel if needed.
    pub async fn resolve(&self, request: impl Into<ChannelRequest>) -> Result<Channel> {
        let request = request.into();
        let label = request.to_string();
        self.resolve_at(request, self.options.find_trend_source, 0)
            .await
            .map_err(|e| match e {
                SummaryError::DepthExceeded => SummaryError::Recursion { request: label },
                e => e,
            })
    }

    /// Resolve a stored channel record by identity. When the registry does
    /// not know it yet, the record itself is registered as-is.
    pub async fn adopt(&self, channel: Channel) -> Result<Channel> {
        let mut found = self
            .registry
            .sieve(&channel.name, channel.kind.as_ref(), channel.sample_rate, true);
        if found.len() > 1 {
            return Err(SummaryError::AmbiguousChannel {
                request: channel.ndsname(),
                candidates: found.iter().map(Channel::describe).collect(),
            });
        }
        match found.pop() {
            Some(existing) => Ok(existing),
            None => Ok(self.registry.register(channel)),
        }
    }

    pub(crate) fn resolve_at(
        &self,
        request: ChannelRequest,
        find_trend_source: bool,
        depth: usize,
    ) -> BoxFuture<'_, Result<Channel>> {
        Box::pin(async move {
            if depth > self.options.max_depth {
                return Err(SummaryError::DepthExceeded);
            }

            let mut found = self
                .registry
                .sieve(&request.name, request.kind.as_ref(), request.sample_rate, true);
            if found.len() > 1 {
                return Err(SummaryError::AmbiguousChannel {
                    request: request.to_string(),
                    candidates: found.iter().map(Channel::describe).collect(),
                });
            }
            if let Some(channel) = found.pop() {
                return Ok(channel);
            }

            let tokens = channel_tokens(&request.name);
            let is_trend = has_trend_suffix(&request.name)
                || request.kind.as_ref().is_some_and(ChannelType::is_trend);

            let new = match tokens.len() {
                0 => {
                    debug!("No channel pattern in '{}', using bare record", request);
                    bare_channel(&request)
                }
                1 if !is_trend => self.build_raw(&request).await,
                1 => self.build_trend(&request, find_trend_source, depth).await?,
                _ => self.build_composite(&request, tokens, depth).await?,
            };

            let stored = self.registry.register(new);
            match self
                .resolve_at(ChannelRequest::from(&stored), find_trend_source, depth + 1)
                .await
            {
                Err(SummaryError::DepthExceeded) => Err(SummaryError::Recursion {
                    request: request.to_string(),
                }),
                other => other,
            }
        })
    }

    async fn build_raw(&self, request: &ChannelRequest) -> Channel {
        let Some(query) = &self.query else {
            return bare_channel(request);
        };

        match query.query(&request.name, self.options.timeout).await {
            Ok(meta) => {
                let mut channel = meta.into_channel(&request.name);
                if request.kind.is_some() {
                    channel.kind = request.kind.clone();
                }
                channel
            }
            Err(e) => {
                debug!("Channel query for {} failed ({}), using bare record", request, e);
                bare_channel(request)
            }
        }
    }

    async fn build_trend(
        &self,
        request: &ChannelRequest,
        find_trend_source: bool,
        depth: usize,
    ) -> Result<Channel> {
        let kind = request.kind.clone().unwrap_or_else(|| self.mode.default_trend());
        let mut channel = Channel::new(&request.name).with_kind(Some(kind.clone()));

        if find_trend_source {
            let source_name = request.name.split('.').next().unwrap_or(&request.name);
            match self
                .resolve_at(ChannelRequest::parse(source_name), true, depth + 1)
                .await
            {
                Ok(source) => channel.inherit_from(&source),
                Err(SummaryError::AmbiguousChannel { .. }) => {
                    debug!("Source of trend {} is ambiguous, metadata not inherited", request);
                }
                Err(e) => return Err(e),
            }
        }

        channel.sample_rate = match kind {
            ChannelType::MTrend => Some(MINUTE_TREND_RATE),
            ChannelType::STrend => Some(SECOND_TREND_RATE),
            _ => request.sample_rate,
        };
        Ok(channel)
    }

    async fn build_composite(
        &self,
        request: &ChannelRequest,
        tokens: Vec<String>,
        depth: usize,
    ) -> Result<Channel> {
        let parts = self.resolve_all_at(tokens, false, depth + 1).await?;

        let ifos: BTreeSet<String> = parts
            .iter()
            .filter_map(Channel::ifo)
            .filter(|ifo| !ifo.is_empty())
            .collect();

        let mut channel = bare_channel(request);
        if !ifos.is_empty() {
            channel.ifo = Some(ifos.into_iter().collect());
        }
        channel.subchannels = parts;
        Ok(channel)
    }
}

fn bare_channel(request: &ChannelRequest) -> Channel {
    Channel::new(&request.name)
        .with_kind(request.kind.clone())
        .with_sample_rate(request.sample_rate)
}
