// A tab of plots processed state by state

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::plots::{PlotDefinition, PlotEntry, PlotQueue, PlotRegistry, SourceKind, SummaryPlot};
use super::source::{fft_params, DataSource, FftParams, SeriesKind};
use crate::channels::{is_channel_name, Channel};
use crate::core::error::{Result, SummaryError};
use crate::models::{SegdbErrorPolicy, SummaryConfig};
use crate::state::{SummaryContext, SummaryState};
use crate::utils::literal::Literal;

/// Plot types whose channels need time-series data.
pub const TIMESERIES_TYPES: &[&str] = &["timeseries", "spectrogram", "spectrum", "histogram"];
pub const STATEVECTOR_TYPES: &[&str] = &["statevector"];
pub const SPECTROGRAM_TYPES: &[&str] = &["spectrogram", "spectrum"];
pub const SPECTRUM_TYPES: &[&str] = &["spectrum"];
pub const SEGMENT_TYPES: &[&str] = &["segments"];
pub const TRIGGER_TYPES: &[&str] = &["triggers", "trigger-histogram", "trigger-rate"];

/// Row widths that divide a 12-column grid.
const LAYOUT_WIDTHS: [usize; 6] = [1, 2, 3, 4, 6, 12];

fn flag_operator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!=|[&!|]").expect("flag operator pattern is valid"))
}

fn option_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\W_]+").expect("option key pattern is valid"))
}

fn channel_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\A(?:[a-z]-)?[a-z]+\z").expect("channel type pattern is valid"))
}

/// Per-call processing options.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions<'a> {
    pub segdb_error: SegdbErrorPolicy,
    pub plot_queue: Option<&'a PlotQueue>,
    pub fft: FftParams,
}

impl<'a> ProcessOptions<'a> {
    pub fn from_config(config: &SummaryConfig) -> Self {
        Self {
            segdb_error: config.segdb_error,
            plot_queue: None,
            fft: fft_params(config),
        }
    }

    pub fn with_queue(mut self, queue: &'a PlotQueue) -> Self {
        self.plot_queue = Some(queue);
        self
    }
}

/// What [`StateTab::process_state`] did with the plots of one state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Plots drawn inline.
    pub processed: usize,
    /// Plots handed to the queue.
    pub queued: usize,
}

#[derive(Debug)]
pub struct StateTab {
    pub name: String,
    pub span: (f64, f64),
    pub states: Vec<SummaryState>,
    pub plots: Vec<PlotEntry>,
    pub plotdir: PathBuf,
    layout: Option<Vec<usize>>,
}

impl StateTab {
    pub fn new(name: impl Into<String>, span: (f64, f64), states: Vec<SummaryState>) -> Self {
        Self {
            name: name.into(),
            span,
            states,
            plots: Vec::new(),
            plotdir: PathBuf::from("plots"),
            layout: None,
        }
    }

    pub fn add_plot(&mut self, plot: Arc<dyn SummaryPlot>) {
        self.plots.push(PlotEntry::new(plot));
    }

    pub fn set_layout(&mut self, layout: &str) -> Result<()> {
        self.layout = Some(parse_layout(layout)?);
        Ok(())
    }

    /// Plots per row. Without an explicit layout this is one per row for 1
    /// or 3 plots and two per row otherwise; the last width repeats.
    pub fn layout(&self, state: Option<&str>) -> Vec<usize> {
        if let Some(layout) = &self.layout {
            return layout.clone();
        }
        match self.plots.iter().filter(|p| p.applies_to(state)).count() {
            1 | 3 => vec![1],
            _ => vec![2],
        }
    }

    /// Build a tab from the configuration section `section`.
    ///
    /// Integer keys are plot requests, `N-key` keys customise plot `N`, and
    /// `layout` sets the row widths. Channel sources are resolved through
    /// the run's resolver before any plot is built.
    pub async fn from_section(
        ctx: &SummaryContext,
        registry: &PlotRegistry,
        section: &str,
        span: (f64, f64),
        states: Vec<SummaryState>,
    ) -> Result<StateTab> {
        let config = &ctx.config;
        let options = config
            .section(section)
            .ok_or_else(|| SummaryError::Config(format!("No section '{}'", section)))?;

        let mut tab = StateTab::new(section, span, states);
        tab.plotdir = config.plots.outdir.clone();
        if let Some(layout) = options.get("layout") {
            tab.set_layout(layout).map_err(|e| {
                SummaryError::Config(format!("Cannot parse 'layout' for '{}' tab: {}", section, e))
            })?;
        }

        let mut requests: Vec<(usize, &str)> = options
            .items()
            .filter_map(|(key, value)| key.parse::<usize>().ok().map(|index| (index, value)))
            .collect();
        requests.sort_by_key(|(index, _)| *index);

        for (index, definition) in requests {
            let mut mods = plot_overrides(options.items(), index);
            let (sources, pdef) = split_definition(definition);
            let sources = expand_sources(config, sources);

            let plot_type = if let Some(plot_section) = config.section(pdef) {
                let plot_type = plot_section.get("type").ok_or_else(|| {
                    SummaryError::Config(format!(
                        "Section '{}' used by plot {} has no 'type'",
                        pdef, index
                    ))
                })?;
                for (key, value) in plot_section.items().filter(|(key, _)| *key != "type") {
                    mods.entry(key.to_string())
                        .or_insert_with(|| Literal::parse_or_string(value));
                }
                plot_type.to_string()
            } else if pdef.ends_with("-histogram") {
                let mut parts: Vec<&str> = pdef.rsplitn(3, '-').collect();
                parts.reverse();
                mods.entry("etg".to_string())
                    .or_insert_with(|| Literal::Str(parts[0].to_string()));
                if let Some(column) = parts.get(1) {
                    mods.entry("column".to_string())
                        .or_insert_with(|| Literal::Str(column.to_string()));
                }
                "trigger-histogram".to_string()
            } else if pdef.contains("-rate") {
                let etg = pdef.rsplit_once('-').map_or(pdef, |(etg, _)| etg);
                mods.entry("etg".to_string())
                    .or_insert_with(|| Literal::Str(etg.to_string()));
                "trigger-rate".to_string()
            } else {
                pdef.to_string()
            };

            let (channels, flags) = match registry.source_kind(&plot_type)? {
                SourceKind::Channels => (ctx.resolver.resolve_all(&sources).await?, Vec::new()),
                SourceKind::Flags => (Vec::new(), sources),
            };

            let plot_states: Vec<Option<String>> = if mods.remove("all_states").is_some() {
                vec![None]
            } else {
                tab.states.iter().map(|s| Some(s.name.clone())).collect()
            };

            for state in plot_states {
                let plot = registry.build(PlotDefinition {
                    plot_type: plot_type.clone(),
                    channels: channels.clone(),
                    flags: flags.clone(),
                    start: span.0,
                    end: span.1,
                    state,
                    outdir: tab.plotdir.clone(),
                    options: mods.clone(),
                })?;
                tab.add_plot(plot);
            }
        }

        debug!("Tab '{}' defines {} plots", tab.name, tab.plots.len());
        Ok(tab)
    }

    /// Distinct channels of plots of the given types, sorted by name.
    pub fn channels(&self, types: &[&str], state: Option<&str>, new_only: bool) -> Vec<Channel> {
        let mut out: BTreeMap<(String, String), Channel> = BTreeMap::new();
        for entry in self.selected(types, state, new_only) {
            for channel in entry.plot.channels() {
                out.entry((channel.name.clone(), channel.ndsname()))
                    .or_insert_with(|| channel.clone());
            }
        }
        out.into_values().collect()
    }

    /// Distinct flag names used by plots of the given types. Flag
    /// expressions are split on their operators.
    pub fn flags(&self, types: &[&str], state: Option<&str>, new_only: bool) -> Vec<String> {
        let mut out = BTreeSet::new();
        for entry in self.selected(types, state, new_only) {
            for expression in entry.plot.flags() {
                out.extend(
                    flag_operator_regex()
                        .split(expression)
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string),
                );
            }
        }
        out.into_iter().collect()
    }

    /// Distinct `(etg, channel)` pairs of new plots of the given types,
    /// sorted by channel name.
    pub fn triggers(&self, types: &[&str], state: Option<&str>) -> Vec<(String, Channel)> {
        let mut out: BTreeMap<(String, String, String), Channel> = BTreeMap::new();
        for entry in self.selected(types, state, true) {
            let Some(etg) = entry.plot.etg() else {
                warn!("{} plot has no trigger generator", entry.plot.plot_type());
                continue;
            };
            for channel in entry.plot.channels() {
                out.entry((channel.name.clone(), channel.ndsname(), etg.to_string()))
                    .or_insert_with(|| channel.clone());
            }
        }
        out.into_iter().map(|((_, _, etg), channel)| (etg, channel)).collect()
    }

    fn selected<'s>(
        &'s self,
        types: &'s [&str],
        state: Option<&'s str>,
        new_only: bool,
    ) -> impl Iterator<Item = &'s PlotEntry> + 's {
        self.plots.iter().filter(move |entry| {
            types.contains(&entry.plot.plot_type())
                && (!new_only || entry.new)
                && entry.applies_to(state)
        })
    }

    /// Load the data this tab needs for `state` and draw its new plots.
    pub async fn process_state(
        &mut self,
        ctx: &SummaryContext,
        state: &SummaryState,
        source: &dyn DataSource,
        options: &ProcessOptions<'_>,
    ) -> Result<ProcessReport> {
        info!("Processing '{}' state of '{}'", state.name, self.name);
        let scope = Some(state.name.as_str());
        let data = ctx.data.as_ref();

        for entry in &mut self.plots {
            if ctx.written_plots.contains(entry.plot.output_file()) {
                entry.new = false;
            }
        }

        let channels = self.channels(TIMESERIES_TYPES, scope, true);
        if !channels.is_empty() {
            info!("{} channels identified for TimeSeries", channels.len());
            source.timeseries(&channels, state, SeriesKind::TimeSeries, data).await?;
            debug!("All time-series data loaded");
        }

        let channels = self.channels(STATEVECTOR_TYPES, scope, true);
        if !channels.is_empty() {
            info!("{} channels identified as StateVectors", channels.len());
            source.timeseries(&channels, state, SeriesKind::StateVector, data).await?;
            debug!("All state-vector data loaded");
        }

        for channel in self.channels(SPECTROGRAM_TYPES, scope, true) {
            source.spectrogram(&channel, state, &options.fft, data).await?;
        }

        for channel in self.channels(SPECTRUM_TYPES, scope, true) {
            source.spectrum(&channel, state, &options.fft, data).await?;
        }

        let flags = self.flags(SEGMENT_TYPES, scope, true);
        if !flags.is_empty() {
            info!("{} data-quality flags identified for SegDB query", flags.len());
            match source.segments(&flags, state, options.segdb_error, data).await {
                Ok(()) => {}
                Err(e) if options.segdb_error == SegdbErrorPolicy::Ignore => {
                    warn!("Segment query for '{}' failed, continuing: {}", state.name, e);
                }
                Err(e) => return Err(e),
            }
        }

        for (etg, channel) in self.triggers(TRIGGER_TYPES, scope) {
            source.triggers(&etg, &channel, &state.active, data).await?;
        }

        let mut order: Vec<usize> = (0..self.plots.len())
            .filter(|&i| self.plots[i].new && self.plots[i].applies_to(scope))
            .collect();
        // stable: thread-unsafe plots first, definition order otherwise
        order.sort_by_key(|&i| self.plots[i].plot.is_threadsafe());

        let mut report = ProcessReport::default();
        for i in order {
            let plot = &self.plots[i].plot;
            if !ctx.written_plots.insert(plot.output_file()) {
                debug!("{} already scheduled", plot.output_file().display());
                continue;
            }
            match options.plot_queue {
                Some(queue) if plot.is_threadsafe() => {
                    queue.dispatch(Arc::clone(plot)).await;
                    report.queued += 1;
                }
                _ => {
                    plot.process(data)?;
                    debug!("{} written", plot.output_file().display());
                    report.processed += 1;
                }
            }
        }

        if report.queued > 0 {
            info!("{} plot processes queued", report.queued);
        }
        Ok(report)
    }
}

/// Parse a `layout` option: an integer or a list of integers (or of lists,
/// whose first value is used), each dividing a 12-column row.
pub fn parse_layout(value: &str) -> Result<Vec<usize>> {
    let literal = Literal::parse(value)?;
    let rows = match &literal {
        Literal::Int(_) => vec![literal.clone()],
        Literal::List(items) => items.clone(),
        other => {
            return Err(SummaryError::Config(format!(
                "layout must be integers, got {}",
                other
            )))
        }
    };

    rows.iter()
        .map(|row| {
            let width = match row {
                Literal::List(inner) => inner.first().and_then(Literal::as_int),
                other => other.as_int(),
            };
            match width.and_then(|w| usize::try_from(w).ok()) {
                Some(w) if LAYOUT_WIDTHS.contains(&w) => Ok(w),
                _ => Err(SummaryError::Config(format!(
                    "row width {} must be one of {:?} to fit a 12-column grid",
                    row, LAYOUT_WIDTHS
                ))),
            }
        })
        .collect()
}

/// `N-key = value` options for plot `index`, keys normalised to
/// lower-case words joined by `_`.
fn plot_overrides<'o>(
    items: impl Iterator<Item = (&'o str, &'o str)>,
    index: usize,
) -> BTreeMap<String, Literal> {
    let prefix = format!("{}-", index);
    items
        .filter_map(|(key, value)| {
            let option = key.strip_prefix(&prefix)?;
            let option = option_key_regex().replace_all(&option.to_lowercase(), "_").into_owned();
            Some((option, Literal::parse_or_string(value)))
        })
        .collect()
}

/// Split `<sources> <plot-def>` at the last whitespace or comma.
fn split_definition(definition: &str) -> (&str, &str) {
    let definition = definition.trim();
    match definition.rfind(|c: char| c.is_whitespace() || c == ',') {
        Some(at) => {
            let sep = definition[at..].chars().next().map_or(1, char::len_utf8);
            (definition[..at].trim(), &definition[at + sep..])
        }
        None => ("", definition),
    }
}

/// Expand a section reference to that section's `channels` option, then
/// split the sources on commas and newlines. A bare `,type` suffix stays
/// with the channel before it.
fn expand_sources(config: &SummaryConfig, sources: &str) -> Vec<String> {
    let sources = if !is_channel_name(sources) {
        config
            .section(sources)
            .and_then(|section| section.get("channels"))
            .unwrap_or(sources)
    } else {
        sources
    };

    let mut out: Vec<String> = Vec::new();
    for piece in sources.split([',', '\n']).map(str::trim).filter(|p| !p.is_empty()) {
        match out.last_mut() {
            Some(previous) if channel_type_regex().is_match(piece) && !previous.contains(',') => {
                previous.push(',');
                previous.push_str(piece);
            }
            _ => out.push(piece.to_string()),
        }
    }
    out
}
