use crate::error::InitError;
use crate::formatter::SageFormatter;
use crate::layer::SageLayer;
use tracing::Subscriber;
use tracing_subscriber::filter::{Filtered, LevelFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Registry;

/// Configuration of the globally installed subscriber.
///
/// **Fields**
/// - `max_level`: most verbose level that reaches the Sage layer.
/// - `enable_console`: if `true`, a human-readable
///   `tracing_subscriber::fmt::Layer` writing to stderr is added next to the
///   JSON output on stdout.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub max_level: LevelFilter,
    pub enable_console: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            max_level: LevelFilter::TRACE,
            enable_console: false,
        }
    }
}

/// [`SageLayer`] writing to `make_writer` that only sees events at or
/// above `config.max_level`.
pub fn filtered_layer<S, W>(
    formatter: SageFormatter,
    make_writer: W,
    config: &LayerConfig,
) -> Filtered<SageLayer<W>, LevelFilter, S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    SageLayer::new(formatter)
        .with_writer(make_writer)
        .with_filter(config.max_level)
}

/// Install a global `tracing` subscriber that writes Sage JSON lines to
/// stdout.
///
/// **Parameters**
/// - `formatter`: [`SageFormatter`] carrying the environment metadata.
/// - `config`: [`LayerConfig`] controlling level filtering and the optional
///   console layer.
///
/// **Errors**
///
/// [`InitError::AlreadyInstalled`] if another global subscriber was set
/// earlier in the process.
pub fn init_tracing_with_config(
    formatter: SageFormatter,
    config: LayerConfig,
) -> Result<(), InitError> {
    let layer = filtered_layer(formatter, std::io::stdout, &config);

    // The two subscriber shapes have different types, so each branch
    // installs its own.
    if config.enable_console {
        let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        let subscriber = Registry::default().with(layer).with(console);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Install the subscriber with [`LayerConfig::default`].
pub fn init_tracing(formatter: SageFormatter) -> Result<(), InitError> {
    init_tracing_with_config(formatter, LayerConfig::default())
}

/// Build the formatter from the `SAGE_*` process variables and install it
/// with default settings. This is the recommended entrypoint for typical
/// services.
pub fn init_tracing_from_env() -> Result<(), InitError> {
    let formatter = SageFormatter::from_env()?;
    init_tracing(formatter)
}
