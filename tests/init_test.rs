use sage_formatter::init::{init_tracing, init_tracing_with_config, LayerConfig};
use sage_formatter::{InitError, SageFormatter};
use tracing_subscriber::filter::LevelFilter;

// Only one global subscriber per process, so this binary holds one test.
#[test]
fn second_install_is_rejected() {
    let config = LayerConfig {
        max_level: LevelFilter::INFO,
        enable_console: false,
    };
    init_tracing_with_config(SageFormatter::default(), config).unwrap();
    tracing::info!(attempt = 1, "installed");

    let err = init_tracing(SageFormatter::default()).unwrap_err();
    assert!(matches!(err, InitError::AlreadyInstalled(_)));
}
