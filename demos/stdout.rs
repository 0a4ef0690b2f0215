use tracing::{error, info, warn};

use sage_formatter::init::{init_tracing_with_config, LayerConfig};
use sage_formatter::SageFormatter;

// SAGE_ENV=prod SAGE_SYSTEM=auth cargo run --example stdout
fn main() {
    let formatter = match SageFormatter::from_env() {
        Ok(formatter) => formatter,
        Err(e) => {
            eprintln!("invalid SAGE_* configuration: {}", e);
            std::process::exit(1);
        }
    };

    let config = LayerConfig {
        enable_console: true,
        ..Default::default()
    };
    if let Err(e) = init_tracing_with_config(formatter, config) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    info!("starting service");
    warn!(attempts = 3, "slow upstream");

    let err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
    let err: &(dyn std::error::Error + 'static) = &err;
    error!(user_id = 42, error = err, "authentication failed");
}
