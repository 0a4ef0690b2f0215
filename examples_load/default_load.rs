use std::io;
use std::time::Instant;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use sage_formatter::{EnvironmentMetadata, SageFormatter, SageLayer};

fn main() {
    let formatter = SageFormatter::with_metadata(EnvironmentMetadata {
        env: "load".to_string(),
        system: "default_load".to_string(),
        ..Default::default()
    })
    .expect("valid metadata");

    let layer = SageLayer::new(formatter).with_writer(io::sink);
    let failed = layer.failed_events.clone();
    let subscriber = Registry::default().with(layer);
    tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!(
        "default config: encoded {} events in {:?} (~{:.0} ev/s, {} failed)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64(),
        failed.load(std::sync::atomic::Ordering::Relaxed)
    );
}
