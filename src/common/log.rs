use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;
use tracing_tree::time::Uptime;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "quicklaunch=info,warn";

/// Installs the global subscriber. Output is a span tree on stderr. Calling
/// this twice is harmless; the second call leaves the first subscriber in
/// place.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let tree = HierarchicalLayer::new(2)
        .with_targets(true)
        .with_bracketed_fields(true)
        .with_deferred_spans(true)
        .with_timer(Uptime::default());
    let _ = tracing_subscriber::registry().with(filter).with(tree).try_init();
}
