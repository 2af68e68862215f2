use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

fn requested_level(verbose: u8) -> Option<LevelFilter> {
    match verbose {
        0 => None,
        1 => Some(LevelFilter::INFO),
        2 => Some(LevelFilter::DEBUG),
        _ => Some(LevelFilter::TRACE),
    }
}

/// Raise the default level of `directives` to `requested` without lowering it.
/// Target-specific directives are kept as written.
fn raise_default(directives: &str, requested: LevelFilter) -> String {
    let mut found_default = false;
    let mut parts: Vec<String> = directives
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<LevelFilter>() {
            Ok(configured) => {
                found_default = true;
                configured.max(requested).to_string()
            }
            Err(_) => part.to_owned(),
        })
        .collect();
    if !found_default {
        parts.push(requested.to_string());
    }
    parts.join(",")
}

/// `RUST_LOG` wins; otherwise the configured level, raised by each `-v`.
fn filter(config: &LoggingConfig, verbose: u8) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directives = match requested_level(verbose) {
        Some(requested) => raise_default(&config.level, requested),
        None => config.level.clone(),
    };
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(config: &LoggingConfig, verbose: u8) {
    let registry = tracing_subscriber::registry().with(filter(config, verbose));
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
