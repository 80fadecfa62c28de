//! Console logging.
//!
//! Level ladder (`HDRCALIB_LOG` overrides when set):
//! - default: info
//! - `-v`:    debug
//! - `-vv`:   trace for this crate, dependencies stay at info

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "HDRCALIB_LOG";

fn build_filter(verbosity: u8) -> EnvFilter {
    match verbosity {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("info,hdrcalib=trace"),
    }
}

pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| build_filter(verbosity));

    // A second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_ladder() {
        let quiet = build_filter(0).to_string();
        assert!(quiet.contains("info") && !quiet.contains("debug"));
        assert!(build_filter(1).to_string().contains("debug"));
        assert!(build_filter(2).to_string().contains("hdrcalib=trace"));
        assert!(build_filter(5).to_string().contains("hdrcalib=trace"));
    }

    #[test]
    fn init_twice_is_harmless() {
        init(0);
        init(1);
    }
}
