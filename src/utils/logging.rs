use std::path::PathBuf;

use directories::ProjectDirs;

pub fn local_logging_enabled() -> bool {
    cfg!(feature = "local-logging")
}

pub fn resolve_log_dir() -> Result<PathBuf, String> {
    ProjectDirs::from("com", "mediadownloader", "media-downloader")
        .map(|dirs| dirs.data_dir().join("logs"))
        .ok_or_else(|| "Failed to resolve the application data directory".to_string())
}

/// Default filter for a `-v` count, overridden by `RUST_LOG`
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "media_downloader=warn",
        1 => "media_downloader=info",
        2 => "media_downloader=debug",
        _ => "media_downloader=trace",
    }
}

/// Logs go to stderr so they never interleave with menu prompts on stdout
pub fn init_tracing(verbosity: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(verbosity).into());

    #[cfg(feature = "local-logging")]
    {
        use std::sync::OnceLock;
        use tracing_appender::non_blocking::WorkerGuard;

        static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

        let log_dir = match resolve_log_dir() {
            Ok(dir) => dir,
            Err(err) => {
                eprintln!("{err}");
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .try_init();
                return;
            }
        };

        if let Err(err) = std::fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create log directory: {err}");
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
            return;
        }

        let file_appender = tracing_appender::rolling::daily(&log_dir, "media-downloader.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .with_ansi(false)
            .try_init();
        return;
    }

    #[cfg(not(feature = "local-logging"))]
    {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(default_filter(0), "media_downloader=warn");
        assert_eq!(default_filter(2), "media_downloader=debug");
        assert_eq!(default_filter(9), "media_downloader=trace");
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(0);
        init_tracing(1);
    }
}
