use tokio::runtime::{Builder, Runtime};

/// Sizing of the tokio runtime that hosts the HTTP service.
///
/// Predictions run on the blocking pool, so `max_blocking_threads` bounds how
/// many can be in flight at once.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub max_blocking_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,       // Let tokio decide
            max_blocking_threads: 0, // Let tokio decide
        }
    }
}

pub fn create_runtime(config: &RuntimeConfig) -> std::io::Result<Runtime> {
    let mut builder = Builder::new_multi_thread();
    builder.enable_all().thread_name("moodlens-worker");

    if config.worker_threads > 0 {
        builder.worker_threads(config.worker_threads);
    }
    if config.max_blocking_threads > 0 {
        builder.max_blocking_threads(config.max_blocking_threads);
    }

    builder.build()
}
