//! Command implementations.

pub mod init;
pub mod process;
pub mod show;

pub use self::init::execute_init;
pub use self::process::execute_process;
pub use self::show::execute_show;

use crate::config::Config;
use crate::error::Result;
use crate::notifier::LogNotifier;
use lineage_engine::LineageProcessor;
use lineage_llm::ModelClient;
use lineage_store::{FsExtractionSource, SqliteStore};
use std::fs;
use std::sync::Arc;

/// Processor wired to the configured store and extraction source.
pub type CliProcessor<M> = LineageProcessor<M, SqliteStore, FsExtractionSource>;

/// Open the store and build a processor around `client`.
pub fn open_processor<M: ModelClient>(config: &Config, client: M) -> Result<CliProcessor<M>> {
    let path = &config.store.path;
    if path.as_os_str() != ":memory:" {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
    }

    let store = SqliteStore::new(path)?;
    let source = FsExtractionSource::new(config.source.root.clone());
    let processor = LineageProcessor::new(client, store, source, config.engine.clone())?
        .with_notifier(Arc::new(LogNotifier));
    Ok(processor)
}
