//! Daemon state shared with control handlers.

use dualscan_config_and_utils::Config;
use dualscan_engine::{
    Collaborators, EngineSettings, MemoryActivityLog, ScanEngine, TracingActivityLog,
};
use dualscan_storage::{BatchFileSink, SingleRecordWriter};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct DaemonState {
    pub engine: Arc<ScanEngine>,
    /// Recent activity, served by `engine.activity`.
    pub activity: Arc<MemoryActivityLog>,
    pub output_dir: PathBuf,
}

impl DaemonState {
    /// Build the engine and its file-backed collaborators.
    pub fn new(config: &Config, output_dir: PathBuf) -> Self {
        let activity = Arc::new(MemoryActivityLog::new());

        let mut collaborators = Collaborators::new(Arc::new(BatchFileSink::new(&output_dir)))
            .with_activity(Arc::new((TracingActivityLog, activity.clone())));
        if config.save_each_record {
            collaborators =
                collaborators.with_observer(Arc::new(SingleRecordWriter::new(&output_dir)));
        }

        let engine = ScanEngine::new(EngineSettings::from_provider(config), collaborators);

        Self {
            engine: Arc::new(engine),
            activity,
            output_dir,
        }
    }
}
