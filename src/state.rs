// src/state.rs
use std::sync::Arc;

use crate::store::{CatalogStore, ContentStore};
use crate::submission::SubmissionPipeline;
use crate::wizard::WizardSessions;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub content: Arc<dyn ContentStore>,
    pub pipeline: Arc<SubmissionPipeline>,
    pub wizards: Arc<WizardSessions>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        content: Arc<dyn ContentStore>,
        pipeline: SubmissionPipeline,
        wizards: WizardSessions,
    ) -> Self {
        Self {
            catalog,
            content,
            pipeline: Arc::new(pipeline),
            wizards: Arc::new(wizards),
        }
    }
}
