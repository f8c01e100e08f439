//! Hands-on practice graded by an instructor; nothing is generated.

use chrono::{DateTime, Utc};

use super::{deadline_at, Capability, LabTopic, TopicTask, Variant};
use crate::config::LabConfig;
use crate::domain::Result;

const TASKS: &[TopicTask] = &[TopicTask::new("practice", "Practical assignment", 10.0)];

/// The "twisted pair crimping" practice topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct PracticeTopic;

impl LabTopic for PracticeTopic {
    fn slug(&self) -> &'static str {
        "practice"
    }

    fn title(&self) -> &'static str {
        "Crimping twisted pair"
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        deadline_at(2025, 5, 24, 21)
    }

    fn tasks(&self) -> &'static [TopicTask] {
        TASKS
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    fn build_variant(&self, _config: &LabConfig, subject_id: i64) -> Result<Variant> {
        Ok(Variant::new(self.slug(), subject_id))
    }
}
