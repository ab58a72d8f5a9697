use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::path::Path;

use super::{StoreError, StoreResult};
use crate::core::interview::InterviewScript;

/// Interview lookup.
#[async_trait]
pub trait InterviewRepository: Send + Sync {
    async fn get(&self, interview_id: &str) -> StoreResult<Option<InterviewScript>>;

    /// The most recently created interview.
    async fn latest(&self) -> StoreResult<Option<InterviewScript>>;

    /// Interview by id when one is given, otherwise the latest.
    async fn resolve(&self, interview_id: Option<&str>) -> StoreResult<Option<InterviewScript>> {
        match interview_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.get(id).await,
            None => self.latest().await,
        }
    }
}

/// Layout of an interviews YAML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InterviewsFile {
    /// Interviews in creation order; the last one is the latest
    pub interviews: Vec<InterviewScript>,
}

/// Interviews held in memory, in creation order.
#[derive(Debug, Default)]
pub struct InMemoryInterviewRepository {
    interviews: RwLock<Vec<InterviewScript>>,
}

impl InMemoryInterviewRepository {
    pub fn new(interviews: Vec<InterviewScript>) -> Self {
        Self {
            interviews: RwLock::new(interviews),
        }
    }

    /// Load interviews from a YAML file with a top-level `interviews` list.
    pub fn from_yaml_file(path: &Path) -> StoreResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Load(format!(
                "Failed to read interviews file {}: {}",
                path.display(),
                e
            ))
        })?;
        let file: InterviewsFile = serde_yaml::from_str(&contents)
            .map_err(|e| StoreError::Load(format!("Failed to parse interviews YAML: {}", e)))?;

        for script in &file.interviews {
            if script.id.trim().is_empty() {
                return Err(StoreError::Load("Interview id must not be empty".to_string()));
            }
        }

        tracing::info!(
            count = file.interviews.len(),
            path = %path.display(),
            "Loaded interviews"
        );
        Ok(Self::new(file.interviews))
    }

    /// Add an interview; it becomes the latest.
    pub fn insert(&self, script: InterviewScript) {
        let mut interviews = self.interviews.write();
        interviews.retain(|s| s.id != script.id);
        interviews.push(script);
    }

    pub fn len(&self) -> usize {
        self.interviews.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.interviews.read().is_empty()
    }
}

#[async_trait]
impl InterviewRepository for InMemoryInterviewRepository {
    async fn get(&self, interview_id: &str) -> StoreResult<Option<InterviewScript>> {
        Ok(self
            .interviews
            .read()
            .iter()
            .find(|s| s.id == interview_id)
            .cloned())
    }

    async fn latest(&self) -> StoreResult<Option<InterviewScript>> {
        Ok(self.interviews.read().last().cloned())
    }
}
