//! Sample assembly and output
//!
//! A [`Sample`] is the final record of one task: the language-A fragment,
//! the language-B fragment and the ordered test statements. A [`SampleSet`]
//! maps task basenames to samples and serializes to one JSON object.

mod pair;
mod pipeline;

pub use pair::{base_names, discover_tasks, list_dataset_files, pair_tasks};
pub use pipeline::{DataPipeline, PipelineConfig, PipelineStats, TaskFailure};

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Output record of one task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Fragment in language A
    #[serde(alias = "cpp")]
    pub fragment_a: String,
    /// Fragment in language B (the execution language)
    #[serde(alias = "python")]
    pub fragment_b: String,
    /// Assertion statements in parameter declaration order
    pub test_statements: Vec<String>,
}

/// Field names used when writing samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldNaming {
    /// `fragment_a`, `fragment_b`
    #[default]
    Generic,
    /// `cpp`, `python`, for existing consumers
    Legacy,
}

impl FieldNaming {
    fn keys(self) -> (&'static str, &'static str) {
        match self {
            Self::Generic => ("fragment_a", "fragment_b"),
            Self::Legacy => ("cpp", "python"),
        }
    }
}

/// Samples keyed by task basename
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSet {
    samples: BTreeMap<String, Sample>,
}

impl SampleSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task's sample, returning any previous one
    pub fn insert(&mut self, task: impl Into<String>, sample: Sample) -> Option<Sample> {
        self.samples.insert(task.into(), sample)
    }

    /// Sample of a task
    #[must_use]
    pub fn get(&self, task: &str) -> Option<&Sample> {
        self.samples.get(task)
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in task order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Sample)> {
        self.samples.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of test statements
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.samples.values().map(|s| s.test_statements.len()).sum()
    }

    /// JSON object keyed by task
    #[must_use]
    pub fn to_json(&self, naming: FieldNaming) -> serde_json::Value {
        let (key_a, key_b) = naming.keys();
        let map = self
            .samples
            .iter()
            .map(|(task, sample)| {
                let mut record = serde_json::Map::new();
                record.insert(key_a.to_string(), sample.fragment_a.clone().into());
                record.insert(key_b.to_string(), sample.fragment_b.clone().into());
                record.insert(
                    "test_statements".to_string(),
                    sample.test_statements.clone().into(),
                );
                (task.clone(), serde_json::Value::Object(record))
            })
            .collect();
        serde_json::Value::Object(map)
    }

    /// Write the set as JSON, replacing `path` only once the write succeeded
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails
    pub fn write(&self, path: &Path, naming: FieldNaming, pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(&self.to_json(naming))?
        } else {
            serde_json::to_string(&self.to_json(naming))?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp);
            Error::Io(e)
        })?;
        log::info!("wrote {} samples to {}", self.len(), path.display());
        Ok(())
    }

    /// Load a set written with either field naming
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a sample object
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let samples: BTreeMap<String, Sample> = serde_json::from_str(&content)?;
        Ok(Self { samples })
    }
}

impl FromIterator<(String, Sample)> for SampleSet {
    fn from_iter<I: IntoIterator<Item = (String, Sample)>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}
