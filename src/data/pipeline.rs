//! Parallel dataset pipeline
//!
//! Pairs the two source trees, then processes every task independently:
//! read, extract both fragments, synthesize oracles, assemble the sample.
//!
//! # Features
//!
//! - Parallel task processing using rayon, one task per worker at a time
//! - Progress bars with ETA (indicatif)
//! - Per-task failures are collected and reported; `strict` aborts instead
//!   and tasks not yet started are skipped

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::extract::{task_function_name, DuplicatePolicy, RenameStrategy, SourceExtractor};
use crate::oracle::{OracleSynthesizer, SandboxConfig, Synthesis};
use crate::{Error, Language, Result};

use super::pair::discover_tasks;
use super::{Sample, SampleSet};

/// Configuration for the dataset pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Language of the first tree (the second is always Python)
    pub language_a: Language,
    /// Root of the language-A tree
    pub lang_a_dir: PathBuf,
    /// Root of the Python tree
    pub lang_b_dir: PathBuf,
    /// Worker threads, 0 for the rayon default
    pub jobs: usize,
    /// Abort on the first task failure
    pub strict: bool,
    /// Show progress bar
    pub show_progress: bool,
    /// Sentinel rename strategy
    pub rename: RenameStrategy,
    /// Duplicate sentinel policy
    pub on_duplicate: DuplicatePolicy,
    /// Oracle sandbox settings
    pub sandbox: SandboxConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language_a: Language::Cpp,
            lang_a_dir: PathBuf::from("cpp"),
            lang_b_dir: PathBuf::from("python"),
            jobs: 0,
            strict: false,
            show_progress: true,
            rename: RenameStrategy::default(),
            on_duplicate: DuplicatePolicy::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Configuration for a pair of trees with default settings
    #[must_use]
    pub fn new(lang_a_dir: impl Into<PathBuf>, lang_b_dir: impl Into<PathBuf>) -> Self {
        Self {
            lang_a_dir: lang_a_dir.into(),
            lang_b_dir: lang_b_dir.into(),
            ..Self::default()
        }
    }

    /// Check the configuration before any task runs
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the sandbox settings are unusable
    pub fn validate(&self) -> Result<()> {
        self.sandbox.validate()
    }
}

/// A task that could not be turned into a sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Task basename
    pub task: String,
    /// Rendered error
    pub message: String,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Tasks present in both trees
    pub tasks_paired: usize,
    /// Tasks turned into samples
    pub tasks_succeeded: usize,
    /// Tasks skipped because of an error
    pub tasks_failed: usize,
    /// Assertions generated
    pub assertions: usize,
    /// Assertions expecting an exception
    pub error_assertions: usize,
    /// Parameter tuples dropped on timeout
    pub timeouts: usize,
    /// Parameter tuples dropped because the result has no literal form
    pub unrepresentable: usize,
    /// Failed tasks with their errors
    pub failures: Vec<TaskFailure>,
    /// Wall-clock time in milliseconds
    pub elapsed_ms: u64,
}

impl PipelineStats {
    /// Tasks processed per second
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.elapsed_ms == 0 {
            return 0.0;
        }
        (self.tasks_paired as f64) / (self.elapsed_ms as f64 / 1000.0)
    }

    /// Share of paired tasks that produced a sample, as a percentage
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.tasks_paired == 0 {
            return 0.0;
        }
        (self.tasks_succeeded as f64 / self.tasks_paired as f64) * 100.0
    }
}

struct Workers {
    extractor_a: SourceExtractor,
    extractor_b: SourceExtractor,
    oracle: OracleSynthesizer,
}

/// Paired-dataset pipeline
#[derive(Debug, Default)]
pub struct DataPipeline {
    config: PipelineConfig,
}

impl DataPipeline {
    /// Create a pipeline with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create pipeline with custom configuration
    #[must_use]
    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Set the number of worker threads
    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = jobs;
        self
    }

    /// Abort on the first task failure
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Enable or disable progress bar
    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Task identifiers present in both trees
    ///
    /// # Errors
    ///
    /// Returns an error if either tree cannot be listed
    pub fn tasks(&self) -> Result<Vec<String>> {
        discover_tasks(
            &self.config.lang_a_dir,
            self.config.language_a.extension(),
            &self.config.lang_b_dir,
            Language::Python.extension(),
        )
    }

    fn workers(&self) -> Result<Workers> {
        let extractor_a = SourceExtractor::new(self.config.language_a)?
            .with_rename(self.config.rename)
            .with_duplicate_policy(self.config.on_duplicate)
            .with_parameters(false)?;
        let extractor_b = SourceExtractor::new(Language::Python)?
            .with_rename(self.config.rename)
            .with_duplicate_policy(self.config.on_duplicate)
            .with_parameters(true)?;
        Ok(Workers {
            extractor_a,
            extractor_b,
            oracle: OracleSynthesizer::new(self.config.sandbox.clone()),
        })
    }

    fn source_path(dir: &Path, task: &str, language: Language) -> PathBuf {
        dir.join(format!("{task}.{}", language.extension()))
    }

    fn read_source(path: &Path) -> Result<String> {
        log::debug!("reading {}", path.display());
        std::fs::read_to_string(path)
            .map_err(|e| Error::Data(format!("cannot read {}: {e}", path.display())))
    }

    fn process_task(&self, workers: &Workers, task: &str) -> Result<(Sample, Synthesis)> {
        let function = task_function_name(task)?;

        let source_a = Self::read_source(&Self::source_path(
            &self.config.lang_a_dir,
            task,
            self.config.language_a,
        ))?;
        let extraction_a = workers.extractor_a.extract(&source_a, &function)?;

        let source_b = Self::read_source(&Self::source_path(
            &self.config.lang_b_dir,
            task,
            Language::Python,
        ))?;
        let extraction_b = workers.extractor_b.extract(&source_b, &function)?;
        let params = extraction_b.parameters.as_deref().ok_or_else(|| {
            Error::Configuration("python extractor returned no parameter list".into())
        })?;

        let synthesis = workers.oracle.synthesize(&extraction_b.fragment, params)?;
        log::info!(
            "{task}: {} test statements ({} expect errors)",
            synthesis.assertions.len(),
            synthesis.error_count()
        );

        let sample = Sample {
            fragment_a: extraction_a.fragment.into_code(),
            fragment_b: extraction_b.fragment.into_code(),
            test_statements: synthesis.statements(),
        };
        Ok((sample, synthesis))
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.config.show_progress {
            return None;
        }
        let pb = ProgressBar::new(len as u64);
        // Template is hardcoded and known to be valid
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }

    /// Run the pipeline over every paired task
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, either tree cannot
    /// be listed, a fatal error occurs, or any task fails in strict mode. No
    /// samples are returned in that case.
    pub fn run(&self) -> Result<(SampleSet, PipelineStats)> {
        self.config.validate()?;
        let start = Instant::now();
        let tasks = self.tasks()?;
        let workers = self.workers()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build worker pool: {e}")))?;

        let progress = self.progress_bar(tasks.len());
        let abort = AtomicBool::new(false);
        // Tasks not started after an aborting failure come back as None
        let results: Vec<(&String, Option<Result<(Sample, Synthesis)>>)> = pool.install(|| {
            tasks
                .par_iter()
                .map(|task| {
                    if abort.load(Ordering::Relaxed) {
                        return (task, None);
                    }
                    let result = self.process_task(&workers, task);
                    if let Err(err) = &result {
                        if self.config.strict || err.is_fatal() {
                            abort.store(true, Ordering::Relaxed);
                        }
                    }
                    if let Some(pb) = &progress {
                        pb.inc(1);
                    }
                    (task, Some(result))
                })
                .collect()
        });
        if let Some(pb) = &progress {
            pb.finish_with_message("done");
        }

        let mut samples = SampleSet::new();
        let mut stats = PipelineStats {
            tasks_paired: tasks.len(),
            ..PipelineStats::default()
        };
        for (task, result) in results {
            let Some(result) = result else {
                continue;
            };
            match result {
                Ok((sample, synthesis)) => {
                    stats.tasks_succeeded += 1;
                    stats.assertions += synthesis.assertions.len();
                    stats.error_assertions += synthesis.error_count();
                    stats.timeouts += synthesis.timeouts;
                    stats.unrepresentable += synthesis.unrepresentable;
                    samples.insert(task.clone(), sample);
                }
                Err(err) if self.config.strict || err.is_fatal() => {
                    return Err(err.in_task(task.clone()));
                }
                Err(err) => {
                    log::warn!("skipping task {task}: {err}");
                    stats.tasks_failed += 1;
                    stats.failures.push(TaskFailure {
                        task: task.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        stats.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::info!(
            "{} of {} tasks succeeded, {} assertions",
            stats.tasks_succeeded,
            stats.tasks_paired,
            stats.assertions
        );
        Ok((samples, stats))
    }
}
