//! goldpair CLI - Paired-Language Code Dataset Builder
//!
//! Extract gold implementations from paired source trees and synthesize
//! execution-derived test statements.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use goldpair::data::{discover_tasks, DataPipeline, FieldNaming, PipelineConfig};
use goldpair::extract::{task_function_name, DuplicatePolicy, RenameStrategy, SourceExtractor};
use goldpair::oracle::SandboxConfig;
use goldpair::{Language, Result};

/// goldpair - Paired-Language Code Dataset Builder
#[derive(Parser)]
#[command(name = "goldpair")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the sample set for every paired task
    Build {
        /// Directory holding the language-A sources
        #[arg(long)]
        lang_a_dir: PathBuf,

        /// Directory holding the Python sources
        #[arg(long)]
        lang_b_dir: PathBuf,

        /// Language of the first tree (cpp, python)
        #[arg(long, default_value = "cpp")]
        lang_a: Language,

        /// Output JSON file
        #[arg(short, long, default_value = "samples.json")]
        output: PathBuf,

        /// Worker threads (0 = one per core)
        #[arg(short, long, default_value = "0")]
        jobs: usize,

        /// Python interpreter
        #[arg(long, default_value = "python3")]
        interpreter: String,

        /// Limit for one call in milliseconds (0 disables)
        #[arg(long, default_value = "2000")]
        call_timeout_ms: u64,

        /// Limit for one task's interpreter in milliseconds
        #[arg(long, default_value = "60000")]
        task_timeout_ms: u64,

        /// Rename strategy (identifier, textual)
        #[arg(long, default_value = "identifier")]
        rename: RenameStrategy,

        /// Duplicate f_gold policy (first, reject)
        #[arg(long, default_value = "first")]
        on_duplicate: DuplicatePolicy,

        /// Emit `cpp`/`python` field names instead of `fragment_a`/`fragment_b`
        #[arg(long)]
        legacy_field_names: bool,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,

        /// Abort on the first failing task
        #[arg(long)]
        strict: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// List task identifiers present in both trees
    Pairs {
        /// Directory holding the language-A sources
        #[arg(long)]
        lang_a_dir: PathBuf,

        /// Directory holding the Python sources
        #[arg(long)]
        lang_b_dir: PathBuf,

        /// Language of the first tree
        #[arg(long, default_value = "cpp")]
        lang_a: Language,
    },

    /// Print the renamed fragment of a single source file
    Extract {
        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Source language (cpp, python)
        #[arg(short, long)]
        language: Language,

        /// Task name (defaults to the file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Rename strategy (identifier, textual)
        #[arg(long, default_value = "identifier")]
        rename: RenameStrategy,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Build {
            lang_a_dir,
            lang_b_dir,
            lang_a,
            output,
            jobs,
            interpreter,
            call_timeout_ms,
            task_timeout_ms,
            rename,
            on_duplicate,
            legacy_field_names,
            pretty,
            strict,
            no_progress,
        } => {
            let config = PipelineConfig {
                language_a: lang_a,
                lang_a_dir,
                lang_b_dir,
                jobs,
                strict,
                show_progress: !no_progress,
                rename,
                on_duplicate,
                sandbox: SandboxConfig::default()
                    .with_interpreter(interpreter)
                    .with_call_timeout(call_timeout_ms)
                    .with_task_timeout(task_timeout_ms),
            };
            let (samples, stats) = DataPipeline::with_config(config).run()?;

            let naming = if legacy_field_names {
                FieldNaming::Legacy
            } else {
                FieldNaming::Generic
            };
            samples.write(&output, naming, pretty)?;

            println!("Dataset Build Summary");
            println!("=====================");
            println!("  Tasks paired:     {}", stats.tasks_paired);
            println!("  Samples written:  {}", stats.tasks_succeeded);
            println!("  Tasks skipped:    {}", stats.tasks_failed);
            println!("  Assertions:       {}", stats.assertions);
            println!("  Error assertions: {}", stats.error_assertions);
            println!("  Timed-out calls:  {}", stats.timeouts);
            println!("  Opaque results:   {}", stats.unrepresentable);
            println!("  Success rate:     {:.1}%", stats.success_rate());
            println!("  Throughput:       {:.1} tasks/s", stats.throughput());
            println!("  Output:           {}", output.display());
            for failure in &stats.failures {
                println!("  skipped {}: {}", failure.task, failure.message);
            }
        }

        Commands::Pairs {
            lang_a_dir,
            lang_b_dir,
            lang_a,
        } => {
            let tasks = discover_tasks(
                &lang_a_dir,
                lang_a.extension(),
                &lang_b_dir,
                Language::Python.extension(),
            )?;
            for task in tasks {
                println!("{task}");
            }
        }

        Commands::Extract {
            file,
            language,
            name,
            rename,
        } => {
            let task = match name {
                Some(name) => name,
                None => file
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        goldpair::Error::Configuration(format!(
                            "cannot derive a task name from {}",
                            file.display()
                        ))
                    })?,
            };
            let source = std::fs::read_to_string(&file)?;
            let extraction = SourceExtractor::new(language)?
                .with_rename(rename)
                .extract(&source, &task_function_name(&task)?)
                .map_err(|e| e.in_task(task.clone()))?;

            println!("{}", extraction.fragment);
            if let Some(params) = extraction.parameters {
                println!();
                println!("# {} = {params}", goldpair::extract::PARAM);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
