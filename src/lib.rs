//! goldpair - Paired-Language Code Dataset Builder
//!
//! goldpair turns a pair of source trees (one file per task, one tree per
//! language, shared basenames) into dataset records of the form
//! `(fragment_a, fragment_b, test_statements)`. The canonical `f_gold`
//! implementation is extracted from each file with tree-sitter queries and
//! renamed after the task, and the test statements are synthesized by actually
//! running the Python implementation on its declared parameter list.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         GOLDPAIR CORE                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Grammar    →   Extract    →    Oracle      →    Data         │
//! │  (queries)      (fragments)     (assertions)     (samples)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use goldpair::data::{DataPipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new("data/cpp", "data/python");
//! let (samples, stats) = DataPipeline::with_config(config).run()?;
//! println!("{} samples, {} assertions", samples.len(), stats.assertions);
//! # Ok::<(), goldpair::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`grammar`] - tree-sitter grammars and the structural query engine
//! - [`extract`] - fragment, parameter-list extraction and renaming
//! - [`oracle`] - sandboxed execution and assertion synthesis
//! - [`data`] - task pairing, sample assembly, the parallel pipeline

#![forbid(unsafe_code)]

pub mod data;
pub mod error;
pub mod extract;
pub mod grammar;
pub mod oracle;

use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// C++ (fragment-only language)
    Cpp,
    /// Python (execution language, carries the parameter list)
    Python,
}

impl Language {
    /// File suffix used by dataset trees for this language
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Cpp => "cpp",
            Self::Python => "py",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpp => write!(f, "cpp"),
            Self::Python => write!(f, "python"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cpp" | "c++" | "cxx" => Ok(Self::Cpp),
            "python" | "py" => Ok(Self::Python),
            other => Err(Error::Configuration(format!("unknown language '{other}'"))),
        }
    }
}


/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::data::{DataPipeline, PipelineConfig, PipelineStats, Sample, SampleSet};
    pub use crate::extract::{extractor_for, Fragment, SourceExtractor, F_GOLD, PARAM};
    pub use crate::grammar::{grammar_for, CaptureSet, Grammar, SyntaxQuery};
    pub use crate::oracle::{Assertion, OracleSynthesizer, SandboxConfig};
    pub use crate::{Error, Language, Result};
}
