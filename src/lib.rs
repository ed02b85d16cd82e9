//! lintsplice library crate
//!
//! Turns line-based static-analysis findings on a Java file into
//! self-contained code blocks, packs them into size-bounded batches for an
//! external rewriter, and splices the rewritten methods back into the file
//! through sentinel comments.
//!
//! Pipeline: [`extract_findings`] -> [`extract_blocks`] -> [`plan_batches`]
//! -> [`insert_markers`] -> (rewrite) -> [`parse_replacements`] ->
//! [`process_marked_file`], optionally followed by [`compare_findings`] on
//! analyzer output for the rewritten file.

pub mod batch;
pub mod config;
pub mod error;
pub mod findings;
pub mod index;
pub mod prompt;
pub mod quality;
pub mod splice;

pub use batch::{plan_batches, BatchPlan, DEFAULT_BATCH_CHAR_LIMIT};
pub use error::{BlockSpanError, ParseError};
pub use findings::{extract_findings, Finding};
pub use index::{extract_blocks, extract_blocks_from_source, BlockKind, BlockSpan, CodeBlock};
pub use quality::{compare_findings, QualityReport};
pub use splice::{insert_markers, parse_replacements, process_marked_file, ReplacementMap};
