//! Pipeline stages and engines.
//!
//! Each module holds one stage of the case pipeline. The engines are pure
//! where possible (classifier, extractor, analyzer, assembler, eligibility,
//! report) so they test without a database; orchestration code that touches
//! the database or external collaborators lives in the handlers, the worker
//! and the processor.

pub mod bank_analyzer;
pub mod bank_parser;
pub mod case_ids;
pub mod checklist;
pub mod classifier;
pub mod eligibility;
pub mod extractor;
pub mod features;
pub mod ingestion;
pub mod pdf;
pub mod processor;
pub mod report;
