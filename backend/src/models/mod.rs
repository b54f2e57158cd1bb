//! Database row models.
//!
//! These structs mirror table rows and know how to hydrate themselves from
//! `sqlx` rows and convert into the shared response DTOs. Enums travel as
//! their string forms in the database and are parsed on the way out.

pub mod case;
pub mod document;
pub mod lender;

pub use case::CaseRow;
pub use document::{DocumentRow, ProcessingJobRow};
pub use lender::product_rule_from_row;
