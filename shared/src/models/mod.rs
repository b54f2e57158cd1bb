//! Shared model types.
//!
//! Currently limited to the closed enums used across the pipeline; row-level
//! structs live in the backend crate next to the queries that hydrate them.

pub mod enums;
