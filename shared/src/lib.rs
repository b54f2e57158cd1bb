//! Shared types for the case intelligence platform.
//!
//! This crate holds the closed enums and the request/response schemas used by
//! the backend API and the pipeline stages. The `backend` feature enables the
//! SQLx derives needed for database mapping; without it the crate is a plain
//! serde type library.

pub mod dtos;
pub mod models;
