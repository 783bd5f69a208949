//! Object store backends.
//!
//! The [`backend::ObjectStore`] trait abstracts over where the camera
//! objects live. Implementations are an AWS S3 client and an in-memory
//! map used for tests and local development.

pub mod aws;
pub mod backend;
pub mod memory;
