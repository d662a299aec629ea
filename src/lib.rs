//! Client pipeline for a medical image segmentation service.
//!
//! Three components compose over one shared session store: batch upload with
//! byte-level progress reporting, ordered slice viewing state, and packaging
//! of the results into a single downloadable archive with optional
//! passphrase protection. The inference service itself is an external
//! collaborator reached over HTTP; everything here is client-side.

pub mod cli;
pub mod engine;
pub mod error;
pub mod export;
pub mod model;
pub mod session;
pub mod storage;
pub mod viewer;
