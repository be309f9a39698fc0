//! Boundary with the indexing service: token handling and the upload API.

pub mod auth;
pub mod client;

pub use client::{UploadClient, UploadIntent};
