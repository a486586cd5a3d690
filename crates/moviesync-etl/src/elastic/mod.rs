//! Target index access: HTTP client, bulk reporting, index mappings

pub mod client;
pub mod mappings;

pub use client::{BulkFailure, BulkReport, ElasticClient, IndexWriter};
