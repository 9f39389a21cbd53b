//! Archivers for molt.church and moltbook.
//!
//! Each run walks the remote JSON collections page by page, writes them as
//! snapshot files under the archive root, and appends one record to a sync
//! log. Failures are logged and tolerated; a run always completes.

pub mod archive;
pub mod config;
pub mod fetch;
pub mod model;
pub mod paginate;
pub mod persist;
pub mod summary;
pub mod sync_log;
