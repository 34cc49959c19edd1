//! Microsoft Graph drive access.
//!
//! A thin wrapper over the handful of Graph endpoints the tool needs: resolve
//! a SharePoint site and document library, list folder contents, and stream a
//! file download to disk. Callers never assemble Graph URLs themselves.

mod client;
mod types;

pub use client::GraphClient;
pub use types::{DriveItem, FileFacet, FolderFacet, GraphError, SharePointTarget};
