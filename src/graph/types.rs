//! Data types and error definitions for Graph drive access.

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by Graph drive operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Transport-level failure reaching Graph.
    #[error("Graph request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Graph returned a non-success status.
    #[error("Graph endpoint returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status reported by Graph.
        status: reqwest::StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// Configured document library was not present on the site.
    #[error("Drive '{drive}' not found on site {site}")]
    DriveNotFound {
        /// Display name of the library that was searched for.
        drive: String,
        /// Identifier of the site that was searched.
        site: String,
    },
    /// Writing a downloaded file to disk failed.
    #[error("Failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolved identifiers addressing items in a SharePoint document library.
#[derive(Debug, Clone)]
pub struct SharePointTarget {
    /// Graph identifier of the SharePoint site.
    pub site_id: String,
    /// Graph identifier of the document library drive.
    pub drive_id: String,
}

/// One entry in a drive listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    /// Stable identifier of the item.
    pub id: String,
    /// Display name, including the extension for files.
    pub name: String,
    /// Size in bytes, when reported.
    #[serde(default)]
    pub size: Option<u64>,
    /// Last modification timestamp in RFC 3339 form.
    #[serde(default)]
    pub last_modified_date_time: Option<String>,
    /// File facet, present when the item is a file.
    #[serde(default)]
    pub file: Option<FileFacet>,
    /// Folder facet, present when the item is a folder.
    #[serde(default)]
    pub folder: Option<FolderFacet>,
}

impl DriveItem {
    /// Whether this item is a folder rather than a downloadable file.
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }

    /// MIME type reported for the file, when known.
    pub fn mime_type(&self) -> Option<&str> {
        self.file
            .as_ref()
            .and_then(|facet| facet.mime_type.as_deref())
    }
}

/// File metadata facet of a drive item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    /// MIME type reported by SharePoint.
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Folder metadata facet of a drive item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    /// Number of children inside the folder.
    #[serde(default)]
    pub child_count: Option<u64>,
}

/// Site lookup response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct SiteResponse {
    pub id: String,
}

/// Drive enumeration response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DriveListResponse {
    #[serde(default)]
    pub value: Vec<DriveSummary>,
}

/// Identifier and display name of one drive.
#[derive(Debug, Deserialize)]
pub(crate) struct DriveSummary {
    pub id: String,
    pub name: String,
}

/// Item listing response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ItemListResponse {
    #[serde(default)]
    pub value: Vec<DriveItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_item_decodes_graph_camel_case() {
        let item: DriveItem = serde_json::from_str(
            r#"{
                "id": "item-1",
                "name": "Spec.pdf",
                "size": 2048,
                "lastModifiedDateTime": "2025-05-01T10:00:00Z",
                "file": {"mimeType": "application/pdf"}
            }"#,
        )
        .expect("drive item decodes");

        assert_eq!(item.name, "Spec.pdf");
        assert_eq!(item.size, Some(2048));
        assert_eq!(item.mime_type(), Some("application/pdf"));
        assert!(!item.is_folder());
    }

    #[test]
    fn folder_facet_marks_folders() {
        let item: DriveItem = serde_json::from_str(
            r#"{"id": "dir-1", "name": "Archive", "folder": {"childCount": 3}}"#,
        )
        .expect("folder decodes");

        assert!(item.is_folder());
        assert_eq!(item.mime_type(), None);
    }
}
