//! Catalog entry model for a single Tableau view.

use serde::{Deserialize, Serialize};

/// Path segment Tableau inserts between workbook and view in `contentUrl`.
const SHEETS_SEGMENT: &str = "sheets/";

/// One dashboard in the in-memory catalog. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// View LUID.
    pub id: String,
    /// Human readable view name, matched by search.
    pub display_name: String,
    /// Path fragment used to request the rendered image.
    pub render_key: String,
}

impl CatalogEntry {
    /// Build an entry from the raw fields of a views page.
    pub fn from_view(id: String, name: String, content_url: &str) -> Self {
        Self {
            id,
            display_name: name,
            render_key: render_key_from_content_url(content_url),
        }
    }
}

/// Derive a render key by removing the first `sheets/` segment.
///
/// `Workbook/sheets/View` becomes `Workbook/View`, which is the path the
/// rendering endpoint expects under `/views/`.
fn render_key_from_content_url(content_url: &str) -> String {
    content_url.replacen(SHEETS_SEGMENT, "", 1)
}
