//! Domain entities mirrored from persistent storage.

use serde::Serialize;

/// A published blog post.
///
/// `content` is the editor's HTML exactly as submitted. `image` is the web
/// path of the cover image (`/uploads/...`) when one was attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
}
