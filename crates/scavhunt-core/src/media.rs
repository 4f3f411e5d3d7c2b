//! Media object naming.
//!
//! Every upload is stored twice in the blob store, keyed by owner and
//! variant:
//!
//! ```text
//! {owner}/{task_safe}_{original_name}              original bytes
//! {owner}/compressed/{task_safe}_{original_name}   recompressed bytes
//! ```
//!
//! The task name is recovered from a stored object by taking the filename
//! prefix up to the first `_` and mapping `-` back to spaces. Task names
//! containing `_` or literal `-` therefore do not survive the round trip;
//! the hunt's task lists avoid both.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which physical copy of an upload an object is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// The bytes exactly as uploaded.
    Original,
    /// The recompressed copy served to organizers and the gallery.
    Compressed,
}

impl Variant {
    /// The blob prefix for this variant of one owner's media.
    #[must_use]
    pub fn prefix(self, owner: &str) -> String {
        match self {
            Variant::Original => format!("{owner}/"),
            Variant::Compressed => format!("{owner}/compressed/"),
        }
    }

    /// The full object path for a stored filename.
    #[must_use]
    pub fn object_path(self, owner: &str, filename: &str) -> String {
        format!("{}{filename}", self.prefix(owner))
    }
}

/// One stored media file, as listed for organizers and task views.
#[derive(Debug, Clone, Serialize)]
pub struct MediaObject {
    /// Full object path in the bucket.
    pub path: String,
    /// Stored filename (`{task_safe}_{original_name}`).
    pub filename: String,
    /// The owning username.
    pub owner: String,
    /// Task name recovered from the filename.
    pub task: String,
    /// Content type reported by the blob store.
    pub content_type: String,
    /// Short-lived signed URL for viewing the object.
    pub url: String,
    /// When the object was last written, if the store reported it.
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl MediaObject {
    /// Whether this object is an image by content type.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image")
    }
}

/// Make a task name safe for use in a filename (spaces become `-`).
#[must_use]
pub fn task_safe(task: &str) -> String {
    task.replace(' ', "-")
}

/// Undo [`task_safe`] for display and table lookup.
#[must_use]
pub fn task_display(safe: &str) -> String {
    safe.replace('-', " ")
}

/// The blob folder for a user's media. Usernames may contain spaces;
/// folders use the same dash mapping as task names.
#[must_use]
pub fn folder_name(username: &str) -> String {
    username.replace(' ', "-")
}

/// Build the stored filename for an upload.
#[must_use]
pub fn encode_filename(task: &str, original_name: &str) -> String {
    format!("{}_{}", task_safe(task), original_name.replace(' ', "-"))
}

/// Recover the task name from a stored filename.
#[must_use]
pub fn task_from_filename(filename: &str) -> Option<String> {
    filename.split_once('_').map(|(prefix, _)| task_display(prefix))
}

/// Reduce an uploaded filename to something safe as a scratch-file key:
/// keeps alphanumerics, `.`, `-` and `_`, maps spaces to `-`, drops the
/// rest, and strips leading dots. Falls back to `"file"` when nothing
/// survives.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                Some(c)
            } else if c == ' ' {
                Some('-')
            } else {
                None
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_prefixes() {
        assert_eq!(Variant::Original.prefix("alice"), "alice/");
        assert_eq!(Variant::Compressed.prefix("alice"), "alice/compressed/");
        assert_eq!(
            Variant::Compressed.object_path("alice", "Find-a-cat_proof.jpg"),
            "alice/compressed/Find-a-cat_proof.jpg"
        );
    }

    #[test]
    fn filename_encodes_task_prefix() {
        assert_eq!(
            encode_filename("Find a cat", "my proof.jpg"),
            "Find-a-cat_my-proof.jpg"
        );
    }

    #[test]
    fn task_recovered_from_filename() {
        assert_eq!(
            task_from_filename("Find-a-cat_proof.jpg").as_deref(),
            Some("Find a cat")
        );
        // Underscores in the original name do not confuse the parse.
        assert_eq!(
            task_from_filename("Find-a-cat_my_proof.jpg").as_deref(),
            Some("Find a cat")
        );
        assert_eq!(task_from_filename("no-separator.jpg"), None);
    }

    #[test]
    fn folder_name_dashes_spaces() {
        assert_eq!(folder_name("alice"), "alice");
        assert_eq!(folder_name("al ice"), "al-ice");
    }

    #[test]
    fn sanitize_strips_path_tricks() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my-photo-1.jpg");
        assert_eq!(sanitize_filename("???"), "file");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
    }
}
