use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use itertools::Itertools;
use tracing::{debug, warn};

/// One unit of input handed to a single map invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Split {
    /// Stable identifier, usually a file path.
    pub id: String,

    /// Size hint used only to order submission.
    pub size: Option<u64>,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl Split {
    pub fn new(id: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            id: id.into(),
            size,
        }
    }

    /// Build a split for a file, taking its size from filesystem metadata.
    ///
    /// A file that cannot be inspected still becomes a split, just without a
    /// size hint.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let size = match fs::metadata(path) {
            Ok(meta) => Some(meta.len()),
            Err(e) => {
                warn!("could not stat split {}: {}", path.display(), e);
                None
            }
        };
        debug!(split = %path.display(), ?size, "resolved split");

        Self {
            id: path.to_string_lossy().into_owned(),
            size,
        }
    }

    /// Read the whole split into memory.
    pub fn read(&self) -> anyhow::Result<Bytes> {
        let buf = fs::read(&self.id)
            .with_context(|| format!("failed to read split `{}`", self.id))?;
        Ok(Bytes::from(buf))
    }

    fn sort_key(&self) -> u64 {
        self.size.unwrap_or(0)
    }
}

/// Resolve every path into a [`Split`].
pub fn resolve_splits<I, P>(paths: I) -> Vec<Split>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths.into_iter().map(Split::from_path).collect()
}

/// Order splits smallest first. Splits without a size count as empty and
/// ties keep their input order.
pub fn schedule_order(splits: &[Split]) -> Vec<Split> {
    splits.iter().cloned().sorted_by_key(Split::sort_key).collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_size_from_metadata() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let split = Split::from_path(file.path());
        assert_eq!(split.size, Some(10));
        assert_eq!(split.read().unwrap(), Bytes::from_static(b"0123456789"));
    }

    #[test]
    fn missing_file_has_no_size() {
        let dir = tempfile::tempdir().unwrap();
        let split = Split::from_path(dir.path().join("nope.txt"));
        assert_eq!(split.size, None);
        assert!(split.read().is_err());
    }

    #[test]
    fn smallest_first_and_stable() {
        let splits = vec![
            Split::new("big", Some(10)),
            Split::new("missing", None),
            Split::new("tiny", Some(1)),
            Split::new("empty", Some(0)),
            Split::new("mid", Some(5)),
        ];
        let order: Vec<_> = schedule_order(&splits)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, ["missing", "empty", "tiny", "mid", "big"]);
    }
}
