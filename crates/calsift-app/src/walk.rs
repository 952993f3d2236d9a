//! A calendar collection backed by a directory of `.ics` files.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use calsift_service::caldav::{Resource, ResourceWalk, generate_etag};
use calsift_service::error::ServiceResult;

/// How far below the collection root the walk descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Depth {
    /// Direct members only.
    #[default]
    One,
    /// Every nested directory as well.
    Infinity,
}

/// One `.ics` file.
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
    href: String,
    etag: String,
}

impl FileResource {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Resource for FileResource {
    fn href(&self) -> &str {
        &self.href
    }

    fn etag(&self) -> &str {
        &self.etag
    }

    fn open(&self) -> std::io::Result<impl std::io::Read> {
        File::open(&self.path)
    }
}

/// Lists `.ics` files under a root directory in name order.
#[derive(Debug, Clone)]
pub struct DirectoryWalk {
    root: PathBuf,
    href_base: String,
    depth: Depth,
}

impl DirectoryWalk {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, href_base: &str, depth: Depth) -> Self {
        let mut href_base = href_base.trim_end_matches('/').to_string();
        href_base.push('/');
        Self {
            root: root.into(),
            href_base,
            depth,
        }
    }

    fn collect(&self, dir: &Path, prefix: &str, out: &mut Vec<FileResource>) -> ServiceResult<()> {
        let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(std::fs::DirEntry::file_name);

        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if self.depth == Depth::Infinity {
                    self.collect(&entry.path(), &format!("{prefix}{name}/"), out)?;
                }
                continue;
            }
            if !is_calendar_file(&name) {
                tracing::trace!(file = %name, "Skipping non-calendar file");
                continue;
            }

            let metadata = entry.metadata()?;
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_nanos());
            let href = format!("{}{prefix}{name}", self.href_base);
            let etag = generate_etag(format!("{href}:{}:{modified}", metadata.len()).as_bytes());
            out.push(FileResource {
                path: entry.path(),
                href,
                etag,
            });
        }
        Ok(())
    }
}

impl ResourceWalk for DirectoryWalk {
    type Resource = FileResource;

    #[tracing::instrument(skip(self), fields(root = %self.root.display(), depth = ?self.depth))]
    fn resources(&self) -> ServiceResult<Vec<FileResource>> {
        let mut out = Vec::new();
        self.collect(&self.root, "", &mut out)?;
        tracing::debug!(count = out.len(), "Listed collection");
        Ok(out)
    }
}

fn is_calendar_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ics"))
}
