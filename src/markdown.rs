use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::FileSystemError;

const MARKDOWN_SUFFIX: &str = ".md";

/// A Markdown file found one level below the data root, paired with the
/// name of the directory that holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFile {
    pub tag: String,
    pub path: PathBuf,
}

impl TaggedFile {
    /// File name without the Markdown extension (`hello-world.md` -> `hello-world`).
    pub fn title(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Lazily walks `<root>/<tag>/<name>.md`.
///
/// Dangling symlinks are not errors: at the root they are skipped, inside a
/// tag directory they are filtered by name like any other entry. Stops after
/// the first real error, which the caller is expected to treat as fatal.
pub struct TagWalker {
    root: PathBuf,
    entries: Option<walkdir::IntoIter>,
    done: bool,
}

pub fn find_tagged_files(root: &Path) -> TagWalker {
    TagWalker {
        root: root.to_path_buf(),
        entries: None,
        done: false,
    }
}

impl TagWalker {
    fn fail(&mut self, path: PathBuf, source: io::Error) -> Option<Result<TaggedFile, FileSystemError>> {
        self.done = true;
        Some(Err(FileSystemError { path, source }))
    }
}

/// Pairs a file inside a tag directory with its tag, if its name marks it as Markdown.
fn tagged_markdown(path: PathBuf) -> Option<TaggedFile> {
    if !path.file_name()?.to_string_lossy().ends_with(MARKDOWN_SUFFIX) {
        return None;
    }
    let tag = path.parent()?.file_name()?.to_string_lossy().into_owned();

    Some(TaggedFile { tag, path })
}

fn is_dangling_link(path: &Path) -> bool {
    let is_link = fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false);
    is_link && fs::metadata(path).is_err()
}

impl Iterator for TagWalker {
    type Item = Result<TaggedFile, FileSystemError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.entries.is_none() {
            match fs::metadata(&self.root) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => {
                    let source = io::Error::new(io::ErrorKind::Other, "not a directory");
                    return self.fail(self.root.clone(), source);
                }
                Err(source) => return self.fail(self.root.clone(), source),
            }

            self.entries = Some(
                WalkDir::new(&self.root)
                    .min_depth(2)
                    .max_depth(2)
                    .follow_links(true)
                    .sort_by_file_name()
                    .into_iter(),
            );
        }

        while let Some(entry) = self.entries.as_mut()?.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());

                    if err.loop_ancestor().is_some() {
                        warn!(path = %path.display(), "Skipping symlink loop");
                        continue;
                    }

                    // A link whose target is gone is just an entry, not an unreadable directory.
                    if is_dangling_link(&path) {
                        if err.depth() >= 2 {
                            if let Some(file) = tagged_markdown(path) {
                                return Some(Ok(file));
                            }
                        } else {
                            debug!(path = %path.display(), "Skipping dangling symlink");
                        }
                        continue;
                    }

                    let source = err.into_io_error().unwrap_or_else(|| {
                        io::Error::new(io::ErrorKind::Other, "unreadable directory entry")
                    });
                    return self.fail(path, source);
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(file) = tagged_markdown(entry.into_path()) {
                return Some(Ok(file));
            }
        }

        self.done = true;
        None
    }
}
