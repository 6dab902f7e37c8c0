//! Physical post-order traversal of a directory tree.
//!
//! Every descendant of a directory is yielded before the directory itself,
//! and symbolic links are reported as leaves instead of being followed. This
//! is the order needed to delete a tree: by the time a directory comes up,
//! everything inside it has already been handled.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub is_dir: bool,
}

enum Frame {
    /// Not yet inspected.
    Pending(PathBuf),
    /// A directory whose children have all been pushed above it.
    Expanded(PathBuf),
}

/// Iterator over a tree in post-order.
///
/// Directories are listed when first reached, so removing already-yielded
/// entries while iterating is safe. An error for one node is yielded in
/// place of that node; iteration can continue past it.
pub struct PostOrder {
    stack: Vec<Frame>,
}

impl PostOrder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            stack: vec![Frame::Pending(root.into())],
        }
    }
}

impl Iterator for PostOrder {
    type Item = io::Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                Frame::Expanded(path) => return Some(Ok(Entry { path, is_dir: true })),
                Frame::Pending(path) => {
                    let meta = match fs::symlink_metadata(&path) {
                        Ok(meta) => meta,
                        Err(e) => return Some(Err(annotate(e, &path))),
                    };
                    if !meta.is_dir() {
                        return Some(Ok(Entry { path, is_dir: false }));
                    }
                    let children = match read_children(&path) {
                        Ok(children) => children,
                        Err(e) => return Some(Err(annotate(e, &path))),
                    };
                    self.stack.push(Frame::Expanded(path));
                    // Reversed so children come off the stack in name order.
                    self.stack
                        .extend(children.into_iter().rev().map(Frame::Pending));
                }
            }
        }
    }
}

fn read_children(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    children.sort();
    Ok(children)
}

fn annotate(e: io::Error, path: &Path) -> io::Error {
    io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
}
