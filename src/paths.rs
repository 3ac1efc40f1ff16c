//! Profile file identity: splitting `file#id` specifiers and joining relative profile paths.
//!
//! File identifiers are always `/`-separated strings, independent of the host OS. Conversion to
//! and from OS paths happens only at the filesystem loader boundary.

use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
    path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR},
};

/// Utility function to replace separators and convert to unicode (via to_string_lossy) on os path.
pub fn os_path_to_string<P: AsRef<Path>>(os_path_ref: P) -> String {
    let res = os_path_ref
        .as_ref()
        .components()
        .map(|c| match c {
            Component::RootDir => Cow::from("".to_string()),
            _ => c.as_os_str().to_string_lossy(),
        })
        .collect::<Vec<_>>()
        .join("/");
    tracing::debug!(
        "os_path_to_string: turned {:?} into {}",
        os_path_ref.as_ref().components(),
        res
    );
    res
}

pub fn string_to_os_path(path_string: &str) -> PathBuf {
    let res = PathBuf::from(path_string.replace("/", MAIN_SEPARATOR_STR));
    tracing::debug!("string_to_os_path: turned '{}' into {:?}", path_string, res);
    res
}

/// A borrowed view over a `dir/file.ext#anchor` string.
#[derive(Debug, Clone, Copy)]
pub struct AnchorPath<'a> {
    pub path: &'a str,
    /// Index of the last '/' before the anchor
    dir_sep: Option<usize>,
    /// Index of the '#' separating the file path from the anchor
    anc_sep: Option<usize>,
}

impl<'a> AnchorPath<'a> {
    pub fn new(path: &'a str) -> AnchorPath<'a> {
        let anc_sep = path.find('#');
        let dir_sep = path[0..anc_sep.unwrap_or(path.len())].rfind('/');
        AnchorPath {
            path,
            dir_sep,
            anc_sep,
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.path.starts_with('/')
    }

    /// True for external references such as `https://example.com/profile.json#item`.
    pub fn is_url(&self) -> bool {
        self.filepath().contains("://")
    }

    /// True when the whole path is a same-document anchor (`#id`).
    pub fn is_anchor(&self) -> bool {
        self.anc_sep == Some(0)
    }

    pub fn has_anchor(&self) -> bool {
        self.anc_sep.is_some()
    }

    pub fn filepath(&self) -> &'a str {
        &self.path[0..self.anc_sep.unwrap_or(self.path.len())]
    }

    pub fn anchor(&self) -> &'a str {
        self.anc_sep
            .map(|idx| &self.path[idx + 1..])
            .unwrap_or("")
    }

    pub fn dir(&self) -> &'a str {
        match self.dir_sep {
            // Keep the root of an absolute path
            Some(0) => &self.path[0..1],
            Some(idx) => &self.path[0..idx],
            None => "",
        }
    }

    pub fn filename(&self) -> &'a str {
        let start_idx = self.dir_sep.map(|idx| idx + 1).unwrap_or(0);
        &self.filepath()[start_idx..]
    }

    pub fn ext(&self) -> &'a str {
        let filename = self.filename();
        filename
            .rfind('.')
            .filter(|idx| *idx > 0)
            .map(|idx| &filename[idx + 1..])
            .unwrap_or("")
    }

    /// Resolve `end_ref` against the directory of this path.
    ///
    /// An anchor-only `end_ref` stays within this file. Absolute paths and URLs are returned
    /// as-is (absolute paths are normalized).
    pub fn join<E: AsRef<str>>(&self, end_ref: E) -> String {
        let end = AnchorPath::new(end_ref.as_ref());
        if end.is_url() {
            return end.path.to_string();
        }
        let filepath = if end.filepath().is_empty() {
            self.filepath().to_string()
        } else if end.is_absolute() || self.dir().is_empty() {
            end.filepath().to_string()
        } else {
            format!("{}/{}", self.dir(), end.filepath())
        };
        let normalized = AnchorPath::new(&filepath).normalize();
        if end.has_anchor() {
            format!("{}#{}", normalized, end.anchor())
        } else {
            normalized
        }
    }

    /// Resolve `.` and `..` components and collapse repeated separators.
    ///
    /// Leading `..` components of a relative path are preserved. URLs are left untouched.
    pub fn normalize(&self) -> String {
        if self.is_url() {
            return self.path.to_string();
        }
        let mut components = Vec::<&str>::new();
        for part in self.filepath().split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    if components.last().is_some_and(|last| *last != "..") {
                        components.pop();
                    } else if !self.is_absolute() {
                        components.push("..");
                    }
                }
                _ => components.push(part),
            }
        }
        let mut filepath = components.join("/");
        if self.is_absolute() {
            filepath.insert(0, '/');
        }
        if self.has_anchor() {
            format!("{}#{}", filepath, self.anchor())
        } else {
            filepath
        }
    }
}

impl<'a> From<&'a str> for AnchorPath<'a> {
    fn from(path: &'a str) -> Self {
        AnchorPath::new(path)
    }
}

impl<'a> From<&'a String> for AnchorPath<'a> {
    fn from(path: &'a String) -> Self {
        AnchorPath::new(path.as_str())
    }
}

impl Display for AnchorPath<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}
