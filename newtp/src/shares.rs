// (c) 2025 Ross Younger

//! Share namespace
//!
//! A share is a named directory tree exposed to clients. Shares appear as the entries of the
//! virtual root, so a client path `/docs/a.txt` refers to `a.txt` within the share named `docs`.
//!
//! The namespace is built once at startup and never changes afterwards; connections hold it
//! through an `Arc` and read it without locking.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// Default number of shares a namespace can hold
pub const DEFAULT_CAPACITY: usize = 205;

/// A named, permissioned root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    name: String,
    root: PathBuf,
    writable: bool,
}

impl Share {
    /// The share's name, which is its path segment under the virtual root
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    /// The directory this share exposes
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
    /// Whether clients may modify this share
    #[must_use]
    pub fn writable(&self) -> bool {
        self.writable
    }
}

/// Errors in share definitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareError {
    /// The definition was not of the form `path=name`
    #[error("share definition {0:?} must be of the form PATH=NAME")]
    Syntax(String),
    /// The share name cannot be used as a path segment
    #[error("invalid share name {0:?}")]
    BadName(String),
    /// Two shares have the same name
    #[error("duplicate share name {0:?}")]
    Duplicate(String),
    /// The namespace is full
    #[error("too many shares (limit {0})")]
    Full(usize),
}

/// A share definition as written in configuration: `PATH=NAME`, optionally prefixed `ro:` or `rw:`.
///
/// Without a prefix the share is read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareSpec {
    /// Directory to expose
    pub path: PathBuf,
    /// Share name
    pub name: String,
    /// Whether clients may modify the share
    pub writable: bool,
}

impl ShareSpec {
    /// Constructor
    #[must_use]
    pub fn new<P: Into<PathBuf>, N: Into<String>>(path: P, name: N, writable: bool) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            writable,
        }
    }
}

impl std::fmt::Display for ShareSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = if self.writable { "rw" } else { "ro" };
        write!(f, "{mode}:{}={}", self.path.display(), self.name)
    }
}

fn valid_share_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\0'])
}

impl FromStr for ShareSpec {
    type Err = ShareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (writable, rest) = if let Some(r) = s.strip_prefix("rw:") {
            (true, r)
        } else if let Some(r) = s.strip_prefix("ro:") {
            (false, r)
        } else {
            (false, s)
        };
        // The name cannot contain '=' but the path might
        let Some((path, name)) = rest.rsplit_once('=') else {
            return Err(ShareError::Syntax(s.into()));
        };
        if path.is_empty() {
            return Err(ShareError::Syntax(s.into()));
        }
        if !valid_share_name(name) {
            return Err(ShareError::BadName(name.into()));
        }
        Ok(Self::new(path, name, writable))
    }
}

impl TryFrom<String> for ShareSpec {
    type Error = ShareError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShareSpec> for String {
    fn from(value: ShareSpec) -> Self {
        value.to_string()
    }
}

/// The table of shares
#[derive(Debug, Clone)]
pub struct ShareNamespace {
    /// Shares in the order they were added
    shares: Vec<Share>,
    /// Name to position in `shares`
    index: HashMap<String, usize>,
    capacity: usize,
}

impl Default for ShareNamespace {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ShareNamespace {
    /// Creates an empty namespace which can hold up to `capacity` shares
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            shares: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds a share.
    ///
    /// Returns false if the name is already taken or the table is full.
    pub fn add<N: Into<String>, P: Into<PathBuf>>(
        &mut self,
        name: N,
        root: P,
        writable: bool,
    ) -> bool {
        let name = name.into();
        if self.shares.len() >= self.capacity || self.index.contains_key(&name) {
            return false;
        }
        let _ = self.index.insert(name.clone(), self.shares.len());
        self.shares.push(Share {
            name,
            root: root.into(),
            writable,
        });
        true
    }

    /// Builds a namespace from a list of definitions
    pub fn from_specs(specs: &[ShareSpec]) -> Result<Self, ShareError> {
        let mut ns = Self::with_capacity(DEFAULT_CAPACITY);
        for spec in specs {
            if !valid_share_name(&spec.name) {
                return Err(ShareError::BadName(spec.name.clone()));
            }
            let root = std::path::absolute(&spec.path).unwrap_or_else(|_| spec.path.clone());
            if !ns.add(spec.name.as_str(), root, spec.writable) {
                return Err(if ns.len() >= ns.capacity {
                    ShareError::Full(ns.capacity)
                } else {
                    ShareError::Duplicate(spec.name.clone())
                });
            }
        }
        Ok(ns)
    }

    /// Looks up a share by name. Names are compared byte for byte.
    #[must_use]
    pub fn find(&self, name: &[u8]) -> Option<&Share> {
        let name = std::str::from_utf8(name).ok()?;
        self.index.get(name).map(|i| &self.shares[*i])
    }

    /// Iterates over the shares, always in the same order
    pub fn iter(&self) -> std::slice::Iter<'_, Share> {
        self.shares.iter()
    }

    /// Retrieves a share by its position in iteration order
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Share> {
        self.shares.get(position)
    }

    /// Number of shares
    #[must_use]
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    /// Is the namespace empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

impl<'a> IntoIterator for &'a ShareNamespace {
    type Item = &'a Share;
    type IntoIter = std::slice::Iter<'a, Share>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
