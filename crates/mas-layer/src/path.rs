//! Addressing layers from the root.

use std::fmt;

/// Child names leading from the root layer to a descendant.
///
/// The empty path designates the root itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerPath(Vec<String>);

impl LayerPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated path; empty segments are ignored.
    pub fn parse(s: &str) -> Self {
        Self(s.split('/').filter(|seg| !seg.is_empty()).map(str::to_owned).collect())
    }

    /// This path extended by one child name.
    pub fn child(&self, name: &str) -> Self {
        let mut segs = self.0.clone();
        segs.push(name.to_owned());
        Self(segs)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if `self` equals `other` or lies below it.
    pub fn is_within(&self, other: &LayerPath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl<S: AsRef<str>> FromIterator<S> for LayerPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| s.as_ref().to_owned()).collect())
    }
}

impl fmt::Display for LayerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.0 {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}
