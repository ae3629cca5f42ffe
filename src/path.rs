//! Canonical data paths
//!
//! `a[0].b`, `a.0.b` and `.a..0.b.` all normalize to the same path with
//! segments `["a", "0", "b"]`. The canonical dotted string is what the
//! registry uses as its cache key.

use std::fmt;

/// A normalized path into nested data
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The empty path, addressing the root
    pub fn root() -> Self {
        Self::default()
    }

    /// Normalize a dotted/bracketed path string
    pub fn parse(raw: &str) -> Self {
        let dotted = raw.replace('[', ".").replace(']', ".");
        let segments = dotted
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The dotted form used as cache and event key
    pub fn canonical(&self) -> String {
        self.segments.join(".")
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn child(&self, segment: impl Into<String>) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Segment-aware prefix test: `a` is a prefix of `a.b`, not of `ab.c`
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments.iter().zip(&prefix.segments).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<&str> for Path {
    fn from(raw: &str) -> Self {
        Path::parse(raw)
    }
}

/// Interpret a segment as a sequence index
pub fn index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// A step in an error path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// Render steps as `key.sub[0][1].leaf`
pub fn render(steps: &[Step]) -> String {
    let mut out = String::new();
    for step in steps {
        match step {
            Step::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Step::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_and_dot_equivalence() {
        assert_eq!(Path::parse("a[0].b"), Path::parse("a.0.b"));
        assert_eq!(Path::parse("a[0][1]").canonical(), "a.0.1");
    }

    #[test]
    fn test_collapse_dots() {
        assert_eq!(Path::parse(".a..b.").canonical(), "a.b");
        assert!(Path::parse("").is_root());
        assert!(Path::parse("...").is_root());
    }

    #[test]
    fn test_segment_aware_prefix() {
        let a = Path::parse("a");
        assert!(Path::parse("a.b").starts_with(&a));
        assert!(Path::parse("a").starts_with(&a));
        assert!(!Path::parse("ab.c").starts_with(&a));
        assert!(Path::parse("x").starts_with(&Path::root()));
    }

    #[test]
    fn test_index_segments() {
        assert_eq!(index("12"), Some(12));
        assert_eq!(index("-1"), None);
        assert_eq!(index("1a"), None);
    }

    #[test]
    fn test_render_steps() {
        let steps = vec![
            Step::Key("bar".into()),
            Step::Key("arrayObject".into()),
            Step::Index(0),
            Step::Key("array".into()),
            Step::Index(1),
            Step::Index(0),
        ];
        assert_eq!(render(&steps), "bar.arrayObject[0].array[1][0]");
        assert_eq!(render(&[Step::Index(2)]), "[2]");
    }
}
