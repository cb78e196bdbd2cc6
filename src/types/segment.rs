//! Parsed document input: segments and heading paths.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The kind of content a parsed segment carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Body text (paragraphs, list items)
    Text,
    /// Table serialized as Markdown or delimited rows
    Table,
    /// Vision-generated description of an image or chart
    #[serde(alias = "image")]
    ImageDescription,
}

impl SegmentKind {
    /// Whether this segment is prose that goes through sentence segmentation.
    pub fn is_prose(&self) -> bool {
        matches!(self, SegmentKind::Text | SegmentKind::ImageDescription)
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKind::Text => write!(f, "text"),
            SegmentKind::Table => write!(f, "table"),
            SegmentKind::ImageDescription => write!(f, "image_description"),
        }
    }
}

/// Ordered ancestor headings, outermost first.
///
/// Backed by a shared immutable slice: cloning is a reference-count bump and
/// the path can never be edited once built.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HeadingPath(Arc<[String]>);

impl Default for HeadingPath {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl HeadingPath {
    /// Build a path from heading strings, outermost first.
    pub fn new<I, S>(headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(headings.into_iter().map(Into::into).collect())
    }

    /// The root (empty) path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Number of headings in the path.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn headings(&self) -> &[String] {
        &self.0
    }

    /// A new path with one more heading appended; `self` is untouched.
    pub fn child(&self, heading: impl Into<String>) -> Self {
        let mut headings = self.0.to_vec();
        headings.push(heading.into());
        Self(headings.into())
    }

    /// The outermost `depth` headings.
    pub fn truncated(&self, depth: usize) -> Self {
        if depth >= self.depth() {
            return self.clone();
        }
        Self(self.0[..depth].into())
    }

    /// Number of leading headings shared with `other`.
    pub fn common_prefix_len(&self, other: &HeadingPath) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Join the headings with `separator`, e.g. `"1장 > 개요 > 배경"`.
    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

impl fmt::Debug for HeadingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl Serialize for HeadingPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.headings().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HeadingPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let headings = Vec::<String>::deserialize(deserializer)?;
        Ok(Self(headings.into()))
    }
}

/// A unit produced by the upstream document parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Kind of content
    #[serde(rename = "type")]
    pub kind: SegmentKind,

    /// Raw text, or structured text for tables
    pub content: String,

    /// Ancestor headings at parse time
    #[serde(default)]
    pub heading_path: HeadingPath,

    /// Page number in the source file
    #[serde(default)]
    pub page: Option<u32>,

    /// Position in the document; strictly increasing
    pub order: u64,
}

impl Segment {
    /// Create a text segment.
    pub fn text(order: u64, content: impl Into<String>, heading_path: HeadingPath) -> Self {
        Self {
            kind: SegmentKind::Text,
            content: content.into(),
            heading_path,
            page: None,
            order,
        }
    }

    /// Create a table segment.
    pub fn table(order: u64, content: impl Into<String>, heading_path: HeadingPath) -> Self {
        Self {
            kind: SegmentKind::Table,
            content: content.into(),
            heading_path,
            page: None,
            order,
        }
    }

    /// Create an image-description segment.
    pub fn image(order: u64, content: impl Into<String>, heading_path: HeadingPath) -> Self {
        Self {
            kind: SegmentKind::ImageDescription,
            content: content.into(),
            heading_path,
            page: None,
            order,
        }
    }

    /// Set the page number.
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Whether the segment carries nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A parsed document handed to the chunking engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier, usually the file name
    pub source: String,

    /// Segments in document order
    #[serde(default)]
    pub segments: Vec<Segment>,

    /// Extra fields merged verbatim into every chunk (e.g. `last_modified`)
    #[serde(default)]
    pub extra_metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// Create a document with no extra metadata.
    pub fn new(source: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            source: source.into(),
            segments,
            extra_metadata: serde_json::Map::new(),
        }
    }

    /// Attach one extra metadata field.
    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra_metadata.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_path_is_shared_not_copied() {
        let path = HeadingPath::new(["1장", "개요"]);
        let child = path.child("배경");

        assert_eq!(path.depth(), 2);
        assert_eq!(child.join(" > "), "1장 > 개요 > 배경");
        assert_eq!(child.common_prefix_len(&path), 2);
        assert_eq!(child.truncated(1).join(" > "), "1장");
    }

    #[test]
    fn test_segment_deserializes_parser_output() {
        let json = serde_json::json!({
            "type": "image",
            "content": "> **[이미지/차트 설명 1]**\n> 매출 추이",
            "heading_path": ["2장", "실적"],
            "page": 3,
            "order": 7
        });
        let segment: Segment = serde_json::from_value(json).unwrap();

        assert_eq!(segment.kind, SegmentKind::ImageDescription);
        assert_eq!(segment.heading_path.depth(), 2);
        assert_eq!(segment.page, Some(3));
        assert!(segment.kind.is_prose());
    }
}
