use std::fmt;

/// Path of a collection: an odd number of segments, e.g. `users/u1/journals`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

/// Path of a document: an even number of segments, e.g. `users/u1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath {
    segments: Vec<String>,
}

/// A segment must be non-empty and must not contain `/`.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('/')
}

impl CollectionPath {
    pub fn root(id: impl Into<String>) -> Self {
        Self {
            segments: vec![id.into()],
        }
    }

    pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
        let mut segments = self.segments.clone();
        segments.push(id.into());
        DocumentPath { segments }
    }

    /// Last segment, the collection id used by collection-group queries.
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl DocumentPath {
    pub fn parse(raw: &str) -> Option<Self> {
        let segments: Vec<String> = raw.split('/').map(str::to_string).collect();
        if segments.len() % 2 != 0 || !segments.iter().all(|s| is_valid_segment(s)) {
            return None;
        }
        Some(Self { segments })
    }

    pub fn collection(&self, id: impl Into<String>) -> CollectionPath {
        let mut segments = self.segments.clone();
        segments.push(id.into());
        CollectionPath { segments }
    }

    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    pub fn is_descendant_of(&self, ancestor: &DocumentPath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments.starts_with(&ancestor.segments)
    }

    /// The document directly under `collection` that contains this path,
    /// if this path lies below `collection` at all.
    pub fn child_of(&self, collection: &CollectionPath) -> Option<DocumentPath> {
        let depth = collection.segments.len();
        if self.segments.len() <= depth || !self.segments.starts_with(&collection.segments) {
            return None;
        }
        Some(DocumentPath {
            segments: self.segments[..=depth].to_vec(),
        })
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
