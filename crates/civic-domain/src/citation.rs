//! Citations and canned responses

/// A numbered reference attached to a response
///
/// Cited inline from the response text via `[id]` markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Citation {
    /// 1-based identifier, unique within its response
    pub id: u32,

    /// Display label of the source (e.g., "IRS Checklist: What to Bring")
    pub source: String,

    /// Link to the source
    pub url: String,
}

impl Citation {
    /// Create a new citation
    pub fn new(id: u32, source: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            url: url.into(),
        }
    }
}

/// A response produced for one user turn
///
/// `text` carries plain text with embedded markup (`**bold**`,
/// `[label](url)` links and `[n]` citation markers). Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    /// Body text with embedded markup
    pub text: String,

    /// Ordered citation list
    pub citations: Vec<Citation>,
}

impl Response {
    /// Create a response with citations
    pub fn new(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            text: text.into(),
            citations,
        }
    }

    /// Create a response without citations
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    /// Look up a citation by id
    pub fn citation(&self, id: u32) -> Option<&Citation> {
        self.citations.iter().find(|c| c.id == id)
    }

    /// Ids that appear more than once in the citation list
    pub fn duplicate_citation_ids(&self) -> Vec<u32> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for citation in &self.citations {
            if !seen.insert(citation.id) && !duplicates.contains(&citation.id) {
                duplicates.push(citation.id);
            }
        }
        duplicates
    }
}
