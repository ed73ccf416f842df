//! Domain types shared by the lexical, vector and hybrid engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type DocId = String;

/// Separator between the fields of a [`DocId`]. Utterances and model names are
/// free text, so a control character keeps the composed id unambiguous.
pub const ID_DELIMITER: char = '\u{1f}';

/// The level of the page model an utterance is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Page,
    Element,
    Task,
    Step,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [Self::Page, Self::Element, Self::Task, Self::Step];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Element => "element",
            Self::Task => "task",
            Self::Step => "step",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Restricts a search to one document type, or none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchScope {
    #[default]
    All,
    Pages,
    Elements,
    Tasks,
    Steps,
}

impl SearchScope {
    pub fn matches(self, doc_type: DocumentType) -> bool {
        match self {
            Self::All => true,
            Self::Pages => doc_type == DocumentType::Page,
            Self::Elements => doc_type == DocumentType::Element,
            Self::Tasks => doc_type == DocumentType::Task,
            Self::Steps => doc_type == DocumentType::Step,
        }
    }
}

impl FromStr for SearchScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "page" | "pages" => Ok(Self::Pages),
            "element" | "elements" => Ok(Self::Elements),
            "task" | "tasks" => Ok(Self::Tasks),
            "step" | "steps" => Ok(Self::Steps),
            other => Err(Error::InvalidConfig(format!("unknown search scope '{other}'"))),
        }
    }
}

/// Denormalized context copied onto every indexed utterance so results can be
/// presented without going back to the model source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchContext {
    pub page_name: String,
    pub page_description: String,
    pub page_url: String,
    pub element_name: Option<String>,
    pub task_name: Option<String>,
    pub step_description: Option<String>,
}

/// One searchable unit: a single utterance plus its owning context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedUtterance {
    pub id: DocId,
    pub doc_type: DocumentType,
    pub text: String,
    pub context: SearchContext,
}

impl IndexedUtterance {
    pub fn new(doc_type: DocumentType, text: impl Into<String>, context: SearchContext) -> Self {
        let text = text.into();
        let id = Self::make_id(doc_type, &context, &text);
        Self { id, doc_type, text, context }
    }

    /// Composes `type | page | element | task | step | text`. Absent optional
    /// fields still occupy their slot so distinct tuples never collide.
    pub fn make_id(doc_type: DocumentType, context: &SearchContext, text: &str) -> DocId {
        let fields = [
            doc_type.as_str(),
            context.page_name.as_str(),
            context.element_name.as_deref().unwrap_or(""),
            context.task_name.as_deref().unwrap_or(""),
            context.step_description.as_deref().unwrap_or(""),
            text,
        ];
        fields.join(&ID_DELIMITER.to_string())
    }
}

/// A page in the UI model together with everything nested under it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageModel {
    pub name: String,
    pub description: String,
    pub url: String,
    pub utterances: Vec<String>,
    pub elements: Vec<ElementModel>,
    pub tasks: Vec<TaskModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementModel {
    pub name: String,
    pub description: String,
    pub utterances: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskModel {
    pub name: String,
    pub description: String,
    pub utterances: Vec<String>,
    pub steps: Vec<StepModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepModel {
    pub description: String,
    pub utterances: Vec<String>,
}

/// Page identity returned by URL lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub name: String,
    pub description: String,
    pub url: String,
}

impl From<&PageModel> for PageSummary {
    fn from(page: &PageModel) -> Self {
        Self {
            name: page.name.clone(),
            description: page.description.clone(),
            url: page.url.clone(),
        }
    }
}

/// A ranked hit.
///
/// `similarity` is the raw cosine between query and utterance embeddings,
/// `lexical_score` the BM25 score, and `score` the fused, boosted value the
/// results are ordered by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: DocId,
    pub doc_type: DocumentType,
    pub page_name: String,
    pub page_description: String,
    pub page_url: String,
    pub similarity: f32,
    pub lexical_score: f32,
    pub score: f32,
    pub matched_utterance: String,
    pub context: SearchContext,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// Matches that survived scoring, before truncation to `max_results`.
    pub total_matches: usize,
    pub duration_ms: u64,
    pub error_message: Option<String>,
}

impl SearchResponse {
    pub fn failed(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            results: Vec::new(),
            total_matches: 0,
            duration_ms,
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub pages: usize,
    pub elements: usize,
    pub tasks: usize,
    pub steps: usize,
    pub total_documents: usize,
    pub unique_terms: usize,
    pub avg_doc_length: f32,
    pub embedding_dimension: Option<usize>,
    pub indexed_at: Option<DateTime<Utc>>,
}

impl IndexStatistics {
    pub fn count_for(&self, doc_type: DocumentType) -> usize {
        match doc_type {
            DocumentType::Page => self.pages,
            DocumentType::Element => self.elements,
            DocumentType::Task => self.tasks,
            DocumentType::Step => self.steps,
        }
    }
}
