use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use intentdb_core::config::SearchConfig;
use intentdb_core::error::Error;
use intentdb_core::traits::{Embedder, ModelSource};
use intentdb_core::types::{
    DocId, DocumentType, IndexStatistics, IndexedUtterance, PageModel, PageSummary, SearchContext,
    SearchResponse, SearchResult,
};
use intentdb_embed::cosine_similarity;
use intentdb_text::{LexicalIndex, Tokenizer};
use intentdb_vector::EmbeddingIndex;

use crate::request::SearchRequest;
use crate::url_match::UrlMatcher;

/// Everything a search reads. Rebuilt as a whole and swapped in atomically.
struct IndexState {
    documents: HashMap<DocId, IndexedUtterance>,
    lexical: LexicalIndex,
    embeddings: EmbeddingIndex,
    pages: Vec<PageSummary>,
    urls: UrlMatcher,
    indexed_at: Option<DateTime<Utc>>,
}

impl IndexState {
    fn empty(tokenizer: Tokenizer) -> Self {
        Self {
            documents: HashMap::new(),
            lexical: LexicalIndex::new(tokenizer),
            embeddings: EmbeddingIndex::new(),
            pages: Vec::new(),
            urls: UrlMatcher::default(),
            indexed_at: None,
        }
    }

    fn statistics(&self) -> IndexStatistics {
        let mut stats = IndexStatistics {
            total_documents: self.documents.len(),
            unique_terms: self.lexical.unique_terms(),
            avg_doc_length: self.lexical.avg_doc_length(),
            embedding_dimension: self.embeddings.dimension(),
            indexed_at: self.indexed_at,
            ..Default::default()
        };
        for doc in self.documents.values() {
            match doc.doc_type {
                DocumentType::Page => stats.pages += 1,
                DocumentType::Element => stats.elements += 1,
                DocumentType::Task => stats.tasks += 1,
                DocumentType::Step => stats.steps += 1,
            }
        }
        stats
    }
}

/// Hybrid BM25 + embedding search over the utterances of a page model.
///
/// `initialize` may be called any number of times; each call replaces the
/// whole index. Searches share a read lock and always see either the previous
/// or the new index in full.
pub struct HybridSearchEngine {
    source: Box<dyn ModelSource>,
    embedder: Arc<dyn Embedder>,
    config: SearchConfig,
    tokenizer: Tokenizer,
    state: RwLock<IndexState>,
    rebuild_lock: Mutex<()>,
}

impl HybridSearchEngine {
    pub fn new(source: Box<dyn ModelSource>, embedder: Arc<dyn Embedder>, config: SearchConfig) -> Self {
        let tokenizer = Tokenizer::from_config(&config);
        Self {
            source,
            embedder,
            config,
            state: RwLock::new(IndexState::empty(tokenizer.clone())),
            tokenizer,
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Rebuilds both indexes from the model source.
    ///
    /// Provider and source failures propagate; the previous index stays in
    /// place when a rebuild fails.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<IndexStatistics> {
        let _rebuild = self.rebuild_lock.lock().await;
        let started = Instant::now();

        let pages = self.source.load_pages().context("loading page models")?;
        let mut next = IndexState::empty(self.tokenizer.clone());
        for page in &pages {
            self.index_page(&mut next, page).await?;
        }
        next.lexical.recompute_average_length();
        next.urls = UrlMatcher::new(next.pages.iter());
        next.indexed_at = Some(Utc::now());

        let stats = next.statistics();
        *self.state.write().await = next;
        info!(
            documents = stats.total_documents,
            pages = stats.pages,
            elements = stats.elements,
            tasks = stats.tasks,
            steps = stats.steps,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search index rebuilt"
        );
        Ok(stats)
    }

    async fn index_page(&self, state: &mut IndexState, page: &PageModel) -> Result<()> {
        state.pages.push(PageSummary::from(page));
        let page_ctx = SearchContext {
            page_name: page.name.clone(),
            page_description: page.description.clone(),
            page_url: page.url.clone(),
            ..Default::default()
        };
        self.index_utterances(state, DocumentType::Page, &page.utterances, &page_ctx).await?;

        for element in &page.elements {
            let ctx = SearchContext { element_name: Some(element.name.clone()), ..page_ctx.clone() };
            self.index_utterances(state, DocumentType::Element, &element.utterances, &ctx).await?;
        }

        for task in &page.tasks {
            let task_ctx = SearchContext { task_name: Some(task.name.clone()), ..page_ctx.clone() };
            self.index_utterances(state, DocumentType::Task, &task.utterances, &task_ctx).await?;
            for step in &task.steps {
                let ctx = SearchContext { step_description: Some(step.description.clone()), ..task_ctx.clone() };
                self.index_utterances(state, DocumentType::Step, &step.utterances, &ctx).await?;
            }
        }
        Ok(())
    }

    async fn index_utterances(
        &self,
        state: &mut IndexState,
        doc_type: DocumentType,
        utterances: &[String],
        ctx: &SearchContext,
    ) -> Result<()> {
        for utterance in utterances {
            if utterance.trim().is_empty() {
                continue;
            }
            let doc = IndexedUtterance::new(doc_type, utterance.as_str(), ctx.clone());
            if state.documents.contains_key(&doc.id) {
                debug!(page = %ctx.page_name, utterance = %utterance, "duplicate utterance skipped");
                continue;
            }
            let vector = self.embedder.embed(utterance).await.with_context(|| {
                format!("embedding {doc_type} utterance '{utterance}' of page '{}'", ctx.page_name)
            })?;
            state.embeddings.insert(doc.id.clone(), vector)?;
            state.lexical.add_document(&doc.id, &doc.text);
            state.documents.insert(doc.id.clone(), doc);
        }
        Ok(())
    }

    /// Ranked search. Never fails: problems are reported through
    /// [`SearchResponse::error_message`] with an empty result list.
    #[instrument(skip(self, request), fields(query = %request.query, scope = ?request.scope))]
    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        let started = Instant::now();
        if request.query.trim().is_empty() {
            return SearchResponse::failed(Error::EmptyQuery.to_string(), elapsed_ms(started));
        }

        let outcome = match request.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.execute(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::Cancelled.into()),
            },
            None => self.execute(request).await,
        };

        match outcome {
            Ok((results, total_matches)) => {
                debug!(returned = results.len(), total_matches, "search complete");
                SearchResponse { results, total_matches, duration_ms: elapsed_ms(started), error_message: None }
            }
            Err(e) => {
                let message = format!("{e:#}");
                warn!(error = %message, "search failed");
                SearchResponse::failed(message, elapsed_ms(started))
            }
        }
    }

    /// Search with the configured defaults for result count, threshold and
    /// scope.
    pub async fn search_simple(&self, query: &str) -> SearchResponse {
        self.search(&SearchRequest::with_defaults(query, &self.config)).await
    }

    async fn execute(&self, request: &SearchRequest) -> Result<(Vec<SearchResult>, usize)> {
        let cancel = &request.cancel;
        ensure_active(cancel)?;

        let state = self.state.read().await;
        if state.documents.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let query_vector = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled.into()),
            vector = self.embedder.embed(&request.query) => vector.context("embedding query")?,
        };
        if let Some(expected) = state.embeddings.dimension() {
            if query_vector.len() != expected {
                return Err(Error::DimensionMismatch { expected, actual: query_vector.len() }.into());
            }
        }
        if query_vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::Provider(format!("{} returned a non-finite query embedding", self.embedder.id())).into());
        }
        ensure_active(cancel)?;

        let tokenizer = state.lexical.tokenizer();
        let terms = tokenizer.expand(&tokenizer.tokenize(&request.query));
        let mut candidates = state.lexical.candidates(&terms, self.config.max_lexical_candidates);
        if candidates.is_empty() {
            debug!("no lexical overlap; scanning every embedding");
            candidates = state.embeddings.sorted_ids();
        }

        let mut results = Vec::new();
        for id in &candidates {
            ensure_active(cancel)?;
            let Some(doc) = state.documents.get(id) else {
                continue;
            };
            if !request.scope.matches(doc.doc_type) {
                continue;
            }
            let Some(vector) = state.embeddings.get(id) else {
                continue;
            };
            let similarity = cosine_similarity(&query_vector, vector);
            let lexical_score = state.lexical.bm25(&terms, id);
            if lexical_score == 0.0 && similarity < request.min_similarity {
                continue;
            }
            let boost = self.config.boosts.for_type(doc.doc_type);
            let score = (similarity * self.config.embedding_weight + lexical_score * self.config.lexical_weight) * boost;
            results.push(SearchResult {
                id: doc.id.clone(),
                doc_type: doc.doc_type,
                page_name: doc.context.page_name.clone(),
                page_description: doc.context.page_description.clone(),
                page_url: doc.context.page_url.clone(),
                similarity,
                lexical_score,
                score,
                matched_utterance: doc.text.clone(),
                context: doc.context.clone(),
            });
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        let total = results.len();
        results.truncate(request.max_results);
        Ok((results, total))
    }

    pub async fn get_index_statistics(&self) -> IndexStatistics {
        self.state.read().await.statistics()
    }

    pub async fn is_indexed(&self) -> bool {
        self.state.read().await.indexed_at.is_some()
    }

    /// The page whose URL best matches `url`: exact, then `regex:` pattern,
    /// then `*` wildcard, then longest prefix.
    pub async fn find_page_by_url(&self, url: &str) -> Option<PageSummary> {
        self.state.read().await.urls.find(url).cloned()
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled.into());
    }
    Ok(())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
