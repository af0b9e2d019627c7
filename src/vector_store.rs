//! In-memory vector store for document-grounded generation
//!
//! Chunks are kept per participant in insertion order. Search is a brute
//! force cosine scan, which is plenty for a handful of uploaded documents.

use crate::conversation::ParticipantId;
use crate::error::{DuetError, Result};
use crate::logging;
use crate::services::EmbeddingService;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Approximate characters per word used to turn a character budget into a
/// word budget.
pub const CHARS_PER_WORD: usize = 5;

// ============ Types ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub start_index: usize,
    pub end_index: usize,
}

impl DocumentChunk {
    /// Chunk ids are derived from the owning document and ordinal.
    pub fn chunk_id(document_id: &str, index: usize) -> String {
        format!("{}-{}", document_id, index)
    }

    pub fn is_embedded(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    pub content: String,
    pub participant_id: ParticipantId,
    #[serde(default)]
    pub chunks: Vec<DocumentChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub document_id: String,
    pub document_name: String,
    pub chunk_id: String,
    pub content: String,
    pub score: f64,
}

// ============ Chunking ============

/// Split `text` into overlapping word windows.
///
/// `chunk_size` and `overlap` are character budgets converted to words at
/// ~5 chars/word. Offsets refer to the whitespace-normalized text (words
/// joined by single spaces). Fails if the stride would not advance.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<TextChunk>> {
    let words_per_chunk = chunk_size / CHARS_PER_WORD;
    let overlap_words = overlap / CHARS_PER_WORD;
    if words_per_chunk == 0 || words_per_chunk <= overlap_words {
        return Err(DuetError::InvalidConfig(format!(
            "chunk size {} must exceed overlap {} by at least {} characters",
            chunk_size, overlap, CHARS_PER_WORD
        )));
    }
    let stride = words_per_chunk - overlap_words;

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut start_word = 0;
    let mut char_index = 0;

    while start_word < words.len() {
        let end_word = (start_word + words_per_chunk).min(words.len());
        let content = words[start_word..end_word].join(" ");
        let len = content.chars().count();
        chunks.push(TextChunk {
            content,
            start_index: char_index,
            end_index: char_index + len,
        });

        if end_word >= words.len() {
            break;
        }

        let consumed: usize = words[start_word..start_word + stride]
            .iter()
            .map(|w| w.chars().count() + 1)
            .sum();
        char_index += consumed;
        start_word += stride;
    }

    Ok(chunks)
}

/// Cosine similarity. Returns 0.0 for empty, mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-12 {
        0.0
    } else {
        dot / denom
    }
}

// ============ Store ============

#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    chunks: HashMap<ParticipantId, Vec<DocumentChunk>>,
    document_names: HashMap<String, String>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append chunks for a participant. No deduplication.
    pub fn add_chunks(&mut self, participant: ParticipantId, chunks: Vec<DocumentChunk>) {
        self.chunks.entry(participant).or_default().extend(chunks);
    }

    /// Register a document's name and index its chunks.
    pub fn add_document(&mut self, document: &Document) {
        self.document_names
            .insert(document.id.clone(), document.name.clone());
        self.add_chunks(document.participant_id, document.chunks.clone());
    }

    pub fn remove_document(&mut self, participant: ParticipantId, document_id: &str) {
        if let Some(chunks) = self.chunks.get_mut(&participant) {
            chunks.retain(|c| c.document_id != document_id);
        }
        self.document_names.remove(document_id);
    }

    pub fn chunks(&self, participant: ParticipantId) -> &[DocumentChunk] {
        self.chunks
            .get(&participant)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_embedded_chunks(&self, participant: ParticipantId) -> bool {
        self.chunks(participant).iter().any(|c| c.is_embedded())
    }

    pub fn clear(&mut self, participant: ParticipantId) {
        self.chunks.insert(participant, Vec::new());
    }

    pub fn clear_all(&mut self) {
        self.chunks.clear();
        self.document_names.clear();
    }

    /// Top-K chunks by cosine similarity, best first. Chunks without an
    /// embedding are skipped; equal scores keep insertion order.
    pub fn search_similar(
        &self,
        participant: ParticipantId,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Vec<RetrievalResult> {
        let mut scored: Vec<(&DocumentChunk, f64)> = self
            .chunks(participant)
            .iter()
            .filter(|c| c.is_embedded())
            .filter_map(|c| {
                let embedding = c.embedding.as_deref()?;
                Some((c, cosine_similarity(query_embedding, embedding)))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(top_k)
            .map(|(chunk, score)| RetrievalResult {
                document_id: chunk.document_id.clone(),
                document_name: self
                    .document_names
                    .get(&chunk.document_id)
                    .cloned()
                    .unwrap_or_else(|| chunk.document_id.clone()),
                chunk_id: chunk.id.clone(),
                content: chunk.content.clone(),
                score,
            })
            .collect()
    }
}

// ============ Ingestion / retrieval ============

/// Chunk and embed a document without touching any store. Fails as a whole
/// if any chunk fails to embed.
pub async fn embed_document(
    participant: ParticipantId,
    name: &str,
    content: &str,
    embedder: &dyn EmbeddingService,
    chunk_size: usize,
    overlap: usize,
) -> Result<Document> {
    if content.trim().is_empty() {
        return Err(DuetError::EmptyDocument);
    }

    let document_id = Uuid::new_v4().to_string();
    let text_chunks = chunk_text(content, chunk_size, overlap)?;

    let mut chunks = Vec::with_capacity(text_chunks.len());
    for (index, chunk) in text_chunks.into_iter().enumerate() {
        let embedding = embedder.embed(&chunk.content).await?;
        chunks.push(DocumentChunk {
            id: DocumentChunk::chunk_id(&document_id, index),
            document_id: document_id.clone(),
            content: chunk.content,
            embedding: Some(embedding),
            start_index: chunk.start_index,
            end_index: chunk.end_index,
        });
    }

    logging::log_retrieval(None, &format!(
        "Embedded document '{}' for participant {} ({} chunks)",
        name,
        participant.as_str(),
        chunks.len()
    ));

    Ok(Document {
        id: document_id,
        name: name.to_string(),
        content: content.to_string(),
        participant_id: participant,
        chunks,
    })
}

/// Embed and index a document in one step.
pub async fn ingest_document(
    store: &mut VectorStore,
    participant: ParticipantId,
    name: &str,
    content: &str,
    embedder: &dyn EmbeddingService,
    chunk_size: usize,
    overlap: usize,
) -> Result<Document> {
    let document = embed_document(participant, name, content, embedder, chunk_size, overlap).await?;
    store.add_document(&document);
    Ok(document)
}

/// Embed `query` and search. A blank query yields no results and makes no
/// embedding call.
pub async fn retrieve(
    store: &VectorStore,
    participant: ParticipantId,
    query: &str,
    embedder: &dyn EmbeddingService,
    top_k: usize,
) -> Result<Vec<RetrievalResult>> {
    if query.trim().is_empty() || !store.has_embedded_chunks(participant) {
        return Ok(Vec::new());
    }
    let query_embedding = embedder.embed(query).await?;
    Ok(store.search_similar(participant, &query_embedding, top_k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text as letter-frequency counts over a..e
    struct LetterEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingService for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(['a', 'b', 'c', 'd', 'e']
                .iter()
                .map(|l| text.chars().filter(|c| c == l).count() as f32)
                .collect())
        }
    }

    fn chunk(doc: &str, index: usize, embedding: Option<Vec<f32>>) -> DocumentChunk {
        DocumentChunk {
            id: DocumentChunk::chunk_id(doc, index),
            document_id: doc.to_string(),
            content: format!("{} chunk {}", doc, index),
            embedding,
            start_index: 0,
            end_index: 1,
        }
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_chunk_text_reconstructs_word_sequence() {
        let text = words(57);
        // 10 words per chunk, 2 overlap, stride 8
        let chunks = chunk_text(&text, 50, 10).unwrap();
        assert_eq!(chunks.len(), 7);

        let mut rebuilt: Vec<String> = Vec::new();
        for (i, c) in chunks.iter().enumerate() {
            assert!(c.start_index < c.end_index);
            let normalized: String = text.chars().skip(c.start_index).take(c.end_index - c.start_index).collect();
            assert_eq!(normalized, c.content);
            let skip = if i == 0 { 0 } else { 2 };
            rebuilt.extend(c.content.split(' ').skip(skip).map(String::from));
        }
        assert_eq!(rebuilt.join(" "), text);
    }

    #[test]
    fn test_chunk_text_normalizes_whitespace() {
        let chunks = chunk_text("  alpha \n beta\t\tgamma  ", 500, 50).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "alpha beta gamma");
        assert_eq!((chunks[0].start_index, chunks[0].end_index), (0, 16));
        assert!(chunk_text("   ", 500, 50).unwrap().is_empty());
    }

    #[test]
    fn test_chunk_text_rejects_non_advancing_stride() {
        assert!(matches!(chunk_text("a b c", 50, 50), Err(DuetError::InvalidConfig(_))));
        assert!(matches!(chunk_text("a b c", 54, 50), Err(DuetError::InvalidConfig(_))));
        assert!(matches!(chunk_text("a b c", 4, 0), Err(DuetError::InvalidConfig(_))));
        // 6 words vs 5 overlap: stride 1, still terminates
        let chunks = chunk_text(&words(9), 30, 25).unwrap();
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_search_sorted_and_bounded() {
        let mut store = VectorStore::new();
        store.add_chunks(
            ParticipantId::A,
            vec![
                chunk("d1", 0, Some(vec![0.0, 1.0])),
                chunk("d1", 1, None),
                chunk("d1", 2, Some(vec![1.0, 0.0])),
                chunk("d1", 3, Some(vec![1.0, 1.0])),
                chunk("d1", 4, Some(vec![])),
                chunk("d1", 5, Some(vec![2.0, 0.0])),
            ],
        );

        let results = store.search_similar(ParticipantId::A, &[1.0, 0.0], 3);
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // equal scores keep insertion order
        assert_eq!(results[0].chunk_id, "d1-2");
        assert_eq!(results[1].chunk_id, "d1-5");
        assert_eq!(results[2].chunk_id, "d1-3");
        assert_eq!(results[0].document_name, "d1");

        assert!(store.search_similar(ParticipantId::B, &[1.0, 0.0], 3).is_empty());
        assert_eq!(store.search_similar(ParticipantId::A, &[1.0, 0.0], 10).len(), 4);
    }

    #[test]
    fn test_remove_document_drops_chunks() {
        let mut store = VectorStore::new();
        store.add_chunks(ParticipantId::B, vec![chunk("d1", 0, Some(vec![1.0])), chunk("d2", 0, Some(vec![1.0]))]);
        store.remove_document(ParticipantId::B, "d1");
        assert_eq!(store.chunks(ParticipantId::B).len(), 1);
        assert_eq!(store.chunks(ParticipantId::B)[0].document_id, "d2");
    }

    #[tokio::test]
    async fn test_ingest_and_retrieve() {
        let embedder = LetterEmbedder { calls: AtomicUsize::new(0) };
        let mut store = VectorStore::new();

        let err = ingest_document(&mut store, ParticipantId::A, "empty", "  \n", &embedder, 500, 50)
            .await
            .unwrap_err();
        assert!(matches!(err, DuetError::EmptyDocument));

        let doc = ingest_document(
            &mut store,
            ParticipantId::A,
            "notes",
            "aaaa aaaa bbbb bbbb cccc cccc dddd dddd",
            &embedder,
            10,
            0,
        )
        .await
        .unwrap();
        assert_eq!(doc.chunks.len(), 4);
        assert_eq!(doc.chunks[1].id, format!("{}-1", doc.id));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);

        let results = retrieve(&store, ParticipantId::A, "ccc", &embedder, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "cccc cccc");
        assert_eq!(results[0].document_name, "notes");

        let before = embedder.calls.load(Ordering::SeqCst);
        assert!(retrieve(&store, ParticipantId::A, "   ", &embedder, 2).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), before);
    }
}
