//! Sparse lexical index (BM25)
//!
//! Wraps an in-RAM tantivy index over the full chunk corpus. Built once
//! via the two-phase `build` constructor and immutable afterwards; there
//! is deliberately no incremental update path, so a corpus rebuild always
//! rebuilds this index together with the vector index.
//!
//! Documents and queries go through the same analyzer (simple tokenizer +
//! lowercase), i.e. lower-cased maximal alphanumeric runs with everything
//! else treated as a separator.

use std::collections::HashMap;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, STORED, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument, Term};

use crate::error::{DocragError, Result};

/// BM25 index over the chunk corpus.
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    fields: LexicalFields,
}

#[derive(Clone, Copy)]
struct LexicalFields {
    chunk_id: Field,
    text: Field,
}

impl std::fmt::Debug for LexicalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalIndex")
            .field("num_docs", &self.num_docs())
            .finish_non_exhaustive()
    }
}

impl LexicalIndex {
    /// Build the index over the entire corpus, given `(chunk_id, text)`
    /// pairs in id order.
    ///
    /// An empty corpus builds successfully; `score` then returns no
    /// entries (every chunk scores 0).
    pub fn build(chunks: &[(i64, String)]) -> Result<Self> {
        let schema = build_schema();
        let fields = extract_fields(&schema)?;

        let index = Index::create_in_ram(schema);
        let mut writer = index.writer(15_000_000)?;

        for (chunk_id, text) in chunks {
            let mut doc = TantivyDocument::new();
            doc.add_i64(fields.chunk_id, *chunk_id);
            doc.add_text(fields.text, text);
            writer.add_document(doc)?;
        }
        writer.commit()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        reader.reload()?;

        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    /// BM25 scores for one query over the whole corpus.
    ///
    /// Returns a `chunk_id -> score` map; chunks without an entry scored
    /// 0 (no query term matched). A query that tokenizes to zero terms
    /// returns an empty map, never an error. Callable repeatedly without
    /// rebuilding.
    pub fn score(&self, query: &str) -> Result<HashMap<i64, f32>> {
        let searcher = self.reader.searcher();
        let num_docs = searcher.num_docs() as usize;
        if num_docs == 0 {
            return Ok(HashMap::new());
        }

        let terms = self.query_terms(query)?;
        if terms.is_empty() {
            return Ok(HashMap::new());
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .iter()
            .map(|term| {
                let term = Term::from_field_text(self.fields.text, term);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        // Every matching document, not a top-N cut: fusion selects the
        // candidate subset itself.
        let top_docs = searcher.search(&query, &TopDocs::with_limit(num_docs))?;

        let mut scores = HashMap::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            if let Some(chunk_id) = doc
                .get_first(self.fields.chunk_id)
                .and_then(|v| v.as_i64())
            {
                scores.insert(chunk_id, score);
            }
        }
        Ok(scores)
    }

    /// Tokenize a query with the text field's own analyzer so query terms
    /// land in the indexed term space.
    fn query_terms(&self, query: &str) -> Result<Vec<String>> {
        let mut analyzer = self.index.tokenizer_for_field(self.fields.text)?;
        let mut terms = Vec::new();
        let mut stream = analyzer.token_stream(query);
        while stream.advance() {
            terms.push(stream.token().text.clone());
        }
        Ok(terms)
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    pub fn is_empty(&self) -> bool {
        self.num_docs() == 0
    }
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    let text_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );

    builder.add_i64_field("chunk_id", STORED);
    builder.add_text_field("text", text_options);

    builder.build()
}

fn extract_fields(schema: &Schema) -> Result<LexicalFields> {
    let field = |name: &str| {
        schema.get_field(name).map_err(|_| {
            DocragError::SearchIndex(tantivy::TantivyError::SchemaError(format!(
                "missing {name} field"
            )))
        })
    };
    Ok(LexicalFields {
        chunk_id: field("chunk_id")?,
        text: field("text")?,
    })
}
