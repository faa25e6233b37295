//! # Análise Paralela de um Corpus
//!
//! Cada worker recebe o seu próprio clone do analisador, feito em sequência
//! antes do trabalho paralelo começar. Nenhuma instância é usada por duas
//! threads; o modelo CRF (somente leitura) é compartilhado pelos clones via
//! `Arc`.
//!
//! Os documentos são divididos em blocos contíguos, um por worker, e os
//! resultados voltam na ordem original do corpus.

use rayon::prelude::*;
use tracing::debug;

use crate::analyzer::{Analyzer, FeatureMap, FeatureValue};
use crate::document::Document;
use crate::error::Result;

/// Analisa `docs` com `workers` threads a partir de um analisador protótipo.
///
/// `workers == 0` é tratado como 1.
pub fn analyze_corpus<T: FeatureValue>(
    prototype: &dyn Analyzer<T>,
    docs: &[Document],
    workers: usize,
) -> Result<Vec<FeatureMap<T>>> {
    if docs.is_empty() {
        return Ok(Vec::new());
    }

    let workers = workers.max(1);
    let chunk_size = docs.len().div_ceil(workers);
    let n_chunks = docs.len().div_ceil(chunk_size);

    // Clones feitos antes de qualquer trabalho paralelo
    let clones: Vec<Box<dyn Analyzer<T>>> = (0..n_chunks).map(|_| prototype.clone_box()).collect();

    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
    debug!(workers, chunks = n_chunks, docs = docs.len(), "analisando corpus");

    let per_chunk: Vec<Vec<FeatureMap<T>>> = pool.install(|| {
        clones
            .into_par_iter()
            .zip(docs.par_chunks(chunk_size))
            .map(|(mut analyzer, chunk)| {
                chunk
                    .iter()
                    .map(|doc| analyzer.analyze(doc))
                    .collect::<Vec<_>>()
            })
            .collect()
    });

    Ok(per_chunk.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram::{NgramWindow, NgramWordAnalyzer};
    use crate::tokenizer::WhitespaceTokenizer;

    fn prototype() -> NgramWordAnalyzer<u64> {
        NgramWordAnalyzer::new(NgramWindow::new(1).unwrap(), Box::new(WhitespaceTokenizer::new()))
    }

    fn corpus(n: u64) -> Vec<Document> {
        (0..n)
            .map(|i| Document::new(i, format!("doc{i} comum comum")))
            .collect()
    }

    #[test]
    fn test_matches_sequential() {
        let docs = corpus(23);
        let mut sequential = prototype();
        let expected: Vec<_> = docs.iter().map(|d| sequential.analyze(d)).collect();

        for workers in [0, 1, 4, 8, 50] {
            let result = analyze_corpus::<u64>(&prototype(), &docs, workers).unwrap();
            assert_eq!(result, expected, "workers = {workers}");
        }
    }

    #[test]
    fn test_preserves_order() {
        let docs = corpus(10);
        let result = analyze_corpus::<u64>(&prototype(), &docs, 3).unwrap();
        for (i, counts) in result.iter().enumerate() {
            assert_eq!(counts[&format!("doc{i}")], 1);
            assert_eq!(counts["comum"], 2);
        }
    }

    #[test]
    fn test_empty_corpus() {
        assert!(analyze_corpus::<u64>(&prototype(), &[], 4).unwrap().is_empty());
    }
}
