//! # Documento
//!
//! O armazenamento e o carregamento de corpora ficam fora deste crate; o
//! núcleo só enxerga um identificador e o conteúdo textual (UTF-8).

use serde::{Deserialize, Serialize};

/// Um documento do corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identificador do documento no corpus
    pub id: u64,
    content: String,
}

impl Document {
    pub fn new(id: u64, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Único acesso que os analisadores fazem ao documento.
///
/// Devolve uma cópia porque o fluxo de tokens toma posse do texto ao ser
/// reiniciado.
pub fn get_content(doc: &Document) -> String {
    doc.content.clone()
}
