//! # Erros de Construção de Analisadores
//!
//! Todos os erros do crate acontecem na **construção** (configuração inválida
//! ou modelo CRF ausente/corrompido). A análise de um documento nunca falha:
//! anomalias por documento (texto vazio, zero tokens, árvore ausente) apenas
//! resultam em um mapa de features menor.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Erro ao construir um analisador, filtro ou modelo.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalyzerError {
    /// `method` não registrado no [`Registry`](crate::registry::Registry)
    #[error("método de analisador desconhecido: {0}")]
    UnknownMethod(String),

    /// `type` de filtro/tokenizador não registrado
    #[error("tipo de filtro desconhecido: {0}")]
    UnknownFilter(String),

    /// Parâmetro obrigatório ausente em uma seção da configuração
    #[error("parâmetro obrigatório ausente em [{section}]: {key}")]
    MissingParameter {
        /// Seção (método ou tipo de filtro) sendo construída
        section: String,
        /// Chave esperada
        key: String,
    },

    /// Parâmetro presente mas com tipo ou valor inválido
    #[error("valor inválido para {key} em [{section}]: {reason}")]
    InvalidParameter {
        /// Seção (método ou tipo de filtro) sendo construída
        section: String,
        /// Chave com problema
        key: String,
        /// Descrição do problema
        reason: String,
    },

    /// A ordem dos descritores não forma uma cadeia válida
    /// (ex: filtro sem tokenizador, tokenizador no meio da cadeia)
    #[error("cadeia de filtros inválida: {0}")]
    InvalidChain(String),

    /// Arquivo do modelo ausente ou ilegível
    #[error("falha ao carregar modelo em {path:?}: {source}")]
    ModelLoad {
        /// Arquivo que se tentou ler
        path: PathBuf,
        /// Erro de IO original
        #[source]
        source: io::Error,
    },

    /// Arquivo do modelo lido, mas estruturalmente inválido
    #[error("modelo inválido em {path:?}: {reason}")]
    ModelFormat {
        /// Arquivo com problema
        path: PathBuf,
        /// Descrição da inconsistência
        reason: String,
    },

    /// Falha de IO fora do carregamento de modelos (ex: lista de stopwords)
    #[error("erro de IO em {path:?}: {source}")]
    Io {
        /// Arquivo envolvido
        path: PathBuf,
        /// Erro de IO original
        #[source]
        source: io::Error,
    },

    /// O pool de workers do rayon não pôde ser criado
    #[error("falha ao criar pool de workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl AnalyzerError {
    /// Erro de configuração (identificador desconhecido, parâmetro ausente ou malformado)
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            AnalyzerError::UnknownMethod(_)
                | AnalyzerError::UnknownFilter(_)
                | AnalyzerError::MissingParameter { .. }
                | AnalyzerError::InvalidParameter { .. }
                | AnalyzerError::InvalidChain(_)
                | AnalyzerError::Io { .. }
        )
    }

    /// Erro de carregamento do modelo CRF
    pub fn is_model_load(&self) -> bool {
        matches!(
            self,
            AnalyzerError::ModelLoad { .. } | AnalyzerError::ModelFormat { .. }
        )
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        AnalyzerError::MissingParameter {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        AnalyzerError::InvalidParameter {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Resultado padrão do crate
pub type Result<T> = std::result::Result<T, AnalyzerError>;
