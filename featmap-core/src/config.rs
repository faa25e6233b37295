//! # Acesso Tipado à Configuração
//!
//! A configuração é uma tabela TOML aninhada. Cada analisador é descrito por
//! uma entrada `[[analyzers]]`, e cada filtro por uma tabela `{type = "..."}`:
//!
//! ```toml
//! [[analyzers]]
//! method = "ngram-pos"
//! ngram = 2
//! crf-prefix = "modelos/crf"
//! filter = [{type = "icu-tokenizer"}, {type = "ptb-normalizer"}]
//! ```
//!
//! As funções abaixo leem um valor e, em caso de problema, devolvem um
//! [`AnalyzerError`] que nomeia a seção e a chave.

use toml::{Table, Value};

use crate::error::{AnalyzerError, Result};

/// Lê uma string obrigatória
pub fn required_str<'a>(table: &'a Table, section: &str, key: &str) -> Result<&'a str> {
    optional_str(table, section, key)?.ok_or_else(|| AnalyzerError::missing(section, key))
}

/// Lê uma string opcional; presença com outro tipo é erro
pub fn optional_str<'a>(table: &'a Table, section: &str, key: &str) -> Result<Option<&'a str>> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(AnalyzerError::invalid(
            section,
            key,
            format!("esperava string, encontrou {}", other.type_str()),
        )),
    }
}

/// Lê um inteiro não-negativo obrigatório
pub fn required_uint(table: &Table, section: &str, key: &str) -> Result<u64> {
    match table.get(key) {
        None => Err(AnalyzerError::missing(section, key)),
        Some(Value::Integer(i)) => u64::try_from(*i)
            .map_err(|_| AnalyzerError::invalid(section, key, format!("{i} é negativo"))),
        Some(other) => Err(AnalyzerError::invalid(
            section,
            key,
            format!("esperava inteiro, encontrou {}", other.type_str()),
        )),
    }
}

/// Lê um booleano opcional
pub fn optional_bool(table: &Table, section: &str, key: &str) -> Result<Option<bool>> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::Boolean(b)) => Ok(Some(*b)),
        Some(other) => Err(AnalyzerError::invalid(
            section,
            key,
            format!("esperava booleano, encontrou {}", other.type_str()),
        )),
    }
}

/// Lê um array opcional de strings
pub fn optional_str_array(table: &Table, section: &str, key: &str) -> Result<Option<Vec<String>>> {
    let Some(value) = table.get(key) else {
        return Ok(None);
    };
    let items = value.as_array().ok_or_else(|| {
        AnalyzerError::invalid(
            section,
            key,
            format!("esperava array, encontrou {}", value.type_str()),
        )
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| AnalyzerError::invalid(section, key, "todos os itens devem ser strings"))
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Lê um array obrigatório de strings
pub fn required_str_array(table: &Table, section: &str, key: &str) -> Result<Vec<String>> {
    optional_str_array(table, section, key)?.ok_or_else(|| AnalyzerError::missing(section, key))
}

/// Lê um array obrigatório de tabelas (ex: `[[analyzers]]` ou `filter = [{...}]`)
pub fn table_array<'a>(table: &'a Table, section: &str, key: &str) -> Result<Vec<&'a Table>> {
    let value = table.get(key).ok_or_else(|| AnalyzerError::missing(section, key))?;
    let items = value.as_array().ok_or_else(|| {
        AnalyzerError::invalid(
            section,
            key,
            format!("esperava array de tabelas, encontrou {}", value.type_str()),
        )
    })?;
    items
        .iter()
        .map(|item| {
            item.as_table()
                .ok_or_else(|| AnalyzerError::invalid(section, key, "todos os itens devem ser tabelas"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Table {
        text.parse::<Table>().expect("toml válido")
    }

    #[test]
    fn test_required_str() {
        let t = parse("method = \"ngram-word\"");
        assert_eq!(required_str(&t, "analyzers", "method").unwrap(), "ngram-word");
        assert!(matches!(
            required_str(&t, "analyzers", "outro"),
            Err(AnalyzerError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_required_uint_rejects_negative_and_wrong_type() {
        let t = parse("a = -1\nb = \"2\"\nc = 3");
        assert!(matches!(
            required_uint(&t, "s", "a"),
            Err(AnalyzerError::InvalidParameter { .. })
        ));
        assert!(matches!(
            required_uint(&t, "s", "b"),
            Err(AnalyzerError::InvalidParameter { .. })
        ));
        assert_eq!(required_uint(&t, "s", "c").unwrap(), 3);
    }

    #[test]
    fn test_table_array_inline_tables() {
        let t = parse("filter = [{type = \"icu-tokenizer\"}, {type = \"lowercase\"}]");
        let filters = table_array(&t, "s", "filter").unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[1]["type"].as_str(), Some("lowercase"));
    }

    #[test]
    fn test_str_array() {
        let t = parse("features = [\"depth\", \"branch\"]\nbad = [1]");
        assert_eq!(required_str_array(&t, "tree", "features").unwrap(), vec!["depth", "branch"]);
        assert!(required_str_array(&t, "tree", "bad").is_err());
        assert_eq!(optional_str_array(&t, "tree", "none").unwrap(), None);
    }
}
