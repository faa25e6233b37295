//! # CRF — Conditional Random Field Linear-Chain
//!
//! Rotulação de sequências (ex: classes gramaticais) com um CRF de cadeia
//! linear. O modelo é carregado de disco uma vez e depois apenas lido; todos
//! os clones de um analisador compartilham a mesma instância via `Arc`.
//!
//! ## Estrutura do Modelo
//!
//! Score total de uma sequência de rótulos:
//!
//! ```text
//! score(y, x) = Σ_i [emission(x_i, y_i) + transition(y_{i-1}, y_i)]
//! emission(x_i, l) = Σ_k valor_k · observation_weights[feature_k][l]
//! ```
//!
//! A decodificação fica em [`viterbi`](crate::viterbi).
//!
//! ## Formato em Disco
//!
//! Um diretório (o "prefixo") contém `crf.json` com os rótulos e os pesos, e
//! `feature.mapping.json` com o vocabulário de features
//! (ver [`SequenceAnalyzer`](crate::features::SequenceAnalyzer)).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AnalyzerError, Result};
use crate::features::{FeatureId, Observation, Sequence};
use crate::viterbi::{compute_emission_scores, viterbi_decode, ViterbiResult};

/// Índice de um rótulo no modelo
pub type LabelId = usize;

/// Arquivo de pesos dentro do prefixo do modelo
pub const MODEL_FILE: &str = "crf.json";

/// Modelo CRF: rótulos, pesos de observação `[feature][rótulo]` e de
/// transição `[anterior][próximo]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrfModel {
    labels: Vec<String>,
    observation_weights: Vec<Vec<f64>>,
    transition_weights: Vec<Vec<f64>>,
}

impl CrfModel {
    /// Modelo com pesos zerados
    pub fn new(labels: Vec<String>, num_features: usize) -> Self {
        let n = labels.len();
        Self {
            labels,
            observation_weights: vec![vec![0.0; n]; num_features],
            transition_weights: vec![vec![0.0; n]; n],
        }
    }

    /// Carrega `prefix/crf.json`, validando as dimensões.
    pub fn load(prefix: impl AsRef<Path>) -> Result<Self> {
        let path = Self::model_path(prefix.as_ref());
        let model: CrfModel = read_json(&path)?;
        model
            .validate()
            .map_err(|reason| AnalyzerError::ModelFormat {
                path: path.clone(),
                reason,
            })?;
        info!(
            path = %path.display(),
            labels = model.num_labels(),
            features = model.num_features(),
            "modelo CRF carregado"
        );
        Ok(model)
    }

    /// Grava `prefix/crf.json`
    pub fn save(&self, prefix: impl AsRef<Path>) -> Result<()> {
        write_json(&Self::model_path(prefix.as_ref()), self)
    }

    pub fn model_path(prefix: &Path) -> PathBuf {
        prefix.join(MODEL_FILE)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let n = self.labels.len();
        if n == 0 {
            return Err("conjunto de rótulos vazio".to_string());
        }
        if self.transition_weights.len() != n
            || self.transition_weights.iter().any(|row| row.len() != n)
        {
            return Err(format!("matriz de transição precisa ser {n}×{n}"));
        }
        if let Some(f) = self.observation_weights.iter().position(|row| row.len() != n) {
            return Err(format!("feature {f}: esperava {n} pesos"));
        }
        let all_finite = self
            .observation_weights
            .iter()
            .chain(&self.transition_weights)
            .flatten()
            .all(|w| w.is_finite());
        if !all_finite {
            return Err("peso não finito".to_string());
        }
        Ok(())
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn num_features(&self) -> usize {
        self.observation_weights.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, id: LabelId) -> &str {
        &self.labels[id]
    }

    pub fn label_id(&self, label: &str) -> Option<LabelId> {
        self.labels.iter().position(|l| l == label)
    }

    /// Configura um peso de observação
    pub fn set_emission(&mut self, feature: FeatureId, label: LabelId, weight: f64) {
        self.observation_weights[feature][label] = weight;
    }

    /// Configura um peso de transição
    pub fn set_transition(&mut self, from: LabelId, to: LabelId, weight: f64) {
        self.transition_weights[from][to] = weight;
    }

    /// `Σ valor · peso[feature][label]`; features fora do modelo valem 0
    pub fn emission_score(&self, obs: &Observation, label: LabelId) -> f64 {
        obs.features
            .iter()
            .filter_map(|&(fid, value)| {
                self.observation_weights
                    .get(fid)
                    .map(|row| value * row[label])
            })
            .sum()
    }

    pub fn transition_score(&self, prev: LabelId, next: LabelId) -> f64 {
        self.transition_weights[prev][next]
    }

    pub fn make_tagger(&self) -> Tagger<'_> {
        Tagger {
            model: self,
            emission: Vec::new(),
        }
    }
}

/// Rotulador com buffer de scores reaproveitado entre sentenças.
#[derive(Debug)]
pub struct Tagger<'a> {
    model: &'a CrfModel,
    emission: Vec<Vec<f64>>,
}

impl Tagger<'_> {
    /// Atribui a cada observação o rótulo da melhor sequência.
    pub fn tag(&mut self, seq: &mut Sequence) -> ViterbiResult {
        compute_emission_scores(self.model, seq, &mut self.emission);
        let result = viterbi_decode(self.model, &self.emission);
        for (obs, &label) in seq.iter_mut().zip(&result.best_sequence) {
            obs.label = Some(label);
        }
        result
    }
}

/// Lê um JSON do modelo: ausente/ilegível → `ModelLoad`, malformado → `ModelFormat`
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|source| AnalyzerError::ModelLoad {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| AnalyzerError::ModelFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Grava um JSON, criando o diretório se necessário
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source: std::io::Error| AnalyzerError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    serde_json::to_writer(&mut writer, value).map_err(|e| io_err(e.into()))?;
    writer.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_emission_score() {
        let mut model = CrfModel::new(labels(&["DT", "NN"]), 3);
        model.set_emission(1, 1, 2.5);
        model.set_emission(2, 1, -1.0);

        let mut obs = Observation::new("dog");
        obs.features = vec![(1, 1.0), (2, 2.0)];
        assert!((model.emission_score(&obs, 1) - 0.5).abs() < 1e-9);
        assert!(model.emission_score(&obs, 0).abs() < 1e-9);

        // Feature fora do modelo é ignorada
        obs.features = vec![(7, 1.0)];
        assert_eq!(model.emission_score(&obs, 1), 0.0);
    }

    #[test]
    fn test_transition_score() {
        let mut model = CrfModel::new(labels(&["DT", "NN"]), 0);
        model.set_transition(0, 1, 3.0);
        assert!((model.transition_score(0, 1) - 3.0).abs() < 1e-9);
        assert!(model.transition_score(1, 0).abs() < 1e-9);
        assert_eq!(model.label_id("NN"), Some(1));
        assert_eq!(model.label(0), "DT");
    }

    #[test]
    fn test_tagger_labels_sequence() {
        let mut model = CrfModel::new(labels(&["DT", "NN"]), 2);
        model.set_emission(0, 0, 1.0);
        model.set_emission(1, 1, 1.0);

        let mut seq = Sequence::from_symbols(["the", "dog"]);
        for (i, obs) in seq.iter_mut().enumerate() {
            obs.features = vec![(i, 1.0)];
        }
        let result = model.make_tagger().tag(&mut seq);
        assert_eq!(result.best_sequence, vec![0, 1]);
        assert_eq!(seq.labels(), Some(vec![0, 1]));
    }

    #[test]
    fn test_tagger_reused_across_sequences() {
        let mut model = CrfModel::new(labels(&["DT", "NN"]), 2);
        model.set_emission(0, 0, 1.0);
        model.set_emission(1, 1, 1.0);
        let with_features = |features: &[usize]| {
            let mut seq = Sequence::from_symbols(features.iter().map(|f| f.to_string()));
            for (obs, &f) in seq.iter_mut().zip(features) {
                obs.features = vec![(f, 1.0)];
            }
            seq
        };

        let mut tagger = model.make_tagger();
        let long = tagger.tag(&mut with_features(&[1, 1, 0, 1]));
        assert_eq!(long.best_sequence, vec![1, 1, 0, 1]);

        // Sequência mais curta depois da longa: nenhuma linha antiga sobra no buffer
        let mut short = with_features(&[0]);
        let reused = tagger.tag(&mut short);
        let fresh = model.make_tagger().tag(&mut with_features(&[0]));
        assert_eq!(reused, fresh);
        assert_eq!(short.labels(), Some(vec![0]));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = CrfModel::new(labels(&["A", "B", "C"]), 4);
        model.set_emission(3, 2, 0.75);
        model.set_transition(2, 0, -1.5);
        model.save(dir.path()).unwrap();

        let loaded = CrfModel::load(dir.path()).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_load_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let err = CrfModel::load(dir.path().join("nada")).unwrap_err();
        assert!(matches!(err, AnalyzerError::ModelLoad { .. }));
        assert!(err.is_model_load());
    }

    #[test]
    fn test_load_malformed_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MODEL_FILE);

        fs::write(&path, "{ não é json").unwrap();
        assert!(matches!(
            CrfModel::load(dir.path()),
            Err(AnalyzerError::ModelFormat { .. })
        ));

        fs::write(
            &path,
            r#"{"labels":["A","B"],"observation_weights":[[0.0,1.0]],"transition_weights":[[0.0]]}"#,
        )
        .unwrap();
        assert!(matches!(
            CrfModel::load(dir.path()),
            Err(AnalyzerError::ModelFormat { .. })
        ));

        fs::write(
            &path,
            r#"{"labels":[],"observation_weights":[],"transition_weights":[]}"#,
        )
        .unwrap();
        assert!(CrfModel::load(dir.path()).unwrap_err().is_model_load());
    }
}
