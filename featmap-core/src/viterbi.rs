//! # Algoritmo de Viterbi — Decodificação de Sequências CRF
//!
//! O algoritmo de Viterbi é um método de **programação dinâmica** que encontra
//! a sequência de rótulos de maior score de forma eficiente.
//!
//! ## Intuição
//!
//! Com L rótulos e T posições, uma busca exaustiva teria complexidade
//! `O(L^T)`. O Viterbi explora que a **melhor sequência até a posição i com
//! rótulo l** depende apenas da **melhor sequência até i-1 com algum rótulo
//! anterior** → `O(T × L²)`.
//!
//! ## Algoritmo
//!
//! ```text
//! Inicialização: viterbi[0][l] = emission[0][l]
//!
//! Recursão: viterbi[i][l] = max_{l'} [viterbi[i-1][l'] + transition(l', l)] + emission[i][l]
//!
//! Backtracking: reconstrói o caminho ótimo de trás pra frente
//! ```
//!
//! Empates são resolvidos a favor do **menor índice de rótulo**, o que torna
//! a decodificação determinística.

use serde::{Deserialize, Serialize};

use crate::crf::{CrfModel, LabelId};
use crate::features::Sequence;

/// Resultado do Viterbi
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViterbiResult {
    /// Sequência de rótulos de maior score (um por posição)
    pub best_sequence: Vec<LabelId>,
    /// Score (não-normalizado) da melhor sequência
    pub best_score: f64,
}

/// Preenche `emission[i][l]` para cada posição de `seq`, reaproveitando o buffer.
pub fn compute_emission_scores(model: &CrfModel, seq: &Sequence, emission: &mut Vec<Vec<f64>>) {
    let n_labels = model.num_labels();
    emission.resize_with(seq.len(), Vec::new);
    for (row, obs) in emission.iter_mut().zip(seq.iter()) {
        row.clear();
        row.extend((0..n_labels).map(|l| model.emission_score(obs, l)));
    }
}

/// Executa o Viterbi sobre uma tabela de scores de emissão `[posição][rótulo]`.
pub fn viterbi_decode(model: &CrfModel, emission: &[Vec<f64>]) -> ViterbiResult {
    if emission.is_empty() || model.num_labels() == 0 {
        return ViterbiResult {
            best_sequence: vec![],
            best_score: 0.0,
        };
    }

    let n_positions = emission.len();
    let n_labels = model.num_labels();

    // Melhor score acumulado por rótulo na posição atual
    let mut viterbi: Vec<f64> = emission[0].clone();
    // backptr[i][l] = rótulo anterior que maximiza o score
    let mut backptr: Vec<Vec<LabelId>> = vec![vec![0; n_labels]; n_positions];
    let mut next = vec![f64::NEG_INFINITY; n_labels];

    for i in 1..n_positions {
        for l in 0..n_labels {
            let mut best_prev_score = f64::NEG_INFINITY;
            let mut best_prev = 0;
            for (prev, &score) in viterbi.iter().enumerate() {
                let candidate = score + model.transition_score(prev, l);
                // `>` estrito: empate fica com o menor índice
                if candidate > best_prev_score {
                    best_prev_score = candidate;
                    best_prev = prev;
                }
            }
            next[l] = best_prev_score + emission[i][l];
            backptr[i][l] = best_prev;
        }
        std::mem::swap(&mut viterbi, &mut next);
    }

    // === Backtracking ===
    let (mut best_last, best_score) = best_in_slice(&viterbi);
    let mut best_sequence = vec![0; n_positions];
    best_sequence[n_positions - 1] = best_last;
    for i in (1..n_positions).rev() {
        best_last = backptr[i][best_last];
        best_sequence[i - 1] = best_last;
    }

    ViterbiResult {
        best_sequence,
        best_score,
    }
}

/// Score de uma sequência de rótulos específica
pub fn sequence_score(model: &CrfModel, emission: &[Vec<f64>], labels: &[LabelId]) -> f64 {
    labels
        .iter()
        .enumerate()
        .map(|(i, &l)| {
            let transition = if i > 0 {
                model.transition_score(labels[i - 1], l)
            } else {
                0.0
            };
            emission[i][l] + transition
        })
        .sum()
}

/// Retorna (índice, valor) do primeiro máximo em um slice
fn best_in_slice(scores: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, &score) in scores.iter().enumerate() {
        if score > best.1 {
            best = (i, score);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn model(n_labels: usize, transitions: &[f64]) -> CrfModel {
        let labels = (0..n_labels).map(|l| format!("L{l}")).collect();
        let mut model = CrfModel::new(labels, 0);
        for from in 0..n_labels {
            for to in 0..n_labels {
                model.set_transition(from, to, transitions[from * n_labels + to]);
            }
        }
        model
    }

    /// Enumera todas as L^T sequências
    fn brute_force(model: &CrfModel, emission: &[Vec<f64>]) -> f64 {
        let n_labels = model.num_labels();
        let total = n_labels.pow(emission.len() as u32);
        (0..total)
            .map(|mut code| {
                let labels: Vec<LabelId> = (0..emission.len())
                    .map(|_| {
                        let l = code % n_labels;
                        code /= n_labels;
                        l
                    })
                    .collect();
                sequence_score(model, emission, &labels)
            })
            .fold(f64::NEG_INFINITY, f64::max)
    }

    #[test]
    fn test_viterbi_follows_transitions() {
        // Emissão favorece rótulo 0 em ambas as posições, mas 0→0 é proibitivo
        let m = model(2, &[-10.0, 0.0, 0.0, 0.0]);
        let emission = vec![vec![2.0, 0.0], vec![1.0, 0.0]];
        let result = viterbi_decode(&m, &emission);
        assert_eq!(result.best_sequence, vec![0, 1]);
        assert!((result.best_score - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_viterbi_empty() {
        let m = model(2, &[0.0; 4]);
        let result = viterbi_decode(&m, &[]);
        assert!(result.best_sequence.is_empty());
    }

    #[test]
    fn test_ties_prefer_lowest_label() {
        let m = model(3, &[0.0; 9]);
        let emission = vec![vec![1.0, 1.0, 1.0]; 3];
        let result = viterbi_decode(&m, &emission);
        assert_eq!(result.best_sequence, vec![0, 0, 0]);
    }

    #[test]
    fn test_deterministic() {
        let m = model(2, &[0.5, -0.5, 0.25, 0.0]);
        let emission = vec![vec![0.1, 0.2], vec![0.3, -0.1], vec![0.0, 0.0]];
        assert_eq!(viterbi_decode(&m, &emission), viterbi_decode(&m, &emission));
    }

    proptest! {
        #[test]
        fn test_viterbi_matches_brute_force(
            n_labels in 1usize..=3,
            n_positions in 1usize..=4,
            weights in prop::collection::vec(-5.0f64..5.0, 9 + 12),
        ) {
            let m = model(n_labels, &weights[..n_labels * n_labels]);
            let emission: Vec<Vec<f64>> = (0..n_positions)
                .map(|i| weights[9 + i * 3..9 + i * 3 + n_labels].to_vec())
                .collect();

            let result = viterbi_decode(&m, &emission);
            let best = brute_force(&m, &emission);
            prop_assert_eq!(result.best_sequence.len(), n_positions);
            prop_assert!((result.best_score - best).abs() < 1e-9);
            prop_assert!((sequence_score(&m, &emission, &result.best_sequence) - best).abs() < 1e-9);
        }
    }
}
