// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Sentence pooling over token embeddings

use ndarray::{ArrayView2, ArrayView3, Axis};

/// Attention-masked mean pooling
///
/// `token_embeddings` is `[batch, seq_len, hidden_dim]` and
/// `attention_mask` is `[batch, seq_len]`; padding positions (mask 0) do not
/// contribute. Returns one `hidden_dim` vector per batch item.
pub fn mean_pool(
    token_embeddings: ArrayView3<'_, f32>,
    attention_mask: ArrayView2<'_, i64>,
) -> Vec<Vec<f32>> {
    token_embeddings
        .axis_iter(Axis(0))
        .zip(attention_mask.axis_iter(Axis(0)))
        .map(|(tokens, mask)| {
            let hidden_dim = tokens.shape()[1];
            let mut pooled = vec![0.0f32; hidden_dim];
            let mut sum_mask = 0.0f32;

            for (token, &mask_value) in tokens.axis_iter(Axis(0)).zip(mask.iter()) {
                let weight = mask_value as f32;
                sum_mask += weight;
                for (acc, value) in pooled.iter_mut().zip(token.iter()) {
                    *acc += value * weight;
                }
            }

            let denom = sum_mask.max(1e-9);
            for value in &mut pooled {
                *value /= denom;
            }
            pooled
        })
        .collect()
}

/// Scales `vector` to unit length in place; zero vectors are left untouched
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
