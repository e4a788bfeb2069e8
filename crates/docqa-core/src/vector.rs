//! Vector helpers shared by index backends.
//!
//! - [`cosine_similarity`] ranks stored chunks against a query embedding.
//! - [`encode_f32`] / [`decode_f32`] store embeddings as little-endian
//!   `f32` BLOBs.

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Mismatched, empty, or zero-magnitude vectors score `0.0` so they sort
/// below any genuinely similar chunk instead of failing the query.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Encode an embedding as `len × 4` little-endian bytes.
pub fn encode_f32(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode bytes written by [`encode_f32`]. Trailing partial words are ignored.
pub fn decode_f32(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|w| f32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_encoding() {
        let v = vec![0.5f32, -3.0, 1e-3];
        let blob = encode_f32(&v);
        assert_eq!(blob.len(), 12);
        assert_eq!(decode_f32(&blob), v);
        assert_eq!(decode_f32(&blob[..5]).len(), 1);
    }

    #[test]
    fn test_similarity_ordering() {
        let q = [1.0, 0.0, 0.0];
        let near = [0.9, 0.1, 0.0];
        let far = [0.0, 1.0, 0.0];
        assert!(cosine_similarity(&q, &near) > cosine_similarity(&q, &far));
        assert!((cosine_similarity(&q, &q) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }
}
