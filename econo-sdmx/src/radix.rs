//! Mixed-radix conversion between flat observation indices and per-dimension
//! indices.
//!
//! With dimension sizes `s_0 .. s_{d-1}` in declared order, flat index `i`
//! decodes to `idx_k = (i / prod_{j>k} s_j) mod s_k`.

use crate::SdmxError;

/// Decode a flat index into per-dimension indices.
///
/// # Errors
/// `IndexOutOfRange` when `index` exceeds the cube volume, `Malformed` when
/// any size is zero.
pub fn decode_index(index: usize, sizes: &[usize]) -> Result<Vec<usize>, SdmxError> {
    if sizes.iter().any(|&s| s == 0) {
        return Err(SdmxError::Malformed("zero-sized dimension".into()));
    }
    let volume: usize = sizes.iter().product();
    if index >= volume {
        return Err(SdmxError::IndexOutOfRange {
            index,
            size: volume,
        });
    }
    let mut out = vec![0usize; sizes.len()];
    let mut rest = index;
    for (k, &size) in sizes.iter().enumerate().rev() {
        out[k] = rest % size;
        rest /= size;
    }
    Ok(out)
}

/// Recompose a flat index from per-dimension indices. Inverse of
/// [`decode_index`].
///
/// # Errors
/// `Malformed` on length mismatch or an index exceeding its dimension size.
pub fn encode_index(indices: &[usize], sizes: &[usize]) -> Result<usize, SdmxError> {
    if indices.len() != sizes.len() {
        return Err(SdmxError::Malformed(format!(
            "index rank {} != dimension rank {}",
            indices.len(),
            sizes.len()
        )));
    }
    let mut flat = 0usize;
    for (k, (&idx, &size)) in indices.iter().zip(sizes).enumerate() {
        if idx >= size {
            return Err(SdmxError::Malformed(format!(
                "index {idx} out of range for dimension {k} of size {size}"
            )));
        }
        flat = flat * size + idx;
    }
    Ok(flat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_matches_hand_computation() {
        // sizes [2, 3, 4]: strides are 12, 4, 1.
        assert_eq!(decode_index(0, &[2, 3, 4]).unwrap(), vec![0, 0, 0]);
        assert_eq!(decode_index(5, &[2, 3, 4]).unwrap(), vec![0, 1, 1]);
        assert_eq!(decode_index(23, &[2, 3, 4]).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!(matches!(
            decode_index(24, &[2, 3, 4]),
            Err(SdmxError::IndexOutOfRange { index: 24, size: 24 })
        ));
    }
}
