//! Compressed sparse row output for one-hot heavy matrices

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Matrix in compressed sparse row layout.
///
/// Row `i` holds the entries `indptr[i]..indptr[i + 1]` of `indices`/`data`.
/// Zeros are not stored; NaN is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    pub n_rows: usize,
    pub n_cols: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<f64>,
}

impl CsrMatrix {
    /// Compress a dense matrix
    pub fn from_dense(dense: &Array2<f64>) -> Self {
        let (n_rows, n_cols) = dense.dim();
        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();

        indptr.push(0);
        for row in dense.rows() {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    indices.push(j);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }

        Self { n_rows, n_cols, indptr, indices, data }
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.n_rows, self.n_cols));
        for i in 0..self.n_rows {
            for k in self.indptr[i]..self.indptr[i + 1] {
                dense[[i, self.indices[k]]] = self.data[k];
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_csr_layout() {
        let dense = array![[0.0, 1.0, 0.0], [2.5, 0.0, 1.0]];
        let csr = CsrMatrix::from_dense(&dense);

        assert_eq!(csr.shape(), (2, 3));
        assert_eq!(csr.indptr, vec![0, 1, 3]);
        assert_eq!(csr.indices, vec![1, 0, 2]);
        assert_eq!(csr.nnz(), 3);
        assert_eq!(csr.to_dense(), dense);
    }
}
