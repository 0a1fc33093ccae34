use super::kmeans::{lloyd, KMeansInit, KMeansOptions};
use super::{check_n_clusters, relabel, AlgorithmParams, Clusterer};
use crate::error::BackendError;
use crate::space::PointSet;
use crate::types::{ClusterId, Distance, Position};
use crate::utilities::pairwise_squared_distances;

use nalgebra::{DMatrix, SymmetricEigen};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

/// Spectral clustering ("spectral"). Parameters: n_clusters, gamma, random_state.
///
/// 1. affinity w(i,j) = exp(-gamma * |x_i - x_j|^2);
/// 2. symmetric normalization M = D^-1/2 W D^-1/2 with the degree matrix D;
/// 3. the n_clusters leading eigenvectors of M as columns of an embedding, rows normalized to
///    unit length;
/// 4. k-means++ on the rows of the embedding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spectral;

impl Clusterer for Spectral {
    fn fit(&self, space: &PointSet, params: &AlgorithmParams) -> Result<Vec<ClusterId>, BackendError> {
        params.expect_only(&["n_clusters", "gamma", "random_state"])?;
        let n_clusters = params.usize_or("n_clusters", 8)?;
        check_n_clusters(n_clusters, space.n())?;
        let gamma = params.f64_or("gamma", 1.0)?;
        if gamma <= 0.0 {
            return Err(BackendError::InvalidParameter(format!("gamma must be positive, got {}", gamma)));
        }
        let mut rng = match params.opt_seed("random_state")? {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let m = normalized_affinity(space, gamma);
        let mut embedding = leading_eigenvectors(m, n_clusters);
        for row in embedding.iter_mut() {
            let norm = row.iter().map(|v| v * v).sum::<Distance>().sqrt();
            if norm > 0.0 {
                row.iter_mut().for_each(|v| *v /= norm);
            }
        }

        let options = KMeansOptions {
            n_clusters,
            init: KMeansInit::KMeansPlusPlus,
            n_init: 10,
            ..KMeansOptions::default()
        };
        let result = lloyd(&embedding, &options, &mut rng);
        Ok(relabel(&result.labels.into_iter().map(Some).collect::<Vec<_>>()))
    }
}

/// D^-1/2 W D^-1/2 for the rbf affinity W (with w(i,i) = 1, so every degree is at least 1).
fn normalized_affinity(space: &PointSet, gamma: f64) -> Vec<Vec<f64>> {
    let w: Vec<Vec<f64>> = pairwise_squared_distances(space)
        .into_par_iter()
        .map(|row| row.into_iter().map(|d| (-gamma * d).exp()).collect())
        .collect();
    let inv_sqrt_degree: Vec<f64> = w.iter().map(|row| 1.0 / row.iter().sum::<f64>().sqrt()).collect();
    w.into_par_iter()
        .enumerate()
        .map(|(i, row)| {
            row.into_iter()
                .zip(inv_sqrt_degree.iter())
                .map(|(w_ij, d_j)| inv_sqrt_degree[i] * w_ij * d_j)
                .collect()
        })
        .collect()
}

/// The eigenvectors of the symmetric matrix m belonging to its k largest eigenvalues, as the
/// columns of an n x k matrix stored by rows. Equal eigenvalues keep the solver's order.
fn leading_eigenvectors(m: Vec<Vec<f64>>, k: usize) -> Vec<Position> {
    let n = m.len();
    let matrix = DMatrix::from_row_iterator(n, n, m.into_iter().flatten());
    let eigen = SymmetricEigen::new(matrix);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    order.truncate(k);
    debug!(
        "leading eigenvalues {:?}",
        order.iter().map(|&c| eigen.eigenvalues[c]).collect::<Vec<f64>>()
    );
    (0..n)
        .map(|i| order.iter().map(|&c| eigen.eigenvectors[(i, c)]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::tests::{assert_recovers_blobs, three_blobs};

    #[test]
    fn recovers_blobs() {
        let params = AlgorithmParams::new().with("n_clusters", 3).with("gamma", 0.01).with("random_state", 3);
        assert_recovers_blobs(&Spectral.fit(&three_blobs(), &params).unwrap());
    }

    #[test]
    fn embedding_columns_are_orthonormal() {
        let space = PointSet::new(vec![vec![0.0], vec![0.5], vec![3.0], vec![3.2], vec![7.0]]).unwrap();
        let q = leading_eigenvectors(normalized_affinity(&space, 1.0), 3);
        assert_eq!(q.len(), 5);
        for c1 in 0..3 {
            for c2 in 0..3 {
                let dot: f64 = q.iter().map(|row| row[c1] * row[c2]).sum();
                let expected = if c1 == c2 { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-9, "columns {} and {}: {}", c1, c2, dot);
            }
        }
    }

    #[test]
    fn leading_eigenvectors_of_diagonal_matrix() {
        let m = vec![vec![0.2, 0.0, 0.0], vec![0.0, 0.9, 0.0], vec![0.0, 0.0, -0.5]];
        let q = leading_eigenvectors(m, 2);
        assert!((q[1][0].abs() - 1.0).abs() < 1e-9);
        assert!((q[0][1].abs() - 1.0).abs() < 1e-9);
        assert!(q[2].iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn gamma_must_be_positive() {
        let params = AlgorithmParams::new().with("n_clusters", 3).with("gamma", -1.0);
        assert!(matches!(Spectral.fit(&three_blobs(), &params), Err(BackendError::InvalidParameter(_))));
    }
}
