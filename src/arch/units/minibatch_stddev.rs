use ndarray::{Array4, ArrayView4, Axis, concatenate};

use crate::{GanErr, Result};

const EPSILON: f32 = 1e-8;

/// Appends the average standard deviation of each group of samples as an extra feature map.
///
/// The batch is split into `M = N / G` groups, sample `n` belongs to group `n % M`.
#[derive(Clone, Copy, Debug)]
pub struct MinibatchStddev {
    group_size: usize,
}

impl Default for MinibatchStddev {
    fn default() -> Self {
        Self { group_size: 4 }
    }
}

impl MinibatchStddev {
    /// Creates a new `MinibatchStddev`.
    ///
    /// # Arguments
    /// * `group_size` - The maximum amount of samples per group.
    pub fn new(group_size: usize) -> Self {
        Self { group_size }
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Computes the statistic and concatenates it onto `x` as channel `C + 1`.
    ///
    /// # Returns
    /// An `(N, C + 1, H, W)` array or an error if the batch can't be split in groups of
    /// `min(group_size, N)` samples.
    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (n, c, h, w) = x.dim();
        let g = self.group_size.min(n);

        if g == 0 || n % g != 0 {
            return Err(GanErr::BatchNotDivisible {
                batch: n,
                group: self.group_size,
            });
        }

        let m = n / g;
        let y = x.to_shape((g, m, c, h, w))?;
        let mean = y.mean_axis(Axis(0)).ok_or(GanErr::BatchNotDivisible {
            batch: n,
            group: self.group_size,
        })?;

        let deviations = &y - &mean.insert_axis(Axis(0));
        let variance = deviations
            .mapv(|v| v.powi(2))
            .mean_axis(Axis(0))
            .ok_or(GanErr::BatchNotDivisible {
                batch: n,
                group: self.group_size,
            })?;

        let stddev = variance.mapv(|v| (v + EPSILON).sqrt());
        let stats: Vec<f32> = stddev
            .outer_iter()
            .map(|group| group.mean().unwrap_or_default())
            .collect();

        let stat_map = Array4::from_shape_fn((n, 1, h, w), |(i, _, _, _)| stats[i % m]);
        Ok(concatenate(Axis(1), &[x, stat_map.view()])?)
    }
}
