//! Dense fixed-stride output for buffer/texture upload.
//!
//! Layout per cell (stride 4): `[value, 0, 0, count]`. Cell `(column, row)`
//! starts at `(column + row * columns) * stride`. Every reader of these
//! buffers depends on this layout; the parallel aggregation path writes the
//! same channels.

use grid_common::{AggregationError, Result};
use serde::Serialize;

use crate::bins::SortedBins;

/// Scalars per cell in the reference layout.
pub const DEFAULT_STRIDE: usize = 4;

/// Start of cell `(column, row)` in a dense buffer.
#[inline]
pub fn linear_index(column: usize, row: usize, columns: usize, stride: usize) -> usize {
    (column + row * columns) * stride
}

/// Immutable snapshot of one aggregation in dense form.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseAggregationBuffer {
    data: Vec<f32>,
    columns: usize,
    rows: usize,
    stride: usize,
}

impl DenseAggregationBuffer {
    /// A 0x0 buffer.
    pub fn empty(stride: usize) -> Self {
        Self {
            data: Vec::new(),
            columns: 0,
            rows: 0,
            stride,
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Raw bytes in native endianness, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of scalars.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The stride window of one cell.
    pub fn cell(&self, column: usize, row: usize) -> Option<&[f32]> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        let start = linear_index(column, row, self.columns, self.stride);
        self.data.get(start..start + self.stride)
    }

    /// Aggregated value of a cell (first channel).
    pub fn value(&self, column: usize, row: usize) -> Option<f32> {
        self.cell(column, row).map(|c| c[0])
    }

    /// Point count of a cell (last channel).
    pub fn count(&self, column: usize, row: usize) -> Option<f32> {
        self.cell(column, row).map(|c| c[self.stride - 1])
    }
}

/// Min/max records in the three channel layouts shaders expect.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SummaryRecords {
    /// `[max, 0, 0, min]`
    pub min_max: [f32; 4],
    /// `[max, 0, 0, total_count]`
    pub max: [f32; 4],
    /// `[min, 0, 0, total_count]`
    pub min: [f32; 4],
}

impl SummaryRecords {
    pub fn new(min_value: f64, max_value: f64, total_count: u64) -> Self {
        let (min, max, total) = (min_value as f32, max_value as f32, total_count as f32);
        Self {
            min_max: [max, 0.0, 0.0, min],
            max: [max, 0.0, 0.0, total],
            min: [min, 0.0, 0.0, total],
        }
    }

    pub fn from_bins(bins: &SortedBins) -> Self {
        Self::new(bins.min_value, bins.max_value, bins.total_count)
    }
}

/// Writes bins into a freshly allocated dense buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenseGridWriter {
    stride: usize,
    max_cells: usize,
}

impl DenseGridWriter {
    /// Create a writer. The stride needs room for the value and count
    /// channels.
    pub fn new(stride: usize) -> Result<Self> {
        if stride < 2 {
            return Err(AggregationError::config(format!(
                "dense stride must be >= 2, got {stride}"
            )));
        }
        Ok(Self {
            stride,
            max_cells: usize::MAX,
        })
    }

    /// Refuse to allocate grids with more than `max_cells` cells.
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells;
        self
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Write `bins` into a zeroed `columns x rows` buffer.
    ///
    /// A bin outside the grid fails with `GridGeometryMismatch`; it is
    /// never clipped.
    pub fn write(&self, bins: &SortedBins, columns: usize, rows: usize) -> Result<DenseAggregationBuffer> {
        let cells = columns
            .checked_mul(rows)
            .ok_or(AggregationError::GridTooLarge {
                cells: usize::MAX,
                limit: self.max_cells,
            })?;
        if cells > self.max_cells {
            return Err(AggregationError::GridTooLarge {
                cells,
                limit: self.max_cells,
            });
        }
        let len = cells
            .checked_mul(self.stride)
            .ok_or(AggregationError::GridTooLarge {
                cells,
                limit: self.max_cells,
            })?;

        let mut data = vec![0.0f32; len];
        for bin in &bins.bins {
            let (lon, lat) = (bin.key.lon_index, bin.key.lat_index);
            let in_bounds = lon >= 0 && lat >= 0 && (lon as u64) < columns as u64 && (lat as u64) < rows as u64;
            if !in_bounds {
                let err = AggregationError::GridGeometryMismatch {
                    column: lon,
                    row: lat,
                    columns,
                    rows,
                };
                tracing::error!(error = %err, "Bin outside dense grid");
                return Err(err);
            }

            let start = linear_index(lon as usize, lat as usize, columns, self.stride);
            data[start] = bin.value as f32;
            data[start + self.stride - 1] = bin.counts as f32;
        }

        Ok(DenseAggregationBuffer {
            data,
            columns,
            rows,
            stride: self.stride,
        })
    }
}

impl Default for DenseGridWriter {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            max_cells: usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::PointFields;
    use crate::bins::{AggregationRule, BinAggregator};
    use crate::hasher::{hash_points, HashOptions};
    use grid_common::{Identity, Point};

    fn bins_for(points: &[Point]) -> SortedBins {
        let hashed = hash_points(points, &PointFields, &HashOptions::projected(1.0, &Identity));
        BinAggregator::new(AggregationRule::Sum)
            .aggregate(&hashed.grid_hash, points, &PointFields)
            .unwrap()
    }

    #[test]
    fn test_layout() {
        let points = vec![
            Point::weighted(2.5, 1.5, 4.0),
            Point::weighted(2.6, 1.1, 1.0),
            Point::weighted(0.5, 0.5, 7.0),
        ];
        let buffer = DenseGridWriter::default().write(&bins_for(&points), 3, 2).unwrap();

        assert_eq!(buffer.len(), 3 * 2 * 4);
        // cell (2, 1) -> (2 + 1 * 3) * 4 = 20
        assert_eq!(&buffer.data()[20..24], &[5.0, 0.0, 0.0, 2.0]);
        assert_eq!(buffer.cell(0, 0).unwrap(), &[7.0, 0.0, 0.0, 1.0]);
        assert_eq!(buffer.value(1, 0), Some(0.0));
        assert_eq!(buffer.count(2, 1), Some(2.0));
        assert_eq!(buffer.cell(3, 0), None);
    }

    #[test]
    fn test_out_of_bounds_fails_loudly() {
        let points = vec![Point::new(5.5, 0.5)];
        let err = DenseGridWriter::default().write(&bins_for(&points), 3, 3).unwrap_err();
        assert_eq!(
            err,
            AggregationError::GridGeometryMismatch {
                column: 5,
                row: 0,
                columns: 3,
                rows: 3
            }
        );
    }

    #[test]
    fn test_negative_index_fails() {
        let points = vec![Point::new(-0.5, 0.5)];
        let err = DenseGridWriter::default().write(&bins_for(&points), 3, 3).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_custom_stride_puts_count_last() {
        let points = vec![Point::weighted(0.5, 0.5, 3.0)];
        let buffer = DenseGridWriter::new(2).unwrap().write(&bins_for(&points), 1, 1).unwrap();
        assert_eq!(buffer.data(), &[3.0, 1.0]);
        assert!(DenseGridWriter::new(1).is_err());
    }

    #[test]
    fn test_cell_budget() {
        let writer = DenseGridWriter::default().with_max_cells(100);
        let err = writer.write(&SortedBins::empty(), 20, 20).unwrap_err();
        assert_eq!(err, AggregationError::GridTooLarge { cells: 400, limit: 100 });
        assert!(writer.write(&SortedBins::empty(), usize::MAX, 2).is_err());
    }

    #[test]
    fn test_summary_records() {
        let summary = SummaryRecords::new(1.5, 9.0, 12);
        assert_eq!(summary.min_max, [9.0, 0.0, 0.0, 1.5]);
        assert_eq!(summary.max, [9.0, 0.0, 0.0, 12.0]);
        assert_eq!(summary.min, [1.5, 0.0, 0.0, 12.0]);
    }

    #[test]
    fn test_byte_view() {
        let points = vec![Point::new(0.5, 0.5)];
        let buffer = DenseGridWriter::default().write(&bins_for(&points), 1, 1).unwrap();
        assert_eq!(buffer.as_bytes().len(), 16);
        assert_eq!(&buffer.as_bytes()[0..4], &1.0f32.to_ne_bytes());
    }
}
