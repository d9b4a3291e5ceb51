use crate::dispatch_error::DispatchError;
use crate::kernel::{dot, Kernel};
use crate::matrix::{Matrix, ShapeError};
use crate::message::WorkItem;
use crate::result_store::ResultStore;
use crate::self_scheduled_problem::SelfScheduledProblem;
use crate::work_queue::WorkQueue;
use serde::{Deserialize, Serialize};

/// C = A·B, one work item per output cell, ids walked row-major
#[derive(Debug, Clone)]
pub struct MatMatProblem {
    a: Matrix,
    b: Matrix,
}

/// Row of A and column of B for a single output cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowColumn {
    pub row: Vec<f64>,
    pub column: Vec<f64>,
}

/// Dot product of the pair carried by the payload
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PairDotKernel;

impl Kernel<RowColumn> for PairDotKernel {
    fn compute(&self, pair: &RowColumn) -> f64 {
        dot(&pair.row, &pair.column)
    }
}

impl MatMatProblem {
    pub fn new(a: Matrix, b: Matrix) -> Result<Self, ShapeError> {
        if a.cols() != b.rows() {
            return Err(ShapeError::DimensionMismatch {
                lhs_rows: a.rows(),
                lhs_cols: a.cols(),
                rhs_rows: b.rows(),
                rhs_cols: b.cols(),
            });
        }
        Ok(Self { a, b })
    }

    /// `A[i][j] = i` (rows x cols), `B[i][j] = j` (cols x cols)
    pub fn sample(rows: usize, cols: usize) -> Self {
        Self {
            a: Matrix::from_fn(rows, cols, |i, _| i as f64),
            b: Matrix::from_fn(cols, cols, |_, j| j as f64),
        }
    }

    /// Flattened id of output cell (i, j)
    pub fn work_id(&self, i: usize, j: usize) -> usize {
        i * self.b.cols() + j
    }

    /// Output cell addressed by a work id
    pub fn coordinates(&self, id: usize) -> (usize, usize) {
        (id / self.b.cols(), id % self.b.cols())
    }
}

impl SelfScheduledProblem for MatMatProblem {
    type Payload = RowColumn;
    type Kernel = PairDotKernel;
    type Output = Matrix;

    fn name(&self) -> &'static str {
        "matrix-matrix"
    }

    fn item_count(&self) -> usize {
        self.a.rows() * self.b.cols()
    }

    fn work_queue(&self) -> Result<WorkQueue<RowColumn>, DispatchError> {
        let cells = (0..self.a.rows()).flat_map(|i| (0..self.b.cols()).map(move |j| (i, j)));
        WorkQueue::from_items(cells.map(|(i, j)| WorkItem {
            id: self.work_id(i, j),
            payload: RowColumn {
                row: self.a.row(i).to_vec(),
                column: self.b.column(j),
            },
        }))
    }

    fn kernel(&self) -> PairDotKernel {
        PairDotKernel
    }

    fn assemble(&self, store: ResultStore) -> Result<Matrix, DispatchError> {
        let mut c = Matrix::zeros(self.a.rows(), self.b.cols());
        for (id, value) in store.into_values()?.into_iter().enumerate() {
            let (i, j) = self.coordinates(id);
            c.set(i, j, value);
        }
        Ok(c)
    }
}
