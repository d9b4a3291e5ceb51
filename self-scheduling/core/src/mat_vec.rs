use crate::dispatch_error::DispatchError;
use crate::kernel::{dot, Kernel};
use crate::matrix::{Matrix, ShapeError};
use crate::message::WorkItem;
use crate::result_store::ResultStore;
use crate::self_scheduled_problem::SelfScheduledProblem;
use crate::work_queue::WorkQueue;
use serde::{Deserialize, Serialize};

/// c = A·b, one work item per row of A
#[derive(Debug, Clone)]
pub struct MatVecProblem {
    a: Matrix,
    b: Vec<f64>,
}

/// Dot product of a row against the broadcast vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatVecKernel {
    pub b: Vec<f64>,
}

impl Kernel<Vec<f64>> for MatVecKernel {
    fn compute(&self, row: &Vec<f64>) -> f64 {
        dot(row, &self.b)
    }
}

impl MatVecProblem {
    pub fn new(a: Matrix, b: Vec<f64>) -> Result<Self, ShapeError> {
        if a.cols() != b.len() {
            return Err(ShapeError::DimensionMismatch {
                lhs_rows: a.rows(),
                lhs_cols: a.cols(),
                rhs_rows: b.len(),
                rhs_cols: 1,
            });
        }
        Ok(Self { a, b })
    }

    /// `A[i][j] = j`, `b[j] = j`
    pub fn sample(rows: usize, cols: usize) -> Self {
        Self {
            a: Matrix::from_fn(rows, cols, |_, j| j as f64),
            b: (0..cols).map(|j| j as f64).collect(),
        }
    }

    pub fn matrix(&self) -> &Matrix {
        &self.a
    }
}

impl SelfScheduledProblem for MatVecProblem {
    type Payload = Vec<f64>;
    type Kernel = MatVecKernel;
    type Output = Vec<f64>;

    fn name(&self) -> &'static str {
        "matrix-vector"
    }

    fn item_count(&self) -> usize {
        self.a.rows()
    }

    fn work_queue(&self) -> Result<WorkQueue<Vec<f64>>, DispatchError> {
        WorkQueue::from_items((0..self.a.rows()).map(|row| WorkItem {
            id: row,
            payload: self.a.row(row).to_vec(),
        }))
    }

    fn kernel(&self) -> MatVecKernel {
        MatVecKernel { b: self.b.clone() }
    }

    fn assemble(&self, store: ResultStore) -> Result<Vec<f64>, DispatchError> {
        store.into_values()
    }
}
