/// Compute kernel applied by workers to each payload
pub trait Kernel<P>: Send + Sync {
    fn compute(&self, payload: &P) -> f64;
}

impl<F, P> Kernel<P> for F
where
    F: Fn(&P) -> f64 + Send + Sync,
{
    fn compute(&self, payload: &P) -> f64 {
        (self)(payload)
    }
}

/// Dot product of two equal-length vectors
pub fn dot(lhs: &[f64], rhs: &[f64]) -> f64 {
    debug_assert_eq!(lhs.len(), rhs.len(), "dot product of unequal lengths");
    lhs.iter().zip(rhs).map(|(a, b)| a * b).sum()
}
