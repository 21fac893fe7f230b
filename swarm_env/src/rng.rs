//! Random-draw contract consumed by the simulation core.

/// The central interface for randomness.
///
/// The simulator never touches an RNG directly; topology construction, failure
/// injection, sampling and handoff verification all draw through this trait so
/// that a run is fully determined by the implementation's seed.
///
/// # Implementations
///
/// - **Simulation**: [`SeededRng`](crate::SeededRng) - ChaCha8 stream from a `u64` seed
///
/// The trait is object safe; topology strategies take `&mut dyn SimRng`.
pub trait SimRng {
    /// Returns a uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Returns a uniform integer in `[lo, hi)`. Returns `lo` when the range is empty.
    fn next_int(&mut self, lo: usize, hi: usize) -> usize;

    /// Returns a normally distributed draw.
    ///
    /// A non-finite or negative `std_dev` degrades to returning `mean`.
    fn next_gaussian(&mut self, mean: f64, std_dev: f64) -> f64;

    /// Returns an exponentially distributed draw with the given rate (events per unit).
    ///
    /// A rate of zero (or below) never fires and yields `f64::INFINITY`.
    fn next_exponential(&mut self, rate: f64) -> f64;

    /// Returns a uniform draw in `[lo, hi)`.
    fn next_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// Returns `true` with probability `p` (clamped to `[0, 1]`).
    fn next_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p.clamp(0.0, 1.0)
    }

    /// Returns the indices in `0..len` kept by independent coin flips with probability `p`.
    ///
    /// Equivalent in distribution to flipping one coin per index, but draws
    /// one geometric gap per kept index, so sampling 1 000 of 1 000 000 nodes
    /// costs about 1 000 draws.
    fn bernoulli_indices(&mut self, len: usize, p: f64) -> Vec<usize> {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        if p >= 1.0 {
            return (0..len).collect();
        }
        if p <= 0.0 || len == 0 {
            return Vec::new();
        }

        let log_q = (1.0 - p).ln();
        let mut kept = Vec::with_capacity(((len as f64) * p).ceil() as usize);
        let mut idx = 0usize;
        loop {
            // Failures before the next success: floor(ln(U) / ln(1 - p)), U in (0, 1]
            let u = 1.0 - self.next_f64();
            let gap = (u.ln() / log_q).floor();
            if !gap.is_finite() || gap >= (len - idx) as f64 {
                break;
            }
            idx += gap as usize;
            kept.push(idx);
            idx += 1;
            if idx >= len {
                break;
            }
        }
        kept
    }
}
