//! Fixed-size moving average over per-tick weight readings.

/// Default window length.
pub const DEFAULT_WINDOW: usize = 5;

/// Circular buffer of the last `N` readings (grams) with an incrementally
/// maintained sum. Invariant: `sum == buf.iter().sum()`.
#[derive(Debug, Clone)]
pub struct WeightSampler<const N: usize = DEFAULT_WINDOW> {
    buf: [i32; N],
    sum: i64,
    cursor: usize,
    filled: bool,
}

impl<const N: usize> Default for WeightSampler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> WeightSampler<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            sum: 0,
            cursor: 0,
            filled: false,
        }
    }

    /// Insert one reading and return the stable weight.
    ///
    /// Until the window has filled once the latest reading is returned as is.
    pub fn sample(&mut self, grams: i32) -> f32 {
        if N == 0 {
            return grams as f32;
        }
        self.sum -= i64::from(self.buf[self.cursor]);
        self.buf[self.cursor] = grams;
        self.sum += i64::from(grams);
        self.cursor += 1;
        if self.cursor == N {
            self.cursor = 0;
            self.filled = true;
        }
        if self.filled {
            self.sum as f32 / N as f32
        } else {
            grams as f32
        }
    }

    /// True once `N` readings have been seen since the last reset.
    pub fn is_warm(&self) -> bool {
        self.filled
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
