//! In-place radix-2 FFT and the power spectrum built on it.

use std::f64::consts::PI;

/// In-place radix-2 Cooley-Tukey FFT.
/// `real` and `imag` must have the same power-of-2 length.
pub fn fft(real: &mut [f64], imag: &mut [f64]) {
    let n = real.len();
    debug_assert_eq!(n, imag.len());
    if n <= 1 {
        return;
    }

    // Bit-reversal permutation
    let mut j = 0usize;
    for i in 0..n - 1 {
        if i < j {
            real.swap(i, j);
            imag.swap(i, j);
        }
        let mut k = n >> 1;
        while k <= j {
            j -= k;
            k >>= 1;
        }
        j += k;
    }

    let mut size = 2;
    while size <= n {
        let half = size >> 1;
        let angle = -2.0 * PI / size as f64;
        let (w_i, w_r) = angle.sin_cos();

        for start in (0..n).step_by(size) {
            let (mut t_r, mut t_i) = (1.0, 0.0);
            for k in 0..half {
                let u = start + k;
                let v = u + half;

                let tmp_r = t_r * real[v] - t_i * imag[v];
                let tmp_i = t_r * imag[v] + t_i * real[v];

                real[v] = real[u] - tmp_r;
                imag[v] = imag[u] - tmp_i;
                real[u] += tmp_r;
                imag[u] += tmp_i;

                (t_r, t_i) = (t_r * w_r - t_i * w_i, t_r * w_i + t_i * w_r);
            }
        }
        size <<= 1;
    }
}

/// Reusable scratch space for power spectra of a fixed FFT size.
pub struct PowerSpectrum {
    real: Vec<f64>,
    imag: Vec<f64>,
}

impl PowerSpectrum {
    pub fn new(n_fft: usize) -> Self {
        Self {
            real: vec![0.0; n_fft],
            imag: vec![0.0; n_fft],
        }
    }

    /// |X[k]|² for k in 0..=n_fft/2, written into `out`.
    ///
    /// `frame` must already be windowed and exactly `n_fft` long.
    pub fn compute(&mut self, frame: &[f64], out: &mut [f64]) {
        self.real.copy_from_slice(frame);
        self.imag.iter_mut().for_each(|v| *v = 0.0);
        fft(&mut self.real, &mut self.imag);
        for (k, slot) in out.iter_mut().enumerate() {
            *slot = self.real[k] * self.real[k] + self.imag[k] * self.imag[k];
        }
    }
}
