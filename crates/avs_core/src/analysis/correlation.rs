//! Valid-mode cross-correlation.
//!
//! `correlation[lag] = Σ search[lag + k] · template[k]` for
//! `lag in 0..=search.len() - template.len()`.

use rustfft::{num_complex::Complex, FftPlanner};

/// Below this many multiply-adds the direct sum is cheaper than three FFTs.
const DIRECT_WORK_LIMIT: usize = 1 << 16;

/// Valid-mode cross-correlation, picking direct or FFT evaluation by size.
///
/// Returns an empty vector when the template is empty or longer than the
/// search signal.
pub fn valid_cross_correlation(search: &[f64], template: &[f64]) -> Vec<f64> {
    if template.is_empty() || template.len() > search.len() {
        return Vec::new();
    }

    let lags = search.len() - template.len() + 1;
    if lags.saturating_mul(template.len()) <= DIRECT_WORK_LIMIT {
        direct_valid_correlation(search, template)
    } else {
        fft_valid_correlation(search, template)
    }
}

/// Direct O(N·M) evaluation.
pub fn direct_valid_correlation(search: &[f64], template: &[f64]) -> Vec<f64> {
    if template.is_empty() || template.len() > search.len() {
        return Vec::new();
    }

    search
        .windows(template.len())
        .map(|window| window.iter().zip(template).map(|(s, t)| s * t).sum())
        .collect()
}

/// FFT evaluation: `IFFT(FFT(search) · conj(FFT(template)))`, keeping the
/// non-wrapping lags only.
pub fn fft_valid_correlation(search: &[f64], template: &[f64]) -> Vec<f64> {
    if template.is_empty() || template.len() > search.len() {
        return Vec::new();
    }

    // Padded length must hold the full linear correlation to avoid wraparound
    let fft_len = (search.len() + template.len() - 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut search_spec = to_padded_complex(search, fft_len);
    let mut template_spec = to_padded_complex(template, fft_len);

    fft.process(&mut search_spec);
    fft.process(&mut template_spec);

    let mut product: Vec<Complex<f64>> = search_spec
        .iter()
        .zip(template_spec.iter())
        .map(|(s, t)| s * t.conj())
        .collect();

    ifft.process(&mut product);

    let scale = 1.0 / fft_len as f64;
    let lags = search.len() - template.len() + 1;
    product.iter().take(lags).map(|c| c.re * scale).collect()
}

fn to_padded_complex(signal: &[f64], len: usize) -> Vec<Complex<f64>> {
    let mut out: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    out.resize(len, Complex::new(0.0, 0.0));
    out
}

/// Index and value of the maximum; the first index wins on ties.
pub fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}
