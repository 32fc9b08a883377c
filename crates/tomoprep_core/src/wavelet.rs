//! Discrete wavelet transform primitives.
//!
//! Separable 2D DWT/IDWT over the Daubechies family, with half-sample
//! symmetric boundary extension. Conventions follow the usual filter-bank
//! ones: analysis sub-bands have length `floor((n + L - 1) / 2)`, synthesis
//! output has length `2m - L + 2`, and the synthesis result of a deeper
//! level is cropped (never padded) before recombination, so odd extents
//! truncate.
//!
//! Sub-band naming for a 2D decomposition: `vert` is the band that is
//! low-passed along axis 0 and high-passed along axis 1 — the band that
//! carries vertical-stripe energy in a sinogram.

use ndarray::{Array2, ArrayView2};

use crate::error::{PreprocError, Result};
use crate::float_trait::TomoFloat;
use crate::smoothing::reflect_index;

// =============================================================================
// Daubechies scaling filters
// =============================================================================

// Orthonormal scaling (low-pass reconstruction) filters, ascending index,
// each summing to sqrt(2). dbN has 2N taps.

const DB1: [f64; 2] = [0.7071067811865476, 0.7071067811865476];

const DB2: [f64; 4] = [
    0.48296291314469025,
    0.8365163037378079,
    0.22414386804185735,
    -0.12940952255092145,
];

const DB3: [f64; 6] = [
    0.3326705529509569,
    0.8068915093133388,
    0.4598775021193313,
    -0.13501102001039084,
    -0.08544127388224149,
    0.035226291882100656,
];

const DB4: [f64; 8] = [
    0.23037781330885523,
    0.7148465705525415,
    0.6308807679295904,
    -0.02798376941698385,
    -0.18703481171888114,
    0.030841381835986965,
    0.032883011666982945,
    -0.010597401784997278,
];

const DB5: [f64; 10] = [
    0.160102397974125,
    0.6038292697974729,
    0.7243085284385744,
    0.13842814590110342,
    -0.24229488706619015,
    -0.03224486958502952,
    0.07757149384006515,
    -0.006241490213011705,
    -0.012580751999015526,
    0.003335725285001549,
];

const DB6: [f64; 12] = [
    0.11154074335008017,
    0.4946238903983854,
    0.7511339080215775,
    0.3152503517092432,
    -0.22626469396516913,
    -0.12976686756709563,
    0.09750160558707936,
    0.02752286553001629,
    -0.031582039318031156,
    0.0005538422009938016,
    0.004777257511010651,
    -0.00107730108499558,
];

const DB7: [f64; 14] = [
    0.07785205408506236,
    0.39653931948230575,
    0.7291320908465551,
    0.4697822874053586,
    -0.14390600392910627,
    -0.22403618499416572,
    0.07130921926705004,
    0.0806126091510659,
    -0.03802993693503463,
    -0.01657454163101562,
    0.012550998556013784,
    0.00042957797300470274,
    -0.0018016407039998328,
    0.0003537138000010399,
];

const DB8: [f64; 16] = [
    0.05441584224308161,
    0.3128715909144659,
    0.6756307362980128,
    0.5853546836548691,
    -0.015829105256023893,
    -0.2840155429624281,
    0.00047248457399797254,
    0.128747426620186,
    -0.01736930100202211,
    -0.04408825393106472,
    0.013981027917015516,
    0.008746094047015655,
    -0.00487035299301066,
    -0.0003917403729959771,
    0.0006754494059985568,
    -0.00011747678400228192,
];

const DB9: [f64; 18] = [
    0.03807794736316728,
    0.24383467463766728,
    0.6048231236767786,
    0.6572880780366389,
    0.13319738582208895,
    -0.29327378327258685,
    -0.09684078322087904,
    0.14854074933476008,
    0.030725681478322865,
    -0.06763282905952399,
    0.00025094711499193845,
    0.022361662123515244,
    -0.004723204757894831,
    -0.004281503681904723,
    0.0018476468829611268,
    0.00023038576399541288,
    -0.0002519631889981789,
    3.9347319995026124e-05,
];

const DB10: [f64; 20] = [
    0.026670057900950818,
    0.18817680007762133,
    0.5272011889309198,
    0.6884590394525921,
    0.2811723436604265,
    -0.24984642432648865,
    -0.19594627437659665,
    0.12736934033574265,
    0.09305736460380659,
    -0.07139414716586077,
    -0.029457536821945671,
    0.0332126740593703,
    0.0036065535669883944,
    -0.010733175482979604,
    0.0013953517469940798,
    0.00199240529499085,
    -0.0006858566950046825,
    -0.0001164668549943862,
    9.358867000108985e-05,
    -1.326420300235487e-05,
];

fn scaling_filter(name: &str) -> Option<&'static [f64]> {
    match name {
        "haar" | "db1" => Some(&DB1),
        "db2" => Some(&DB2),
        "db3" => Some(&DB3),
        "db4" => Some(&DB4),
        "db5" => Some(&DB5),
        "db6" => Some(&DB6),
        "db7" => Some(&DB7),
        "db8" => Some(&DB8),
        "db9" => Some(&DB9),
        "db10" => Some(&DB10),
        _ => None,
    }
}

// =============================================================================
// Types
// =============================================================================

/// An orthonormal wavelet filter bank, resolved by name.
#[derive(Debug, Clone)]
pub struct Wavelet<F: TomoFloat> {
    name: String,
    dec_lo: Vec<F>,
    dec_hi: Vec<F>,
    rec_lo: Vec<F>,
    rec_hi: Vec<F>,
}

impl<F: TomoFloat> Wavelet<F> {
    /// Look up a wavelet by name ("db1" .. "db10", "haar").
    pub fn from_name(name: &str) -> Result<Self> {
        let h = scaling_filter(name).ok_or_else(|| {
            PreprocError::InvalidParameter(format!("unknown wavelet '{}'", name))
        })?;
        let l = h.len();

        // Quadrature mirror relations for an orthonormal bank:
        // rec_lo = h, dec_lo = rev(h), rec_hi[k] = (-1)^k h[L-1-k],
        // dec_hi = rev(rec_hi).
        let rec_lo: Vec<F> = h.iter().map(|&v| F::from_f64_c(v)).collect();
        let dec_lo: Vec<F> = rec_lo.iter().rev().copied().collect();
        let rec_hi: Vec<F> = (0..l)
            .map(|k| {
                let v = rec_lo[l - 1 - k];
                if k % 2 == 0 {
                    v
                } else {
                    -v
                }
            })
            .collect();
        let dec_hi: Vec<F> = rec_hi.iter().rev().copied().collect();

        Ok(Self {
            name: name.to_string(),
            dec_lo,
            dec_hi,
            rec_lo,
            rec_hi,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of filter taps (2N for dbN).
    pub fn filter_len(&self) -> usize {
        self.rec_lo.len()
    }
}

/// Detail sub-bands of one 2D decomposition level.
#[derive(Debug, Clone)]
pub struct DetailBands<F: TomoFloat> {
    /// High-pass along axis 0, low-pass along axis 1.
    pub horiz: Array2<F>,
    /// Low-pass along axis 0, high-pass along axis 1. Vertical stripes
    /// concentrate here.
    pub vert: Array2<F>,
    /// High-pass along both axes.
    pub diag: Array2<F>,
}

// =============================================================================
// 1D analysis / synthesis
// =============================================================================

/// Sub-band length of a 1D analysis step.
#[inline]
pub fn coeff_len(n: usize, filter_len: usize) -> usize {
    (n + filter_len - 1) / 2
}

/// Single-level 1D DWT with half-sample symmetric extension.
/// Returns (approximation, detail), each of length `coeff_len(n, L)`.
pub fn dwt1d<F: TomoFloat>(x: &[F], wavelet: &Wavelet<F>) -> (Vec<F>, Vec<F>) {
    let n = x.len();
    let l = wavelet.filter_len();
    let out_len = coeff_len(n, l);

    let mut approx = vec![F::zero(); out_len];
    let mut detail = vec![F::zero(); out_len];

    for k in 0..out_len {
        let t = (2 * k + 1) as isize;
        let mut sa = F::zero();
        let mut sd = F::zero();
        for j in 0..l {
            let v = x[reflect_index(t - j as isize, n)];
            sa += wavelet.dec_lo[j] * v;
            sd += wavelet.dec_hi[j] * v;
        }
        approx[k] = sa;
        detail[k] = sd;
    }

    (approx, detail)
}

/// Single-level 1D inverse DWT. `approx` and `detail` must have equal
/// length `m`; the output has length `2m - L + 2`.
pub fn idwt1d<F: TomoFloat>(approx: &[F], detail: &[F], wavelet: &Wavelet<F>) -> Vec<F> {
    let m = approx.len();
    debug_assert_eq!(m, detail.len());
    let l = wavelet.filter_len();
    debug_assert!(2 * m + 2 > l, "sub-band too short for this filter");
    let out_len = 2 * m - l + 2;

    let mut output = vec![F::zero(); out_len];
    for (i, out) in output.iter_mut().enumerate() {
        let t = (i + l - 2) as isize;
        let mut sum = F::zero();
        for j in 0..l {
            let p = t - j as isize;
            // Upsampled coefficients live at even positions of [0, 2m).
            if p >= 0 && p < 2 * m as isize && p % 2 == 0 {
                let idx = (p / 2) as usize;
                sum += wavelet.rec_lo[j] * approx[idx] + wavelet.rec_hi[j] * detail[idx];
            }
        }
        *out = sum;
    }

    output
}

// =============================================================================
// 2D analysis / synthesis
// =============================================================================

/// Single-level separable 2D DWT: axis 0 first, then axis 1.
/// All four sub-bands share the shape
/// `(coeff_len(rows, L), coeff_len(cols, L))`.
pub fn dwt2<F: TomoFloat>(
    image: ArrayView2<F>,
    wavelet: &Wavelet<F>,
) -> (Array2<F>, DetailBands<F>) {
    let (rows, cols) = image.dim();
    let l = wavelet.filter_len();
    let rows_c = coeff_len(rows, l);
    let cols_c = coeff_len(cols, l);

    // Axis 0 pass: transform every column.
    let mut lo0 = Array2::<F>::zeros((rows_c, cols));
    let mut hi0 = Array2::<F>::zeros((rows_c, cols));
    let mut col_buf = Vec::with_capacity(rows);
    for c in 0..cols {
        col_buf.clear();
        col_buf.extend((0..rows).map(|r| image[[r, c]]));
        let (a, d) = dwt1d(&col_buf, wavelet);
        for r in 0..rows_c {
            lo0[[r, c]] = a[r];
            hi0[[r, c]] = d[r];
        }
    }

    // Axis 1 pass: transform every row of both half-bands.
    let mut approx = Array2::<F>::zeros((rows_c, cols_c));
    let mut vert = Array2::<F>::zeros((rows_c, cols_c));
    let mut horiz = Array2::<F>::zeros((rows_c, cols_c));
    let mut diag = Array2::<F>::zeros((rows_c, cols_c));
    let mut row_buf = Vec::with_capacity(cols);

    for r in 0..rows_c {
        row_buf.clear();
        row_buf.extend(lo0.row(r).iter().copied());
        let (a, d) = dwt1d(&row_buf, wavelet);
        for c in 0..cols_c {
            approx[[r, c]] = a[c];
            vert[[r, c]] = d[c];
        }

        row_buf.clear();
        row_buf.extend(hi0.row(r).iter().copied());
        let (a, d) = dwt1d(&row_buf, wavelet);
        for c in 0..cols_c {
            horiz[[r, c]] = a[c];
            diag[[r, c]] = d[c];
        }
    }

    (approx, DetailBands { horiz, vert, diag })
}

/// Single-level separable 2D inverse DWT. All four sub-bands must share
/// one shape `(m_r, m_c)`; the output shape is
/// `(2*m_r - L + 2, 2*m_c - L + 2)`.
pub fn idwt2<F: TomoFloat>(
    approx: ArrayView2<F>,
    bands: &DetailBands<F>,
    wavelet: &Wavelet<F>,
) -> Array2<F> {
    let (m_r, m_c) = approx.dim();
    debug_assert_eq!(bands.horiz.dim(), (m_r, m_c));
    debug_assert_eq!(bands.vert.dim(), (m_r, m_c));
    debug_assert_eq!(bands.diag.dim(), (m_r, m_c));

    let l = wavelet.filter_len();
    let cols_rec = 2 * m_c - l + 2;
    let rows_rec = 2 * m_r - l + 2;

    // Axis 1 inverse: recombine along rows.
    let mut lo0 = Array2::<F>::zeros((m_r, cols_rec));
    let mut hi0 = Array2::<F>::zeros((m_r, cols_rec));
    let mut a_buf = Vec::with_capacity(m_c);
    let mut d_buf = Vec::with_capacity(m_c);

    for r in 0..m_r {
        a_buf.clear();
        a_buf.extend(approx.row(r).iter().copied());
        d_buf.clear();
        d_buf.extend(bands.vert.row(r).iter().copied());
        let line = idwt1d(&a_buf, &d_buf, wavelet);
        for c in 0..cols_rec {
            lo0[[r, c]] = line[c];
        }

        a_buf.clear();
        a_buf.extend(bands.horiz.row(r).iter().copied());
        d_buf.clear();
        d_buf.extend(bands.diag.row(r).iter().copied());
        let line = idwt1d(&a_buf, &d_buf, wavelet);
        for c in 0..cols_rec {
            hi0[[r, c]] = line[c];
        }
    }

    // Axis 0 inverse: recombine along columns.
    let mut output = Array2::<F>::zeros((rows_rec, cols_rec));
    let mut a_col = Vec::with_capacity(m_r);
    let mut d_col = Vec::with_capacity(m_r);

    for c in 0..cols_rec {
        a_col.clear();
        a_col.extend((0..m_r).map(|r| lo0[[r, c]]));
        d_col.clear();
        d_col.extend((0..m_r).map(|r| hi0[[r, c]]));
        let line = idwt1d(&a_col, &d_col, wavelet);
        for r in 0..rows_rec {
            output[[r, c]] = line[r];
        }
    }

    output
}

/// Deepest decomposition a `(rows, cols)` slice supports.
///
/// Each level nominally halves the slice, so the depth is bounded by
/// `floor(log2(min(rows, cols)))`; symmetric extension keeps the transform
/// well-defined down to that bound for every supported filter length.
pub fn max_decomposition_level(rows: usize, cols: usize) -> usize {
    let min_dim = rows.min(cols);
    if min_dim < 2 {
        return 0;
    }
    min_dim.ilog2() as usize
}
