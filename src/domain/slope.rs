//! Rolling least-squares slope, normalised to a percentage of the window's
//! first price.
//!
//! For a window of `w` prices ending at `i` with x = 0..w-1:
//! raw = sum((x - x_mean) * y) / sum((x - x_mean)^2)
//! slope_pct = raw * (w - 1) / y[0] * 100
//! Warmup: first (w-1) points are `None`. A non-finite price marks a missing
//! close, and every window containing one is `None` as well.

/// Regression slopes within this fraction of the window mean are rounding
/// noise and snap to zero, so a flat run is exactly flat.
const FLAT_EPSILON: f64 = 1e-10;

/// Compute the slope percentage series for `prices` over `window`.
///
/// Runs in amortised O(n): the window sum and the x-weighted sum slide
/// incrementally and are recomputed exactly every `window` steps, which
/// bounds rounding drift on long series. Windows below 2 have no defined
/// regression and yield an all-`None` series.
pub fn calculate_slope(prices: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = prices.len();
    let mut slopes = vec![None; n];
    if window < 2 || n < window {
        return slopes;
    }

    let w = window as f64;
    let x_mean = (w - 1.0) / 2.0;
    let x_var = w * (w * w - 1.0) / 12.0;

    let mut missing = prices[..window - 1].iter().filter(|p| !p.is_finite()).count();
    // sum(y) and sum(x * y) of the previous window, x relative to its start.
    // `None` after a window with a missing close.
    let mut sums: Option<(f64, f64)> = None;
    let mut slides = 0;

    for end in (window - 1)..n {
        let start = end + 1 - window;
        if !prices[end].is_finite() {
            missing += 1;
        }
        if start > 0 && !prices[start - 1].is_finite() {
            missing -= 1;
        }
        if missing > 0 {
            sums = None;
            continue;
        }

        let (sum_y, sum_xy) = match sums {
            Some((prev_y, prev_xy)) if slides < window => {
                slides += 1;
                let outgoing = prices[start - 1];
                let incoming = prices[end];
                (
                    prev_y + incoming - outgoing,
                    prev_xy + (w - 1.0) * incoming - (prev_y - outgoing),
                )
            }
            _ => {
                slides = 0;
                exact_sums(&prices[start..=end])
            }
        };
        sums = Some((sum_y, sum_xy));

        let mut raw_slope = (sum_xy - x_mean * sum_y) / x_var;
        if raw_slope.abs() <= FLAT_EPSILON * (sum_y / w).abs() {
            raw_slope = 0.0;
        }
        let base_price = prices[start];
        slopes[end] = Some(if base_price != 0.0 {
            raw_slope * (w - 1.0) / base_price * 100.0
        } else {
            0.0
        });
    }

    slopes
}

fn exact_sums(window: &[f64]) -> (f64, f64) {
    window
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sum_y, sum_xy), (x, &y)| {
            (sum_y + y, sum_xy + x as f64 * y)
        })
}
