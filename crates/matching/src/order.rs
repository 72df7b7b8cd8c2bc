//! Identifier ordering and fixed-precision rounding shared by every stage.

use std::cmp::Ordering;

/// Natural identifier order. Integer ids come first, compared by value
/// (so district "9" sorts before "10"); every other id follows,
/// compared lexicographically. Equal values with different spellings
/// ("01", "1") fall back to the raw string.
///
/// Used for every tie-break so results never depend on input order.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

fn sort_key(id: &str) -> (bool, i128, &str) {
    match id.trim().parse::<i128>() {
        Ok(n) => (false, n, id),
        Err(_) => (true, 0, id),
    }
}

/// Round to `decimals` places, mapping -0.0 and non-finite input to 0.0.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
