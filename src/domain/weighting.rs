//! Cross-sectional mean-reversion weights.
//!
//! Each eligible instrument is bet against its deviation from the day's mean
//! return: outperformers are shorted, underperformers bought. Signals are scaled
//! so that absolute weights sum to one. No net-exposure constraint is applied on
//! top of that scaling.

use std::collections::BTreeMap;

/// Arithmetic mean, summed in slice order.
pub fn mean_return(returns: &[(String, f64)]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let sum: f64 = returns.iter().map(|(_, r)| r).sum();
    Some(sum / returns.len() as f64)
}

/// Raw signal `-(r_i - r_mean)` per instrument, in input order.
pub fn reversion_signals(returns: &[(String, f64)]) -> Vec<(String, f64)> {
    let Some(mean) = mean_return(returns) else {
        return Vec::new();
    };
    returns
        .iter()
        .map(|(code, r)| (code.clone(), -(r - mean)))
        .collect()
}

/// Target weights for one day.
///
/// A day whose returns are all equal (one instrument included) gets zero
/// weights. Equality is tested on the returns, not on the gross signal: the mean
/// of identical values can carry rounding residue, while any real difference
/// leaves a nonzero signal.
pub fn mean_reversion_weights(returns: &[(String, f64)]) -> BTreeMap<String, f64> {
    let dispersed = returns.windows(2).any(|pair| pair[0].1 != pair[1].1);
    let signals = reversion_signals(returns);
    let denom: f64 = signals.iter().map(|(_, s)| s.abs()).sum();

    signals
        .into_iter()
        .map(|(code, s)| {
            let w = if dispersed && denom > 0.0 { s / denom } else { 0.0 };
            (code, w)
        })
        .collect()
}
