/// Trading days per year used to annualise daily ratios.
pub const ANNUAL_TRADING_DAYS: f64 = 252.0;

/// Daily return observations required before Sharpe/Sortino are published.
pub const MIN_RETURN_OBSERVATIONS: usize = 20;

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Annualised Sharpe ratio of a daily fractional-return series.
///
/// `None` with fewer than [`MIN_RETURN_OBSERVATIONS`] points; `0` for a zero-variance
/// series (never NaN).
pub fn sharpe_ratio(daily_returns: &[f64], risk_free_daily: f64) -> Option<f64> {
    if daily_returns.len() < MIN_RETURN_OBSERVATIONS {
        return None;
    }

    let mean_return = mean(daily_returns);
    let std_dev = population_std_dev(daily_returns, mean_return);
    if std_dev == 0.0 {
        return Some(0.0);
    }

    Some((mean_return - risk_free_daily) / std_dev * ANNUAL_TRADING_DAYS.sqrt())
}

/// Annualised Sortino ratio: like Sharpe, but over downside deviation only.
///
/// `None` with insufficient points; `0` when the series has no downside dispersion.
pub fn sortino_ratio(daily_returns: &[f64], risk_free_daily: f64) -> Option<f64> {
    if daily_returns.len() < MIN_RETURN_OBSERVATIONS {
        return None;
    }

    let mean_return = mean(daily_returns);
    let downside: Vec<f64> = daily_returns
        .iter()
        .copied()
        .filter(|value| *value < 0.0)
        .collect();

    if downside.is_empty() {
        return Some(0.0);
    }

    // Downside deviation measured around zero over the full observation count
    let downside_variance =
        downside.iter().map(|value| value.powi(2)).sum::<f64>() / daily_returns.len() as f64;
    let downside_dev = downside_variance.sqrt();
    if downside_dev == 0.0 {
        return Some(0.0);
    }

    Some((mean_return - risk_free_daily) / downside_dev * ANNUAL_TRADING_DAYS.sqrt())
}

/// Calmar ratio: annualised return over maximum drawdown.
///
/// `None` unless both inputs are defined and the drawdown is positive.
pub fn calmar_ratio(mean_daily_return: f64, max_drawdown_pct: Option<f64>) -> Option<f64> {
    let drawdown = max_drawdown_pct? / 100.0;
    if drawdown <= 0.0 {
        return None;
    }
    Some(mean_daily_return * ANNUAL_TRADING_DAYS / drawdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sharpe_requires_twenty_observations() {
        let returns = vec![0.01; MIN_RETURN_OBSERVATIONS - 1];
        assert_eq!(sharpe_ratio(&returns, 0.0), None);
        assert_eq!(sortino_ratio(&returns, 0.0), None);
    }

    #[test]
    fn test_sharpe_zero_variance_is_zero_not_nan() {
        let returns = vec![0.01; MIN_RETURN_OBSERVATIONS];
        assert_eq!(sharpe_ratio(&returns, 0.0), Some(0.0));
    }

    #[test]
    fn test_sharpe_annualises_with_sqrt_252() {
        // Alternating returns with known mean and dispersion
        let returns: Vec<f64> = (0..20)
            .map(|index| if index % 2 == 0 { 0.02 } else { 0.0 })
            .collect();

        let mean_return = 0.01;
        let std_dev = 0.01;
        let expected = mean_return / std_dev * ANNUAL_TRADING_DAYS.sqrt();

        assert_relative_eq!(
            sharpe_ratio(&returns, 0.0).unwrap(),
            expected,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_sortino_only_penalises_downside() {
        let mut returns = vec![0.01; MIN_RETURN_OBSERVATIONS - 2];
        returns.push(-0.02);
        returns.push(-0.02);

        let sortino = sortino_ratio(&returns, 0.0).unwrap();
        let sharpe = sharpe_ratio(&returns, 0.0).unwrap();
        assert!(sortino.is_finite());
        assert!(sortino != sharpe);

        // All-positive series has no downside dispersion
        let positive = vec![0.01; MIN_RETURN_OBSERVATIONS];
        assert_eq!(sortino_ratio(&positive, 0.0), Some(0.0));
    }

    #[test]
    fn test_calmar_requires_positive_drawdown() {
        assert_eq!(calmar_ratio(0.001, None), None);
        assert_eq!(calmar_ratio(0.001, Some(0.0)), None);

        let calmar = calmar_ratio(0.001, Some(10.0)).unwrap();
        assert_relative_eq!(calmar, 0.001 * 252.0 / 0.1, epsilon = 1e-9);
    }
}
