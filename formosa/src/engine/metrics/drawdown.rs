use rust_decimal::Decimal;

/// Running maximum peak-to-trough decline of a value series.
///
/// Tracks the highest value seen so far and the deepest relative decline after it.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxDrawdownGenerator {
    pub peak: Decimal,
    pub drawdown_max: Decimal,
}

impl MaxDrawdownGenerator {
    /// Initialise from the first value of the series.
    pub fn init(first: Decimal) -> Self {
        Self {
            peak: first,
            drawdown_max: Decimal::ZERO,
        }
    }

    /// Update with the next value in the series.
    pub fn update(&mut self, value: Decimal) {
        if value > self.peak {
            self.peak = value;
        } else if self.peak > Decimal::ZERO {
            let drawdown = (self.peak - value) / self.peak;
            if drawdown > self.drawdown_max {
                self.drawdown_max = drawdown;
            }
        }
    }

    /// Maximum drawdown observed so far, as a percentage.
    pub fn generate(&self) -> Decimal {
        self.drawdown_max * Decimal::ONE_HUNDRED
    }
}

/// Maximum drawdown of a total-value series, as a percentage. Needs at least two points.
pub fn max_drawdown(series: &[Decimal]) -> Option<Decimal> {
    let (first, rest) = series.split_first()?;
    if rest.is_empty() {
        return None;
    }

    let mut generator = MaxDrawdownGenerator::init(*first);
    for value in rest {
        generator.update(*value);
    }
    Some(generator.generate())
}
