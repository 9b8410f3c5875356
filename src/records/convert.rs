use tracing::debug;

use super::{ClosedPosition, DividendRecord, RawDividend, RawPosition};
use crate::error::ReportError;
use crate::rates::CurrencyRateIndex;

/// Convert one closed position into the reference currency.
///
/// The opening side uses the rate effective on the open date, the profit and
/// closing side the rate effective on the close date.
pub fn convert_position(raw: &RawPosition, index: &CurrencyRateIndex) -> Result<ClosedPosition, ReportError> {
    let open_fx = index.rate_as_of(raw.open_date)?;
    let close_fx = index.rate_as_of(raw.close_date)?;

    let start_value = raw.amount / open_fx;
    let profit = raw.profit / close_fx;
    let close_value = if raw.is_long {
        start_value + profit
    } else {
        start_value - profit
    };

    Ok(ClosedPosition {
        instrument_id: raw.instrument_id.clone(),
        full_name: raw.full_name.clone(),
        class: raw.class,
        is_long: raw.is_long,
        units: raw.units,
        leverage: raw.leverage,
        open_date: raw.open_date,
        close_date: raw.close_date,
        start_value,
        close_value,
        open_price: start_value / raw.units,
        close_price: close_value / raw.units,
        profit,
        open_rate_native: raw.open_rate,
        close_rate_native: raw.close_rate,
    })
}

/// Convert one dividend payment into the reference currency
pub fn convert_dividend(raw: &RawDividend, index: &CurrencyRateIndex) -> Result<DividendRecord, ReportError> {
    let fx = index.rate_as_of(raw.payment_date)?;

    Ok(DividendRecord {
        instrument_id: raw.instrument_id.clone(),
        full_name: raw.full_name.clone(),
        payment_date: raw.payment_date,
        net_dividend: raw.net_dividend / fx,
        foreign_tax: raw.withholding_tax / fx,
    })
}

/// Convert every row, stopping at the first date without a usable rate
pub fn convert_all(
    positions: &[RawPosition],
    dividends: &[RawDividend],
    index: &CurrencyRateIndex,
) -> Result<(Vec<ClosedPosition>, Vec<DividendRecord>), ReportError> {
    let positions = positions
        .iter()
        .map(|p| convert_position(p, index))
        .collect::<Result<Vec<_>, _>>()?;
    let dividends = dividends
        .iter()
        .map(|d| convert_dividend(d, index))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "Converted {} positions and {} dividends",
        positions.len(),
        dividends.len()
    );

    Ok((positions, dividends))
}
