//! Multi-value reduction: the raw values of one document collapse to one
//! comparable value per sort criterion.

use crate::sort::value::{ReducedValue, SortValue};
use crate::sort::{Order, SortMode};
use crate::{Result, SortError};

/// Reduces the raw values a document contributed to one criterion.
///
/// No values reduce to [`ReducedValue::Missing`]. Without an explicit mode,
/// ascending sorts take the minimum and descending sorts the maximum, so the
/// document is ranked by its value closest to the top of the order.
pub(crate) fn reduce(
    values: Vec<SortValue>,
    mode: Option<SortMode>,
    order: Order,
) -> Result<ReducedValue> {
    if values.is_empty() {
        return Ok(ReducedValue::Missing);
    }
    let mode = mode.unwrap_or(match order {
        Order::Asc => SortMode::Min,
        Order::Desc => SortMode::Max,
    });
    let value = match mode {
        SortMode::Min => values
            .into_iter()
            .min_by(|lhs, rhs| lhs.compare(rhs))
            .unwrap(),
        SortMode::Max => values
            .into_iter()
            .max_by(|lhs, rhs| lhs.compare(rhs))
            .unwrap(),
        SortMode::Sum => sum(&values)?,
        SortMode::Avg => {
            let count = values.len() as f64;
            SortValue::F64(float_sum(&values, SortMode::Avg)? / count)
        }
        SortMode::Median => median(values)?,
    };
    Ok(ReducedValue::Value(value))
}

/// Integer sums stay integers while they fit; overflow or a float operand
/// switches the whole sum to floating point.
fn sum(values: &[SortValue]) -> Result<SortValue> {
    let mut int_sum: Option<i64> = Some(0);
    for value in values {
        int_sum = match (int_sum, value) {
            (Some(acc), SortValue::I64(v)) => acc.checked_add(*v),
            _ => None,
        };
        if int_sum.is_none() {
            break;
        }
    }
    match int_sum {
        Some(total) => Ok(SortValue::I64(total)),
        None => Ok(SortValue::F64(float_sum(values, SortMode::Sum)?)),
    }
}

fn float_sum(values: &[SortValue], mode: SortMode) -> Result<f64> {
    let mut total = 0.0;
    for value in values {
        total += value.as_f64().ok_or_else(|| {
            SortError::Validation(format!(
                "sort mode [{mode}] isn't supported for non-numeric value {value:?}"
            ))
        })?;
    }
    Ok(total)
}

fn median(mut values: Vec<SortValue>) -> Result<SortValue> {
    for value in &values {
        if value.as_f64().is_none() {
            return Err(SortError::Validation(format!(
                "sort mode [{}] isn't supported for non-numeric value {value:?}",
                SortMode::Median
            )));
        }
    }
    values.sort_by(|lhs, rhs| lhs.compare(rhs));
    let middle = values.len() / 2;
    if values.len() % 2 == 1 {
        Ok(values.swap_remove(middle))
    } else {
        let upper = values[middle].as_f64().unwrap();
        let lower = values[middle - 1].as_f64().unwrap();
        Ok(SortValue::F64((lower + upper) / 2.0))
    }
}
