// =============================================================================
// On-Balance Volume (OBV)
// =============================================================================
//
//   OBV_0 = 0
//   OBV_t = OBV_{t-1} + volume_t   if close_t > close_{t-1}
//         = OBV_{t-1} - volume_t   if close_t < close_{t-1}
//         = OBV_{t-1}              otherwise
// =============================================================================

use super::{require, Column, ComputationError};

pub fn obv_column(closes: &[f64], volumes: &[f64]) -> Result<Column, ComputationError> {
    require("OBV", 1, 1, closes.len())?;

    let mut total = 0.0;
    let mut column = Vec::with_capacity(closes.len());
    column.push(Some(total));

    for (w, &volume) in closes.windows(2).zip(&volumes[1..]) {
        if w[1] > w[0] {
            total += volume;
        } else if w[1] < w[0] {
            total -= volume;
        }
        column.push(Some(total));
    }

    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_total() {
        let closes = [10.0, 11.0, 11.0, 9.0, 12.0];
        let volumes = [100.0, 200.0, 300.0, 400.0, 500.0];
        let col = obv_column(&closes, &volumes).unwrap();
        assert_eq!(
            col,
            vec![Some(0.0), Some(200.0), Some(200.0), Some(-200.0), Some(300.0)]
        );
    }

    #[test]
    fn strictly_increasing_on_rising_closes() {
        let closes: Vec<f64> = (100..130).map(|x| x as f64).collect();
        let col = obv_column(&closes, &[1000.0; 30]).unwrap();
        for w in col.windows(2) {
            assert!(w[1].unwrap() > w[0].unwrap());
        }
        assert_eq!(col[29], Some(29_000.0));
    }

    #[test]
    fn single_row_is_zero() {
        assert_eq!(obv_column(&[5.0], &[10.0]).unwrap(), vec![Some(0.0)]);
        assert!(obv_column(&[], &[]).is_err());
    }
}
