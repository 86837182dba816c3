use num::{Float, NumCast};

// Stolen from [nannou](https://docs.rs/nannou/0.15.0/src/nannou/math.rs.html#42)
pub fn map_range<X, Y>(val: X, in_min: X, in_max: X, out_min: Y, out_max: Y) -> Y
where
    X: Float,
    Y: Float,
{
    let span: Y = NumCast::from((val - in_min) / (in_max - in_min)).unwrap_or_else(Y::nan);
    span * (out_max - out_min) + out_min
}

/// `ceil(numerator / denominator)`, or zero when there is nothing to divide by.
pub fn ceil_div(numerator: usize, denominator: usize) -> usize {
    if denominator == 0 {
        return 0;
    }

    (numerator + denominator - 1) / denominator
}
