/// Rounds `value` to `decimals` places from its exact binary expansion, ties away from
/// zero, so `0.015` (stored as 0.01499...) becomes `0.01`. Zero results are always `+0.0`.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }

    // Every finite f64 has an exact decimal expansion of at most 1074 fractional digits.
    let exact = format!("{:.1074}", value.abs());
    let Some((int_part, frac_part)) = exact.split_once('.') else {
        return value;
    };
    // Beyond 1e25 an f64 is integral and has nothing to round.
    if int_part.len() > 25 {
        return value;
    }

    let kept = &frac_part[..decimals];
    let round_up = frac_part.as_bytes().get(decimals).is_some_and(|d| *d >= b'5');

    let Ok(mut scaled) = format!("{int_part}{kept}").parse::<u128>() else {
        return value;
    };
    if round_up {
        scaled += 1;
    }

    let scale = 10u128.pow(decimals as u32);
    let sign = if value < 0.0 { "-" } else { "" };
    let text = format!(
        "{sign}{}.{:0width$}",
        scaled / scale,
        scaled % scale,
        width = decimals
    );
    text.parse::<f64>().map(|rounded| rounded + 0.0).unwrap_or(value)
}
