/// 時給から年収への換算係数（週40時間 × 52週）
pub const HOURS_PER_YEAR: f64 = 40.0 * 52.0;

/// 自由記述の給与を年額の数値に正規化
///
/// - 数字を含まない・未指定は 0
/// - `k` は1000倍、`-` / `–` はレンジとして両端の平均
/// - `/h`・`/hr`（大文字小文字を区別しない）を含めば時給とみなして年額換算
/// - 解釈できない値は 0
pub fn parse_salary(salary: Option<&str>) -> f64 {
    let Some(salary) = salary else {
        return 0.0;
    };
    if !salary.chars().any(|c| c.is_ascii_digit()) {
        return 0.0;
    }

    let lowered = salary.to_lowercase();
    let hourly = lowered.contains("/h");
    let cleaned: String = lowered
        .replace("/yr", "")
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | 'k' | '-' | '–'))
        .collect();

    let values: Vec<f64> = cleaned.split(['-', '–']).map(parse_part).collect();
    let value = match values.as_slice() {
        [low, high] => (low + high) / 2.0,
        [first, ..] => *first,
        [] => f64::NAN,
    };

    let annual = if hourly { value * HOURS_PER_YEAR } else { value };
    if annual.is_finite() { annual } else { 0.0 }
}

/// 先頭の数値部分を読み取り、`k` を含めば1000倍（数値がなければ NaN）
fn parse_part(part: &str) -> f64 {
    let mut seen_dot = false;
    let numeric: String = part
        .chars()
        .take_while(|&c| {
            if c == '.' && !seen_dot {
                seen_dot = true;
                true
            } else {
                c.is_ascii_digit()
            }
        })
        .collect();

    let Ok(value) = numeric.parse::<f64>() else {
        return f64::NAN;
    };
    if part.contains('k') { value * 1000.0 } else { value }
}
