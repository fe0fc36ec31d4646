use pd_types::{Error, Result};

/// Parses a size such as `1024`, `3M`, or `4Ki`.
///
/// A trailing `i` selects powers of 1024, otherwise multipliers are powers
/// of 1000. Fractions are allowed: `1.5k` is 1500.
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (num, suffix) = s.split_at(split);
    let value: f64 = num
        .parse()
        .map_err(|_| Error::Config(format!("invalid size '{s}'")))?;
    let mult: u64 = match suffix.to_ascii_lowercase().as_str() {
        "" => 1,
        "k" => 1000,
        "ki" => 1 << 10,
        "m" => 1000 * 1000,
        "mi" => 1 << 20,
        "g" => 1000 * 1000 * 1000,
        "gi" => 1 << 30,
        "t" => 1000 * 1000 * 1000 * 1000,
        "ti" => 1 << 40,
        _ => return Err(Error::Config(format!("unknown size suffix '{suffix}'"))),
    };
    Ok((value * mult as f64) as u64)
}
