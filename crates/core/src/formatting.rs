use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};

const MSAT_PER_SAT: u64 = 1_000;
const MSAT_PER_BTC: u64 = 100_000_000_000;

/// Renders millisatoshi as `"<btc>.<8 sat digits> <3 msat digits> BTC"`.
pub fn format_amount(msat: u64) -> String {
    let btc = msat / MSAT_PER_BTC;
    let rest = msat % MSAT_PER_BTC;
    format!(
        "{}.{:08} {:03} BTC",
        btc,
        rest / MSAT_PER_SAT,
        rest % MSAT_PER_SAT
    )
}

/// Parses text produced by [`format_amount`]. The millisatoshi group and the
/// unit are optional; fewer than eight decimals are padded.
pub fn unformat_amount(text: &str) -> Result<u64> {
    let mut parts: Vec<&str> = text.split_whitespace().collect();
    if let Some(unit) = parts.last() {
        if unit.eq_ignore_ascii_case("btc") {
            parts.pop();
        } else if unit.chars().any(|c| c.is_ascii_alphabetic()) {
            bail!("unsupported unit: {unit}");
        }
    }

    let (btc_part, msat_part) = match parts.as_slice() {
        [btc] => (*btc, None),
        [btc, msat] => (*btc, Some(*msat)),
        _ => bail!("unrecognised amount: {text:?}"),
    };

    let (whole, frac) = btc_part.split_once('.').unwrap_or((btc_part, ""));
    // u64::from_str takes a leading '+', which padding would move mid-number
    if !is_digits(whole) || !(frac.is_empty() || is_digits(frac)) {
        bail!("bad BTC value {btc_part:?}");
    }
    if frac.len() > 8 {
        bail!("more than 8 decimals in {btc_part:?}");
    }
    let whole: u64 = whole
        .parse()
        .with_context(|| format!("bad BTC value {btc_part:?}"))?;
    let sats: u64 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<8}")
            .parse()
            .with_context(|| format!("bad BTC decimals {frac:?}"))?
    };
    let msat: u64 = match msat_part {
        Some(m) if !is_digits(m) => bail!("bad millisatoshi group {m:?}"),
        Some(m) if m.len() <= 3 => m
            .parse()
            .with_context(|| format!("bad millisatoshi group {m:?}"))?,
        Some(m) => bail!("millisatoshi group too long: {m:?}"),
        None => 0,
    };

    whole
        .checked_mul(MSAT_PER_BTC)
        .and_then(|v| v.checked_add(sats * MSAT_PER_SAT))
        .and_then(|v| v.checked_add(msat))
        .ok_or_else(|| anyhow!("amount overflows: {text:?}"))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
