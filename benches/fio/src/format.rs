//! Human-readable rendering of fio metrics.

use std::time::Duration;

const BYTE_UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

const SI_PREFIXES: [(i32, &str); 17] = [
    (-24, "y"),
    (-21, "z"),
    (-18, "a"),
    (-15, "f"),
    (-12, "p"),
    (-9, "n"),
    (-6, "µ"),
    (-3, "m"),
    (0, ""),
    (3, "k"),
    (6, "M"),
    (9, "G"),
    (12, "T"),
    (15, "P"),
    (18, "E"),
    (21, "Z"),
    (24, "Y"),
];

/// Bandwidth reported by fio in KiB/s, e.g. `102400` -> `100 MB/s`
pub fn bandwidth(kib_per_sec: u64) -> String {
    format!("{}/s", bytes(kib_per_sec.saturating_mul(1024)))
}

/// Binary magnitude byte count, one decimal below 10 units and none above
pub fn bytes(size: u64) -> String {
    if size < 10 {
        return format!("{size} B");
    }

    let mut exp = 0;
    let mut scale = 1u64;
    while exp + 1 < BYTE_UNITS.len() && size / scale >= 1024 {
        scale *= 1024;
        exp += 1;
    }

    let value = (size as f64 / scale as f64 * 10.0 + 0.5).floor() / 10.0;
    if value < 10.0 {
        format!("{value:.1} {}", BYTE_UNITS[exp])
    } else {
        format!("{value:.0} {}", BYTE_UNITS[exp])
    }
}

/// IOPS with an SI prefix and two trimmed decimals, e.g. `1234.5` -> `1.23 kIOPS`
pub fn iops(iops: f64) -> String {
    si(iops, 2, "IOPS")
}

pub fn si(input: f64, decimals: usize, unit: &str) -> String {
    let (value, prefix) = si_parts(input);
    format!("{} {prefix}{unit}", trim_decimals(value, decimals))
}

fn si_parts(input: f64) -> (f64, &'static str) {
    if input == 0.0 || !input.is_finite() {
        return (input, "");
    }

    let magnitude = input.abs();
    let mut exponent = (magnitude.log10().floor() as i32).div_euclid(3) * 3;
    exponent = exponent.clamp(-24, 24);
    let mut value = magnitude / 10f64.powi(exponent);
    if value >= 1000.0 && exponent < 24 {
        exponent += 3;
        value = magnitude / 10f64.powi(exponent);
    }

    let prefix = SI_PREFIXES
        .iter()
        .find(|(exp, _)| *exp == exponent)
        .map_or("", |(_, prefix)| prefix);
    (value.copysign(input), prefix)
}

fn trim_decimals(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_owned()
    } else {
        formatted
    }
}

/// Canonical duration rendering, e.g. `1.234ms`
pub fn latency(latency: Duration) -> String {
    format!("{latency:?}")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Inverse of [`bytes`], used to compare the magnitudes two strings represent
    fn represented(formatted: &str) -> f64 {
        let formatted = formatted.trim_end_matches("/s");
        let (value, unit) = formatted.split_once(' ').unwrap();
        let exp = BYTE_UNITS.iter().position(|u| *u == unit).unwrap();
        value.parse::<f64>().unwrap() * 1024f64.powi(exp as i32)
    }

    #[test]
    fn formats_bandwidth() {
        assert_eq!(bandwidth(102400), "100 MB/s");
        assert_eq!(bandwidth(51200), "50 MB/s");
        assert_eq!(bandwidth(0), "0 B/s");
        assert_eq!(bandwidth(1), "1.0 KB/s");
        assert_eq!(bandwidth(1536), "1.5 MB/s");
        assert_eq!(bandwidth(1023), "1023 KB/s");
        assert_eq!(bandwidth(1024 * 1024 * 3), "3.0 GB/s");
    }

    #[test]
    fn formats_small_and_huge_byte_counts() {
        assert_eq!(bytes(9), "9 B");
        assert_eq!(bytes(10), "10 B");
        assert_eq!(bytes(1000), "1000 B");
        assert_eq!(bytes(u64::MAX), "16 EB");
    }

    #[test]
    fn formats_iops() {
        assert_eq!(iops(1000.0), "1 kIOPS");
        assert_eq!(iops(500.0), "500 IOPS");
        assert_eq!(iops(1234.5), "1.23 kIOPS");
        assert_eq!(iops(2_500_000.0), "2.5 MIOPS");
        assert_eq!(iops(0.0), "0 IOPS");
        assert_eq!(iops(0.5), "500 mIOPS");
    }

    #[test]
    fn formats_latency() {
        assert_eq!(latency(Duration::from_millis(1)), "1ms");
        assert_eq!(latency(Duration::from_micros(1234)), "1.234ms");
        assert_eq!(latency(Duration::from_micros(500)), "500µs");
    }

    proptest! {
        #[test]
        fn bandwidth_is_monotonic(a in 0u64..1 << 40, b in 0u64..1 << 40) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(represented(&bandwidth(hi)) >= represented(&bandwidth(lo)));
        }
    }
}
