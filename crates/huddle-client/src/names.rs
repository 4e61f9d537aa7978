//! Guest display names.

use rand::Rng;

/// Prefix of generated guest names.
pub const GUEST_PREFIX: &str = "Guest-";

/// A random `Guest-NNNN` name.
pub fn guest_name() -> String {
    let n: u16 = rand::rng().random_range(0..10_000);
    format!("{}{:04}", GUEST_PREFIX, n)
}

/// Trim `name`, substituting a guest name when nothing is left.
pub fn normalize_display_name(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => guest_name(),
    }
}
