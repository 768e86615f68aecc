//! Theme value validation
//!
//! Host-supplied theme values end up inside a generated style block, so they
//! are checked before use. Invalid values are treated as absent by callers.

use std::sync::LazyLock;

use regex::Regex;

/// Accepted color syntaxes: hex3/hex6, `rgb()`, `rgba()`, `hsl()`, `hsla()`.
static COLOR_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(#([0-9A-Fa-f]{3}){1,2}|rgb\(\d+,\s*\d+,\s*\d+\)|rgba\(\d+,\s*\d+,\s*\d+,\s*[\d.]+\)|hsl\(\d+,\s*[\d.]+%,\s*[\d.]+%\)|hsla\(\d+,\s*[\d.]+%,\s*[\d.]+%,\s*[\d.]+\))$",
    )
    .ok()
});

/// Custom property names: `--` followed by ASCII letters, digits and dashes.
static CUSTOM_PROPERTY_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^--[A-Za-z0-9-]+$").ok());

/// Whether `value` is a color in one of the accepted syntaxes.
pub fn is_valid_color(value: &str) -> bool {
    COLOR_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// Whether `name` can be declared as a CSS custom property
pub fn is_valid_custom_property(name: &str) -> bool {
    CUSTOM_PROPERTY_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Whether `value` can be placed after `name:` in a declaration block
/// without closing the declaration or the block.
pub fn is_safe_css_value(value: &str) -> bool {
    !value.trim().is_empty() && !value.contains([';', '{', '}', '<', '>'])
}
