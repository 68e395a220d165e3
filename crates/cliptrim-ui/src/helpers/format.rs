// crates/cliptrim-ui/src/helpers/format.rs
//
// Display-only string utilities. Time and size formatting live in
// cliptrim_core::helpers::time — this module is for things that only make
// sense next to a widget.

/// Truncate `s` to at most `max` bytes without splitting a codepoint,
/// appending "…" when anything was cut.
///
/// Used by the library cards and the editor header to keep long capture
/// names (timestamps, map names) inside their fixed-width slots.
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let cut = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max.saturating_sub(1))
        .last()
        .unwrap_or(0);
    format!("{}…", &s[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_is_unchanged() {
        assert_eq!(truncate("round-7", 16), "round-7");
        assert_eq!(truncate("round-7", 7), "round-7");
    }

    #[test]
    fn long_ascii_gets_ellipsis() {
        assert_eq!(truncate("2026-08-30 22-14-05", 10), "2026-08-3…");
    }

    #[test]
    fn multibyte_does_not_split_codepoint() {
        // "é" is two bytes; a one-byte budget must not cut through it.
        let t = truncate("élan", 1);
        assert!(std::str::from_utf8(t.as_bytes()).is_ok());
    }
}
