use charlay_core::{cache::GlyphMetricsCache, utf8};
use proptest::prelude::*;

// Property: well-formed UTF-8 decodes to exactly the characters of the string
proptest! {
    #[test]
    fn prop_valid_utf8_matches_std_chars(text in "\\PC{0,64}") {
        let decoded: Vec<u32> = utf8::codepoints(text.as_bytes()).map(|d| d.codepoint).collect();
        let expected: Vec<u32> = text.chars().map(|c| c as u32).collect();
        prop_assert_eq!(decoded, expected);
    }
}

// Property: any byte string is walked completely, one character per step
proptest! {
    #[test]
    fn prop_arbitrary_bytes_are_fully_consumed(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let mut consumed = 0;
        for step in utf8::codepoints(&bytes) {
            prop_assert!(!step.bytes.is_empty());
            prop_assert!(step.bytes.len() <= 4);
            prop_assert_eq!(step.text().chars().count(), 1);
            if step.malformed {
                prop_assert_eq!(step.bytes.len(), 1);
                prop_assert_eq!(step.codepoint, utf8::REPLACEMENT);
            }
            prop_assert_eq!(step.bytes, &bytes[consumed..consumed + step.bytes.len()]);
            consumed += step.bytes.len();
        }
        prop_assert_eq!(consumed, bytes.len());
    }
}

// Property: clearing one font leaves every other font's widths in place
proptest! {
    #[test]
    fn prop_clear_font_only_touches_that_font(
        entries in prop::collection::vec((1u32..5, 6u32..40, 0x20u32..0x7F, 1i32..50), 1..80),
        victim in 1u32..5,
    ) {
        let mut cache = GlyphMetricsCache::new();
        for &(font, px, cp, width) in &entries {
            cache.put(font, px, cp, width);
        }
        cache.clear_font(victim);

        for &(font, px, cp, _) in &entries {
            prop_assert_eq!(cache.contains(font, px, cp), font != victim);
        }
        prop_assert_eq!(cache.stats().hits + cache.stats().misses, 0);
    }
}
