//! Lenient UTF-8 walking for text handed over by the layout engine
//!
//! The engine's text is not guaranteed to be valid UTF-8. Each step reads a
//! lead byte, then 1-3 continuation bytes. Anything malformed becomes
//! U+FFFD and the walk advances exactly one byte, so a single bad byte never
//! swallows the characters after it. Overlong encodings, surrogates and
//! values past U+10FFFF count as malformed.

/// U+FFFD REPLACEMENT CHARACTER
pub const REPLACEMENT: u32 = 0xFFFD;

const REPLACEMENT_STR: &str = "\u{FFFD}";

/// One decoded step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded<'a> {
    pub codepoint: u32,
    /// The bytes this step consumed
    pub bytes: &'a [u8],
    pub malformed: bool,
}

impl<'a> Decoded<'a> {
    /// The character's UTF-8 text (U+FFFD when malformed)
    pub fn text(&self) -> std::borrow::Cow<'a, str> {
        if self.malformed {
            std::borrow::Cow::Borrowed(REPLACEMENT_STR)
        } else {
            String::from_utf8_lossy(self.bytes)
        }
    }
}

/// Iterator over the codepoints of a byte string
#[derive(Debug, Clone)]
pub struct Codepoints<'a> {
    bytes: &'a [u8],
    pos: usize,
}

/// Walk `bytes` one codepoint at a time
pub fn codepoints(bytes: &[u8]) -> Codepoints<'_> {
    Codepoints { bytes, pos: 0 }
}

impl<'a> Iterator for Codepoints<'a> {
    type Item = Decoded<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.bytes.get(self.pos..)?;
        let lead = *rest.first()?;

        let (mut codepoint, len) = match lead {
            b if b & 0x80 == 0 => (b as u32, 1),
            b if b & 0xE0 == 0xC0 => ((b & 0x1F) as u32, 2),
            b if b & 0xF0 == 0xE0 => ((b & 0x0F) as u32, 3),
            b if b & 0xF8 == 0xF0 => ((b & 0x07) as u32, 4),
            _ => return Some(self.malformed()),
        };

        if rest.len() < len {
            return Some(self.malformed());
        }
        for &cont in &rest[1..len] {
            if cont & 0xC0 != 0x80 {
                return Some(self.malformed());
            }
            codepoint = (codepoint << 6) | (cont & 0x3F) as u32;
        }
        if !is_scalar(codepoint, len) {
            return Some(self.malformed());
        }

        let start = self.pos;
        self.pos += len;
        Some(Decoded {
            codepoint,
            bytes: &self.bytes[start..self.pos],
            malformed: false,
        })
    }
}

/// Shortest-form encoding of a Unicode scalar value
fn is_scalar(codepoint: u32, len: usize) -> bool {
    let shortest = match codepoint {
        0..=0x7F => 1,
        0x80..=0x7FF => 2,
        0x800..=0xFFFF => 3,
        _ => 4,
    };
    shortest == len && char::from_u32(codepoint).is_some()
}

impl<'a> Codepoints<'a> {
    fn malformed(&mut self) -> Decoded<'a> {
        let start = self.pos;
        self.pos += 1;
        Decoded {
            codepoint: REPLACEMENT,
            bytes: &self.bytes[start..self.pos],
            malformed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cps(bytes: &[u8]) -> Vec<u32> {
        codepoints(bytes).map(|d| d.codepoint).collect()
    }

    #[test]
    fn decodes_one_to_four_byte_sequences() {
        assert_eq!(cps("a".as_bytes()), vec![0x61]);
        assert_eq!(cps("é".as_bytes()), vec![0xE9]);
        assert_eq!(cps("中".as_bytes()), vec![0x4E2D]);
        assert_eq!(cps("😀".as_bytes()), vec![0x1F600]);
    }

    #[test]
    fn bad_lead_byte_advances_one_byte() {
        let decoded: Vec<_> = codepoints(&[0xFF, b'a']).collect();
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].malformed);
        assert_eq!(decoded[0].text(), "\u{FFFD}");
        assert_eq!(decoded[1].codepoint, 'a' as u32);
    }

    #[test]
    fn broken_continuation_keeps_following_ascii() {
        // 0xE4 expects two continuation bytes; 'b' is not one.
        assert_eq!(cps(&[0xE4, b'b', b'c']), vec![REPLACEMENT, 0x62, 0x63]);
    }

    #[test]
    fn truncated_tail_is_replaced() {
        assert_eq!(cps(&[b'x', 0xF0, 0x9F]), vec![0x78, REPLACEMENT, REPLACEMENT]);
    }

    #[test]
    fn overlong_surrogate_and_out_of_range_are_replaced() {
        // Overlong 'A', overlong '/', overlong U+20AC
        assert_eq!(cps(&[0xC1, 0x81]), vec![REPLACEMENT, REPLACEMENT]);
        assert_eq!(cps(&[0xE0, 0x80, 0xAF]), vec![REPLACEMENT; 3]);
        assert_eq!(cps(&[0xF0, 0x82, 0x82, 0xAC]), vec![REPLACEMENT; 4]);
        // U+D800
        assert_eq!(cps(&[0xED, 0xA0, 0x80, b'z']), vec![REPLACEMENT, REPLACEMENT, REPLACEMENT, 0x7A]);
        // U+110000
        assert_eq!(cps(&[0xF4, 0x90, 0x80, 0x80]), vec![REPLACEMENT; 4]);
        // Boundaries that are fine
        assert_eq!(cps("\u{80}\u{800}\u{10000}\u{10FFFF}".as_bytes()), vec![0x80, 0x800, 0x10000, 0x10FFFF]);
    }

    #[test]
    fn every_step_yields_exactly_one_character() {
        let bytes = [b'a', 0xFF, 0xC1, 0x81, 0xED, 0xA0, 0x80, 0xF4, 0x90, 0x80, 0x80, b'b'];
        for decoded in codepoints(&bytes) {
            let text = decoded.text();
            assert_eq!(text.chars().count(), 1);
            assert_eq!(text.chars().next().map(u32::from), Some(decoded.codepoint));
        }
    }

    #[test]
    fn text_round_trips_valid_characters() {
        let texts: Vec<String> = codepoints("Hi中".as_bytes())
            .map(|d| d.text().into_owned())
            .collect();
        assert_eq!(texts, vec!["H", "i", "中"]);
    }
}
