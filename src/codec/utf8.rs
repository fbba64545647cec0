//! Incremental UTF-8 decoding into UTF-16 code units, and UTF-8 encoding.
//!
//! The decoder is fed one byte at a time, as bytes are read out of linear memory, and emits a
//! UTF-16 code unit whenever a sequence completes. It understands one-, two- and three-byte
//! sequences only:
//!
//! | Lead byte   | Continuations | Code unit                                        |
//! |-------------|---------------|--------------------------------------------------|
//! | `0..=127`   | 0             | the byte                                         |
//! | `192..=223` | 1             | `((b0 & 31) << 6) \| (b1 & 63)`                  |
//! | any other   | 2             | `((b0 & 15) << 12) \| ((b1 & 63) << 6) \| (b2 & 63)` |
//!
//! Four-byte (astral) sequences are not decoded as such; their lead byte is treated as the
//! start of a three-byte sequence.

/// Streaming decoder state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Utf8Decoder {
    pending: [u8; 3],
    len: usize,
    needed: usize,
}

impl Utf8Decoder {
    /// Creates a decoder with no pending sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a multi-byte sequence is incomplete.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.len > 0
    }

    /// Feeds one byte. Returns a code unit once a sequence is complete.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use memrt::codec::Utf8Decoder;
    ///
    /// let mut decoder = Utf8Decoder::new();
    /// assert_eq!(decoder.decode_byte(b'A'), Some(0x41));
    ///
    /// // U+00E9, two bytes
    /// assert_eq!(decoder.decode_byte(0xC3), None);
    /// assert_eq!(decoder.decode_byte(0xA9), Some(0xE9));
    /// ```
    pub fn decode_byte(&mut self, byte: u8) -> Option<u16> {
        if self.needed > 0 {
            self.pending[self.len] = byte;
            self.len += 1;
            self.needed -= 1;
        }

        if self.len == 0 {
            if byte < 128 {
                return Some(u16::from(byte));
            }
            self.pending[0] = byte;
            self.len = 1;
            self.needed = if (192..=223).contains(&byte) { 1 } else { 2 };
            return None;
        }

        if self.needed > 0 {
            return None;
        }

        let [b0, b1, b2] = self.pending.map(u16::from);
        let unit = if self.len == 2 {
            ((b0 & 31) << 6) | (b1 & 63)
        } else {
            ((b0 & 15) << 12) | ((b1 & 63) << 6) | (b2 & 63)
        };
        *self = Self::default();
        Some(unit)
    }

    /// Decodes a whole byte sequence with a fresh decoder.
    ///
    /// Code units are converted to a `String` with lossy UTF-16 decoding; an incomplete
    /// trailing sequence is dropped.
    #[must_use]
    pub fn decode_bytes(bytes: &[u8]) -> String {
        let mut decoder = Self::new();
        let units: Vec<u16> = bytes.iter().filter_map(|&b| decoder.decode_byte(b)).collect();
        String::from_utf16_lossy(&units)
    }
}

/// Encodes `text` as UTF-8, one byte per element.
#[must_use]
pub fn encode_string(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii() {
        let mut decoder = Utf8Decoder::new();
        for b in 0u8..128 {
            assert_eq!(decoder.decode_byte(b), Some(u16::from(b)));
        }
        assert!(!decoder.is_pending());
    }

    #[test]
    fn test_two_byte() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode_byte(0xC3), None);
        assert!(decoder.is_pending());
        assert_eq!(decoder.decode_byte(0xB6), Some(0xF6));
        assert!(!decoder.is_pending());
    }

    #[test]
    fn test_three_byte() {
        // U+20AC EURO SIGN
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode_byte(0xE2), None);
        assert_eq!(decoder.decode_byte(0x82), None);
        assert_eq!(decoder.decode_byte(0xAC), Some(0x20AC));
    }

    #[test]
    fn test_stray_continuation_starts_three_byte_sequence() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode_byte(0x80), None);
        assert_eq!(decoder.decode_byte(0x80), None);
        assert_eq!(decoder.decode_byte(0x80), Some(0));
    }

    #[test]
    fn test_round_trip_bmp() {
        for text in ["", "hello", "grüße", "日本語", "€ 5,00 – ok", "mixed ascii ÿ ☃"] {
            assert_eq!(Utf8Decoder::decode_bytes(&encode_string(text)), text);
        }
    }

    #[test]
    fn test_encode_matches_std() {
        assert_eq!(encode_string("aé€"), vec![0x61, 0xC3, 0xA9, 0xE2, 0x82, 0xAC]);
    }

    #[test]
    fn test_incomplete_tail_dropped() {
        assert_eq!(Utf8Decoder::decode_bytes(&[b'a', 0xE2, 0x82]), "a");
    }
}
