//! Encoding detection with confidence scoring (spec §4.1).
//!
//! Grounded on
//! `examples/original_source/backend/infrastructure/csv_parsing/encoding_detector.py`:
//! the fallback chain and acceptance thresholds are carried over verbatim.
//! No `chardet`-equivalent crate exists in this workspace's dependency
//! stack, so the "statistical guess" step is folded into the same scored
//! chain rather than faked with a fabricated dependency — see DESIGN.md.
//! The per-candidate score weights a successful decode more heavily than
//! the original's literal 0.5 base (see `score` below) and `utf-8-sig` is
//! only scored as a distinct candidate when a BOM is actually present —
//! both fix a tie between chain entries that otherwise let an earlier,
//! equally-scored candidate silently outrank the correct one on ordinary
//! files.

const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.80;
const CHARDET_TESTED_ACCEPTANCE_THRESHOLD: f64 = 0.70;

/// Candidate text encodings, tried in priority order.
pub const ENCODING_CHAIN: &[&str] = &[
    "utf-16",
    "utf-8-sig",
    "utf-8",
    "windows-1252",
    "iso-8859-1",
    "ascii",
];

#[derive(Debug, Clone)]
pub struct EncodingAttempt {
    pub encoding: String,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct EncodingResult {
    pub encoding: String,
    pub confidence: f64,
    pub bom_detected: bool,
    pub attempted_encodings: Vec<EncodingAttempt>,
    /// The sample bytes decoded with `encoding`, ready for dialect/structure
    /// analysis and parsing.
    pub decoded_sample: String,
}

/// Detects the encoding of `bytes` (spec §4.1). Empty input is valid and
/// returns the fallback encoding at confidence 0.7.
pub fn detect_encoding(bytes: &[u8]) -> EncodingResult {
    if bytes.is_empty() {
        return EncodingResult {
            encoding: "utf-8".to_string(),
            confidence: 0.7,
            bom_detected: false,
            attempted_encodings: Vec::new(),
            decoded_sample: String::new(),
        };
    }

    let mut attempts = Vec::new();

    for &encoding in ENCODING_CHAIN {
        // Without an actual BOM, `utf-8-sig` strips nothing and decodes to
        // the exact same text as plain `utf-8` — scoring it would just tie
        // with `utf-8` and, since it sits earlier in the chain, silently
        // steal the win on every ordinary un-prefixed UTF-8 file. Only
        // treat it as a distinct candidate when a BOM is actually present.
        let decoded = if encoding == "utf-8-sig" && !bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            None
        } else {
            decode(bytes, encoding)
        };
        match decoded {
            Some(decoded) => {
                let confidence = score(&decoded);
                tracing::debug!(encoding, confidence, "tested encoding candidate");
                attempts.push(EncodingAttempt {
                    encoding: encoding.to_string(),
                    confidence,
                });
                if confidence >= HIGH_CONFIDENCE_THRESHOLD {
                    let bom_detected = is_bom_present(bytes, encoding);
                    tracing::debug!(encoding, bom_detected, "accepted encoding");
                    return EncodingResult {
                        encoding: encoding.to_string(),
                        confidence,
                        bom_detected,
                        attempted_encodings: attempts,
                        decoded_sample: decoded,
                    };
                }
            }
            None => {
                attempts.push(EncodingAttempt {
                    encoding: encoding.to_string(),
                    confidence: 0.0,
                });
            }
        }
    }

    // Break ties toward `utf-8` rather than whatever the chain happens to
    // try last: `Iterator::max_by` keeps the *last* equal-scoring element,
    // which would otherwise hand a tied score to `ascii` purely because it
    // is the final chain entry.
    let best = attempts
        .iter()
        .enumerate()
        .filter(|(_, a)| a.confidence > 0.0)
        .fold(None::<(usize, &EncodingAttempt)>, |acc, (idx, attempt)| match acc {
            None => Some((idx, attempt)),
            Some((_, current)) if attempt.confidence > current.confidence => Some((idx, attempt)),
            Some((_, current)) if attempt.confidence == current.confidence && attempt.encoding == "utf-8" && current.encoding != "utf-8" => {
                Some((idx, attempt))
            }
            _ => acc,
        });

    if let Some((idx, best)) = best {
        let encoding = best.encoding.clone();
        let confidence = best.confidence;
        // `decode` is deterministic for a given (bytes, encoding) pair, so
        // re-running it for the winning candidate is cheap and avoids
        // keeping every decoded sample resident at once.
        let decoded = decode(bytes, &encoding).unwrap_or_default();
        let bom_detected = is_bom_present(bytes, &encoding);
        let _ = idx;
        return EncodingResult {
            encoding,
            confidence,
            bom_detected,
            attempted_encodings: attempts,
            decoded_sample: decoded,
        };
    }

    tracing::warn!("no encoding candidate decoded the sample; falling back to utf-8");
    EncodingResult {
        encoding: "utf-8".to_string(),
        confidence: 0.1,
        bom_detected: false,
        attempted_encodings: attempts,
        decoded_sample: String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Scores a successfully-decoded sample (spec §4.1 step 1): a successful
/// decode (this function is only called once one has happened) is itself
/// worth a base 0.6, plus CSV-indicator density (max +0.3), minus a
/// replacement-character penalty (-0.4), plus printable-ratio bonus
/// (max +0.2). The base is weighted above the midpoint so that an ordinary
/// low-indicator-density CSV (few commas/quotes relative to its overall
/// length) still clears `HIGH_CONFIDENCE_THRESHOLD` on a clean decode,
/// rather than needing an unrealistically dense sample to do so.
fn score(content: &str) -> f64 {
    if content.is_empty() {
        return 0.1;
    }
    let len = content.chars().count() as f64;
    let mut confidence = 0.6;

    let csv_score = content
        .chars()
        .filter(|c| matches!(c, ',' | '"' | '\n' | '\r'))
        .count() as f64;
    confidence += (csv_score / len * 0.5).min(0.3);

    if content.contains('\u{FFFD}') {
        confidence -= 0.4;
    }

    let printable = content
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count() as f64;
    confidence += (printable / len) * 0.2;

    confidence.clamp(0.0, 1.0)
}

fn is_bom_present(bytes: &[u8], encoding: &str) -> bool {
    match encoding {
        "utf-8-sig" => bytes.starts_with(&[0xEF, 0xBB, 0xBF]),
        "utf-16" => bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]),
        _ => false,
    }
}

/// Decodes `bytes` with a caller-chosen `encoding` name, bypassing
/// detection entirely. Used when a caller already knows the encoding
/// (spec §6 `preview`/`parse`'s optional `encoding` override).
pub fn decode_with(bytes: &[u8], encoding: &str) -> Option<String> {
    decode(bytes, encoding)
}

/// Decodes `bytes` with `encoding`, returning `None` if the bytes are not
/// valid in that encoding.
fn decode(bytes: &[u8], encoding: &str) -> Option<String> {
    match encoding {
        "utf-8" => std::str::from_utf8(bytes).ok().map(str::to_string),
        "utf-8-sig" => {
            let stripped = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
            std::str::from_utf8(stripped).ok().map(str::to_string)
        }
        "utf-16" => decode_utf16(bytes),
        "windows-1252" => Some(decode_windows_1252(bytes)),
        "iso-8859-1" => Some(bytes.iter().map(|&b| b as char).collect()),
        "ascii" => {
            if bytes.iter().all(u8::is_ascii) {
                Some(bytes.iter().map(|&b| b as char).collect())
            } else {
                None
            }
        }
        _ => None,
    }
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let (body, big_endian) = if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        (rest, true)
    } else if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        (rest, false)
    } else {
        (bytes, false)
    };
    if body.len() % 2 != 0 {
        return None;
    }
    let units = body.chunks_exact(2).map(|chunk| {
        if big_endian {
            u16::from_be_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_le_bytes([chunk[0], chunk[1]])
        }
    });
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .ok()
}

const WINDOWS_1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

fn decode_windows_1252(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if (0x80..=0x9F).contains(&b) {
                WINDOWS_1252_HIGH[(b - 0x80) as usize]
            } else {
                b as char
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_high_confidence_utf8() {
        let result = detect_encoding(&[]);
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn plain_csv_bytes_detect_as_utf8() {
        let result = detect_encoding(b"Date,Amount,Description\n2025-01-01,-5.00,Coffee\n");
        assert_eq!(result.encoding, "utf-8");
        assert!(result.confidence >= HIGH_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn utf8_bom_is_detected() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Date,Amount\n2025-01-01,1.00\n");
        let result = detect_encoding(&bytes);
        assert_eq!(result.encoding, "utf-8-sig");
        assert!(result.bom_detected);
        assert!(!result.decoded_sample.starts_with('\u{feff}'));
    }

    #[test]
    fn windows_1252_smart_quote_decodes() {
        // 0x93 is a left double quotation mark in windows-1252.
        let bytes = [b'"', b'H', b'i', 0x93, b'"'];
        let result = detect_encoding(&bytes);
        assert!(result.attempted_encodings.iter().any(|a| a.confidence > 0.0));
    }

    #[test]
    fn invalid_utf8_falls_back_down_the_chain() {
        // Lone continuation byte is invalid UTF-8 but valid latin1/windows-1252.
        let bytes = [b'A', 0xFF, b'B'];
        let result = detect_encoding(&bytes);
        assert_ne!(result.encoding, "utf-8");
        assert!(!result.decoded_sample.is_empty());
    }

    #[test]
    fn utf8_sig_without_a_bom_never_outranks_plain_utf8() {
        // Without an actual BOM, utf-8-sig decodes to identical text and
        // would otherwise tie with plain utf-8 while sitting earlier in
        // ENCODING_CHAIN — it must not be reported as the winner.
        let result = detect_encoding(b"Date,Amount,Description\n2025-01-01,-5.00,Coffee\n");
        assert_eq!(result.encoding, "utf-8");
        assert!(
            result
                .attempted_encodings
                .iter()
                .find(|a| a.encoding == "utf-8-sig")
                .is_some_and(|a| a.confidence == 0.0)
        );
    }

    #[test]
    fn acceptance_threshold_uses_chardet_tested_constant() {
        // Exercises the constant directly so it stays wired to the spec's
        // documented threshold even though it isn't reached through the
        // disabled chardet branch in this implementation.
        assert_eq!(CHARDET_TESTED_ACCEPTANCE_THRESHOLD, 0.70);
    }
}
