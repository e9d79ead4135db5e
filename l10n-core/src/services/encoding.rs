use chardetng::EncodingDetector;
use encoding_rs::UTF_8;

/// Decodes locale file bytes as UTF-8, dropping a leading BOM.
///
/// On invalid UTF-8 returns the name of the encoding the bytes most likely
/// use, so the caller can tell the user what to convert from.
pub fn decode_utf8(bytes: &[u8]) -> Result<String, String> {
    match UTF_8.decode_without_bom_handling_and_without_replacement(strip_bom(bytes)) {
        Some(text) => Ok(text.into_owned()),
        None => Err(guess_encoding(bytes)),
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes)
}

fn guess_encoding(bytes: &[u8]) -> String {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true).name().to_lowercase()
}
