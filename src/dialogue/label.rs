//! Deterministic speaker labels.

/// Map an opaque diarization speaker id to a stable short label.
///
/// The label is the uppercase letter at the id's position in the sorted list
/// of unique ids (`'A'` + index). Ids not present in the list, and indices
/// past `'Z'` (more than 26 speakers), fall back to the raw id unchanged.
pub fn speaker_label(speaker_id: &str, unique_speakers: &[String]) -> String {
    match unique_speakers.iter().position(|s| s == speaker_id) {
        Some(index) if index < 26 => {
            let letter = (b'A' + index as u8) as char;
            letter.to_string()
        }
        _ => speaker_id.to_string(),
    }
}
