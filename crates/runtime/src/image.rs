//! Image reference handling.

/// Tag used when a reference names none.
pub const DEFAULT_TAG: &str = "latest";

/// Split an image reference into the `fromImage` and `tag` parts the pull
/// endpoint expects.
///
/// A colon only starts a tag when it appears after the last `/`, so a
/// registry port (`registry:5000/app`) is not mistaken for one. Digest
/// references are passed through whole with no tag.
pub fn split_reference(reference: &str) -> (&str, Option<&str>) {
    if reference.contains('@') {
        return (reference, None);
    }
    let name_start = reference.rfind('/').map_or(0, |i| i + 1);
    match reference[name_start..].rfind(':') {
        Some(i) => {
            let at = name_start + i;
            (&reference[..at], Some(&reference[at + 1..]))
        }
        None => (reference, Some(DEFAULT_TAG)),
    }
}
