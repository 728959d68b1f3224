//! Page-read/write framing.

/// Payload bytes available after the index byte of a response frame.
pub const FRAME_VALUES: usize = 7;

/// Values carried by one extended page response frame.
pub const EXTENDED_FRAME_VALUES: usize = 4;

/// Bytes in one register page.
pub const PAGE_LEN: usize = 256;

/// Number of registers readable from `start` without leaving the page.
#[must_use]
pub fn clamp_count(start: u8, requested: usize) -> usize {
    requested.min(PAGE_LEN - usize::from(start))
}

/// `(relative_offset, register)` pairs for a span of `count` registers.
///
/// The relative offset starts at 0; the span ends at register `0xFF`.
pub fn page_span(start: u8, count: usize) -> impl Iterator<Item = (u8, u8)> {
    (0..clamp_count(start, count)).map_while(move |relative| {
        let relative = u8::try_from(relative).ok()?;
        Some((relative, start.checked_add(relative)?))
    })
}

/// Packs values into indexed frames of at most `width` bytes.
pub fn frame_chunks(values: &[u8], width: usize) -> impl Iterator<Item = (u8, &[u8])> {
    values
        .chunks(width.max(1))
        .enumerate()
        .map_while(|(index, chunk)| Some((u8::try_from(index).ok()?, chunk)))
}
