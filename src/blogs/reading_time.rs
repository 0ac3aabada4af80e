/// Average adult reading speed.
pub const WORDS_PER_MINUTE: usize = 200;

/// Estimated minutes to read `body`: `ceil(words / 200)`, never below 1 for
/// a body with any words, and 0 for an empty or whitespace-only body.
pub fn reading_time(body: &str) -> i32 {
    let words = body.split_whitespace().count();
    if words == 0 {
        return 0;
    }
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i32
}
