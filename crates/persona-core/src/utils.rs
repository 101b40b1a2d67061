//! Small helpers shared by the runtime crates.

use std::time::Instant;

/// Maximum characters of tool output handed back to the model.
pub const MAX_OUTPUT_CHARS: usize = 30_000;

/// Milliseconds elapsed since `start`, saturating at `u64::MAX`.
#[must_use]
pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Truncate output to [`MAX_OUTPUT_CHARS`], respecting char boundaries.
#[must_use]
pub fn truncate_output(output: String) -> String {
    if output.len() <= MAX_OUTPUT_CHARS {
        return output;
    }
    let mut end = MAX_OUTPUT_CHARS;
    while end > 0 && !output.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    let mut truncated = output[..end].to_string();
    truncated.push_str("\n\n... (output truncated)");
    truncated
}
