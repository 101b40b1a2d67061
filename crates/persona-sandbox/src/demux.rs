//! Container log stream demultiplexing.
//!
//! Without a TTY the engine multiplexes stdout and stderr into one stream of
//! frames:
//!
//! ```text
//! [stream: u8][0][0][0][length: u32 big-endian][payload: length bytes]
//! ```
//!
//! Stream `1` is stdout and `2` is stderr. A truncated final frame keeps
//! whatever payload bytes arrived.

const HEADER_LEN: usize = 8;
const STREAM_STDERR: u8 = 2;

/// Split a multiplexed log stream into `(stdout, stderr)`.
///
/// Input that does not start with a frame header is treated as plain stdout.
/// Text is decoded lossily.
#[must_use]
pub fn demux_logs(raw: &[u8]) -> (String, String) {
    if !looks_multiplexed(raw) {
        return (String::from_utf8_lossy(raw).into_owned(), String::new());
    }

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut rest = raw;

    while rest.len() >= HEADER_LEN {
        let (header, body) = rest.split_at(HEADER_LEN);
        let declared = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        let len = usize::try_from(declared).unwrap_or(usize::MAX).min(body.len());
        let (payload, tail) = body.split_at(len);

        if header[0] == STREAM_STDERR {
            stderr.extend_from_slice(payload);
        } else {
            stdout.extend_from_slice(payload);
        }
        rest = tail;
    }

    (
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    )
}

fn looks_multiplexed(raw: &[u8]) -> bool {
    matches!(raw, [0..=2, 0, 0, 0, _, _, _, _, ..])
}
