//! Raw file I/O for the bridge.
//!
//! Content crosses the bridge as a string either way: base64-encoded raw
//! bytes when `binary` is set, decoded text otherwise. Only UTF-8 text is
//! supported; unknown encoding labels fall back to it. Failures never
//! surface to script: reads yield the empty string, writes yield false.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{debug, warn};

fn is_utf8_label(encoding: &str) -> bool {
    matches!(
        encoding.to_ascii_lowercase().as_str(),
        "" | "utf8" | "utf-8"
    )
}

/// Read `path`, returning base64 bytes or decoded text. Empty string on
/// any failure (unopenable path, undecodable text).
pub fn read_file(path: &str, binary: bool, encoding: &str) -> String {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path, "readFile failed: {}", e);
            return String::new();
        }
    };

    if binary {
        return BASE64.encode(bytes);
    }

    if !is_utf8_label(encoding) {
        warn!(path, encoding, "unsupported encoding, decoding as utf-8");
    }
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(path, "readFile produced invalid utf-8: {}", e);
            String::new()
        }
    }
}

/// Create/truncate `path` with `data`, interpreted per the same
/// binary/encoding contract. False on any failure, never an error.
pub fn write_file(path: &str, data: &str, binary: bool, encoding: &str) -> bool {
    let bytes = if binary {
        match BASE64.decode(data) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path, "writeFile given undecodable base64: {}", e);
                return false;
            }
        }
    } else {
        if !is_utf8_label(encoding) {
            warn!(path, encoding, "unsupported encoding, writing utf-8");
        }
        data.as_bytes().to_vec()
    };

    match std::fs::write(path, bytes) {
        Ok(()) => true,
        Err(e) => {
            debug!(path, "writeFile failed: {}", e);
            false
        }
    }
}
