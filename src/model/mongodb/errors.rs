//! The mongodb crate doesn't provide error code constants; this module fills
//! in the gap for the one code we care about.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

const DUPLICATE_KEY: i32 = 11000;

/// Is the given error a unique-index violation?
pub fn is_duplicate_key(err: &DbError) -> bool {
    if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *err.kind {
        write_error.code == DUPLICATE_KEY
    } else {
        false
    }
}
