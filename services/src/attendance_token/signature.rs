//! Lightweight tamper-evidence digest for attendance payloads.
//!
//! This is a 32-bit rolling hash over a public format. It catches accidental
//! corruption and naive edits; anyone who knows the format can forge it.

use super::payload::UnsignedPayload;

/// Digest over `rollNo-subject-sessionId-timestamp`.
///
/// `lat` and `lng` are part of the input type but not of the digested string,
/// so moving the claimed issuance point does not change the signature.
pub fn sign(payload: &UnsignedPayload) -> String {
    let material = format!(
        "{}-{}-{}-{}",
        payload.roll_no, payload.subject, payload.session_id, payload.timestamp
    );
    to_hex(rolling_hash(&material))
}

/// `h = h * 31 + unit` over the UTF-16 code units of `input`, wrapping at 32 bits.
pub fn rolling_hash(input: &str) -> i32 {
    input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// Absolute value in upper-case hex. Widened first so `i32::MIN` renders as
/// `80000000` instead of overflowing.
pub fn to_hex(hash: i32) -> String {
    format!("{:X}", i64::from(hash).abs())
}
