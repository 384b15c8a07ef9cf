//! QR attendance tokens: issuance on the student's device, verification on
//! the checking device.
//!
//! A token is a JSON [`AttendancePayload`] signed with a lightweight digest,
//! stamped with its issue time and issuance coordinates. Verification
//! re-derives the digest, checks the token's age against the validity window,
//! and, when the verifier knows where it is, checks that it is inside the
//! classroom geofence.

pub mod geo;
pub mod issuer;
pub mod location;
pub mod payload;
pub mod qr;
pub mod session_id;
pub mod signature;
pub mod verifier;

pub use geo::{Coordinates, Geofence, haversine_distance_m};
pub use issuer::{IssuedToken, IssuerSettings, TokenIssuer};
pub use location::{FixedLocation, LocationError, LocationProvider, LocationSource, NoLocation};
pub use payload::{AttendancePayload, UnsignedPayload};
pub use session_id::{derive_session_id, derive_session_id_at};
pub use verifier::{
    TokenVerifier, VerificationDetails, VerificationFailure, VerificationResult, VerifierPolicy,
};
