//! Wire vocabulary for the Gambit session protocol.
//!
//! Every session runs over one bidirectional text channel carrying JSON
//! objects. Inbound objects carry a `type` tag naming their kind; outbound
//! moves carry the same tag so servers that require it and servers that
//! ignore it both accept them. A handful of REST endpoints complement the
//! channel: session listing, session snapshot, and the computation service.
//!
//! Inbound parsing is strict. Known kinds must match their payload shape
//! exactly or parsing fails with [`ProtocolError::Malformed`], which callers
//! treat as a reason to resynchronise. Kinds this crate does not know become
//! [`ServerMessage::Unrecognized`] so newer servers never crash older clients.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod message;
pub mod rest;
pub mod types;

pub use errors::{ProtocolError, Result};
pub use message::{
    ClientMessage, ColorAssignment, ErrorPayload, InitPayload, MovePayload, ServerMessage,
    StatusPayload,
};
pub use rest::{
    EvaluationResponse, PositionBody, SessionListing, SessionSnapshot, SuggestionResponse,
};
pub use types::{ClientId, Seat, SessionId};

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn server_parse_never_panics(text in ".{0,256}") {
            let _ = ServerMessage::parse(&text);
        }

        #[test]
        fn any_tagged_object_parses_or_reports(kind in "[a-z_]{1,16}", fen in "[a-zA-Z0-9/ -]{0,40}") {
            let text = serde_json::json!({ "type": kind, "fen": fen }).to_string();
            match ServerMessage::parse(&text) {
                Ok(msg) => prop_assert_eq!(msg.kind(), kind.as_str()),
                Err(ProtocolError::Malformed { kind: reported, .. }) => prop_assert_eq!(reported, kind),
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
    }
}
