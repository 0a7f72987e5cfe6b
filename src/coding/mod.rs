//! The byte-level codec shared by every control and data message.
//!
//! [`Decode`]/[`Encode`] are implemented directly on the wire types (`u8`,
//! `u16`, `bool`, `String`, [`VarInt`], ...) so that message bodies can be
//! built out of ordinary field-by-field `T::decode(r)?` calls.

mod bounded_string;
mod decode;
mod encode;
mod extensions;
mod hex_dump;
mod integer;
mod location;
mod parameters;
mod string;
mod track_namespace;
mod varint;

pub use bounded_string::*;
pub use decode::*;
pub use encode::*;
pub use extensions::*;
pub use hex_dump::*;
pub use location::*;
pub use parameters::*;
pub use track_namespace::*;
pub use varint::*;

// `integer` and `string` only add trait impls on foreign-ish stdlib types
// (u8, u16, bool, String); there's nothing to re-export.
