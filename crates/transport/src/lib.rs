//! Wire protocol and PCM framing
//!
//! JSON control messages plus a parallel binary audio channel on the same
//! socket. Binary frames are raw 16-bit signed little-endian PCM so a
//! client can tell audio from control without parsing.

pub mod codec;
pub mod protocol;

pub use codec::{decode_pcm16, encode_f32_frame, encode_pcm16};
pub use protocol::{parse_client_message, ClientMessage, ServerMessage, ToolStatus, WireState};

use bytes::Bytes;

/// One outbound unit: a JSON control message or a binary audio frame
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Control(ServerMessage),
    Audio(Bytes),
}
