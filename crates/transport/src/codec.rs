//! Binary PCM framing
//!
//! Inbound frames carry 16-bit signed little-endian samples at the
//! client's native rate. Outbound TTS frames use the same encoding;
//! pipeline audio arrives as f32 and is converted here, one wire frame
//! per pipeline chunk.

use bytes::{BufMut, Bytes, BytesMut};

use voice_bridge_core::f32_to_i16;

/// Decode a binary frame into samples. A trailing odd byte is dropped.
pub fn decode_pcm16(data: &[u8]) -> Vec<i16> {
    data.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode samples into a binary frame
pub fn encode_pcm16(samples: &[i16]) -> Bytes {
    let mut buf = BytesMut::with_capacity(samples.len() * 2);
    for &s in samples {
        buf.put_i16_le(s);
    }
    buf.freeze()
}

/// Convert one pipeline audio chunk (f32 in [-1, 1]) into a wire frame
pub fn encode_f32_frame(samples: &[f32]) -> Bytes {
    encode_pcm16(&f32_to_i16(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_round_trip() {
        let samples = vec![0i16, 1, -1, 32767, -32768, 12345];
        let encoded = encode_pcm16(&samples);
        assert_eq!(encoded.len(), samples.len() * 2);
        assert_eq!(decode_pcm16(&encoded), samples);
    }

    #[test]
    fn test_decode_drops_trailing_odd_byte() {
        let decoded = decode_pcm16(&[0x01, 0x00, 0xff]);
        assert_eq!(decoded, vec![1]);
    }

    #[test]
    fn test_f32_frame_conversion() {
        let frame = encode_f32_frame(&[1.0, -1.0, 0.0]);
        let samples = decode_pcm16(&frame);
        assert_eq!(samples, vec![32767, -32767, 0]);
    }

    #[test]
    fn test_f32_frame_clamps() {
        let frame = encode_f32_frame(&[1.5, -2.0]);
        assert_eq!(decode_pcm16(&frame), vec![32767, -32767]);
    }
}
