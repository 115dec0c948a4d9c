use crate::{Message, MessageType, ProtocolError, Result, MAX_MESSAGE_SIZE};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Codec for encoding/decoding messages with length-prefixed framing
///
/// Frame format: [4-byte length (big-endian)] [1-byte message type] [JSON payload]
///
/// A frame with an unknown type byte or an undecodable payload is consumed
/// whole and decoded as [`Message::Malformed`], so the stream stays aligned
/// and the server can answer with a malformed-message reply.
pub struct MessageCodec;

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        // Need at least the length prefix
        if src.len() < 4 {
            return Ok(None);
        }

        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&src[0..4]);
        let length = u32::from_be_bytes(length_bytes) as usize;

        if length > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge(length));
        }
        // A zero-length frame has no type byte; it is complete as-is
        if length == 0 {
            src.advance(4);
            return Ok(Some(Message::Malformed));
        }

        // Wait for the complete frame
        if src.len() < 4 + length {
            src.reserve(4 + length - src.len());
            return Ok(None);
        }

        src.advance(4);
        let msg_type_byte = src.get_u8();
        let payload = src.split_to(length - 1);

        let message = match MessageType::from_u8(msg_type_byte) {
            Some(MessageType::RunTask) => serde_json::from_slice(&payload)
                .map(Message::RunTask)
                .unwrap_or(Message::Malformed),
            Some(MessageType::GetResult) => serde_json::from_slice(&payload)
                .map(Message::GetResult)
                .unwrap_or(Message::Malformed),
            Some(MessageType::Wait) => serde_json::from_slice(&payload)
                .map(Message::Wait)
                .unwrap_or(Message::Malformed),
            Some(MessageType::Reply) => serde_json::from_slice(&payload)
                .map(Message::Reply)
                .unwrap_or(Message::Malformed),
            None => Message::Malformed,
        };

        Ok(Some(message))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        let msg_type = item
            .message_type()
            .ok_or_else(|| ProtocolError::Protocol("malformed message cannot be encoded".to_string()))?;

        let payload = match &item {
            Message::RunTask(req) => serde_json::to_vec(req)?,
            Message::GetResult(req) => serde_json::to_vec(req)?,
            Message::Wait(req) => serde_json::to_vec(req)?,
            Message::Reply(reply) => serde_json::to_vec(reply)?,
            Message::Malformed => unreachable!("checked above"),
        };

        let total_length = 1 + payload.len();
        if total_length > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge(total_length));
        }

        dst.reserve(4 + total_length);
        dst.put_u32(total_length as u32);
        dst.put_u8(msg_type.as_u8());
        dst.put_slice(&payload);

        Ok(())
    }
}
