use std::{
    io::{Read, Write},
    time::Duration,
};

use super::{
    errors::Result,
    messages::{Message, PAYLOAD_LEN, Payload, REQUEST_LEN, Request},
};
use crate::game::{Update, entities::Decision};

/// Default timeout for gameplay reads and writes.
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Read exactly one fixed-width frame.
pub fn read_frame<const N: usize, R: Read>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Write a whole frame in one chunk.
pub fn write_message<W: Write>(writer: &mut W, msg: &Message) -> Result<()> {
    writer.write_all(&msg.encode())?;
    writer.flush()?;
    Ok(())
}

pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let buf = read_frame::<REQUEST_LEN, R>(reader)?;
    Ok(Request::decode(&buf)?)
}

pub fn read_decision<R: Read>(reader: &mut R) -> Result<Decision> {
    let buf = read_frame::<PAYLOAD_LEN, R>(reader)?;
    Ok(Payload::decode_decision(&buf)?)
}

pub fn read_update<R: Read>(reader: &mut R) -> Result<Update> {
    let buf = read_frame::<PAYLOAD_LEN, R>(reader)?;
    Ok(Payload::decode_update(&buf)?)
}
