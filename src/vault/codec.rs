use std::io::{self, Read, Write};
use std::iter;
use indicatif::ProgressBar;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use crate::rsa::RsaEngine;
use crate::vault::VaultError;

/// Bytes per ciphertext block, a little endian `i32`.
pub const BLOCK_SIZE: usize = 4;

/// Written after the plaintext; dropped again on decode.
pub const SENTINEL: char = '\n';

pub fn encode_block(value: &BigInt) -> Result<[u8; BLOCK_SIZE], VaultError> {
    value.to_i32()
        .map(i32::to_le_bytes)
        .ok_or_else(|| VaultError::BlockOverflow(value.clone()))
}

/// Writes one block per character of `plaintext`, then the encrypted
/// [`SENTINEL`]. Returns the number of blocks written.
pub fn encode(plaintext: &str, engine: &RsaEngine, writer: &mut dyn Write, progress: Option<&ProgressBar>) -> Result<usize, VaultError> {
    let mut blocks = 0;
    for symbol in plaintext.chars().chain(iter::once(SENTINEL)) {
        writer.write_all(&encode_block(&engine.encrypt(symbol))?)?;
        blocks += 1;
        if let Some(pb) = progress { pb.inc(1); }
    }
    writer.flush()?;
    Ok(blocks)
}

pub fn encode_to_vec(plaintext: &str, engine: &RsaEngine) -> Result<Vec<u8>, VaultError> {
    let mut buf = Vec::with_capacity((plaintext.len() + 1) * BLOCK_SIZE);
    encode(plaintext, engine, &mut buf, None)?;
    Ok(buf)
}

fn read_block(reader: &mut dyn Read) -> io::Result<Option<i32>> {
    let mut buf = [0u8; BLOCK_SIZE];
    let mut filled = 0;
    while filled < BLOCK_SIZE {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok((filled == BLOCK_SIZE).then(|| i32::from_le_bytes(buf)))
}

/// Decrypts blocks until end of stream, a trailing partial block, a zero
/// block, or a block that decrypts to `'\0'`. The terminator is not part of
/// the output. A final [`SENTINEL`] is dropped only when the stream ran out,
/// since that is the only place the writer puts it.
pub fn decode(reader: &mut dyn Read, engine: &RsaEngine, progress: Option<&ProgressBar>) -> Result<String, VaultError> {
    let mut plaintext = String::new();
    let mut end_of_stream = true;
    while let Some(block) = read_block(reader)? {
        let symbol = match block {
            0 => '\0',
            _ => engine.decrypt(&BigInt::from(block)),
        };
        if symbol == '\0' {
            end_of_stream = false;
            break;
        }
        plaintext.push(symbol);
        if let Some(pb) = progress { pb.inc(1); }
    }
    if end_of_stream && plaintext.ends_with(SENTINEL) {
        plaintext.pop();
    }
    Ok(plaintext)
}
