/*
 *  text/utf8.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Incremental UTF-8 decoder for text runs
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use thiserror::Error;

/// Codepoint substituted for an unrecognised lead byte
pub const REPLACEMENT: char = '?';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("end of input")]
    EndOfInput,
    #[error("input ends inside a multi-byte sequence")]
    Truncated,
    #[error("invalid continuation byte {0:#04x}")]
    InvalidContinuation(u8),
    #[error("invalid lead byte {0:#04x}")]
    InvalidLeadByte(u8),
}

impl DecodeError {
    /// Placeholder a lenient caller may show in place of the bad byte.
    pub fn replacement(&self) -> Option<char> {
        match self {
            DecodeError::InvalidLeadByte(_) => Some(REPLACEMENT),
            _ => None,
        }
    }
}

/// Decode the codepoint starting at `bytes[*index]` and advance `index`
/// past the bytes consumed.
///
/// On failure `index` covers only what was actually read: the lead byte
/// and any valid continuation bytes. A byte that fails the continuation
/// check is left for the caller. Overlong forms and surrogates are not
/// rejected.
pub fn decode_utf8(bytes: &[u8], index: &mut usize) -> Result<u32, DecodeError> {
    let Some(&lead) = bytes.get(*index) else {
        return Err(DecodeError::EndOfInput);
    };
    *index += 1;

    let (continuations, mut cp) = match lead {
        0x00..=0x7F => return Ok(lead as u32),
        b if b >> 5 == 0b110 => (1, (b & 0x1F) as u32),
        b if b >> 4 == 0b1110 => (2, (b & 0x0F) as u32),
        b if b >> 3 == 0b11110 => (3, (b & 0x07) as u32),
        b => return Err(DecodeError::InvalidLeadByte(b)),
    };

    for _ in 0..continuations {
        let Some(&byte) = bytes.get(*index) else {
            return Err(DecodeError::Truncated);
        };
        if byte >> 6 != 0b10 {
            return Err(DecodeError::InvalidContinuation(byte));
        }
        *index += 1;
        cp = (cp << 6) | (byte & 0x3F) as u32;
    }
    Ok(cp)
}
