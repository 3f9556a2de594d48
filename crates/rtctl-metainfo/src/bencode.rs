//! Bencode value model with a strict decoder and canonical encoder.
//!
//! # Design
//! - Dictionaries are kept in a `BTreeMap`, so encoding always emits keys in the
//!   sorted order the info hash depends on.
//! - Decoding rejects zero-padded integers, `-0`, trailing bytes, and nesting
//!   deeper than [`MAX_DEPTH`].

use std::collections::BTreeMap;

use crate::error::{MetainfoError, MetainfoResult};

/// Deepest list/dictionary nesting accepted by [`decode`].
pub const MAX_DEPTH: usize = 64;

/// One bencoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bencode {
    /// `i<n>e`
    Int(i64),
    /// `<len>:<bytes>`
    Bytes(Vec<u8>),
    /// `l...e`
    List(Vec<Bencode>),
    /// `d...e`
    Dict(BTreeMap<Vec<u8>, Bencode>),
}

impl Bencode {
    /// Dictionary contents, if this is a dictionary.
    #[must_use]
    pub const fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, Self>> {
        match self {
            Self::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Byte string as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Dictionary lookup by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_dict().and_then(|entries| entries.get(key.as_bytes()))
    }
}

/// Decode exactly one value spanning all of `input`.
///
/// # Errors
///
/// Returns a [`MetainfoError`] describing the first malformed byte.
pub fn decode(input: &[u8]) -> MetainfoResult<Bencode> {
    let mut decoder = Decoder { input, pos: 0 };
    let value = decoder.value(0)?;
    if decoder.pos != input.len() {
        return Err(MetainfoError::TrailingData {
            offset: decoder.pos,
        });
    }
    Ok(value)
}

/// Encode a value canonically.
#[must_use]
pub fn encode(value: &Bencode) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(value, &mut out);
    out
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(bytes);
}

fn write_value(value: &Bencode, out: &mut Vec<u8>) {
    match value {
        Bencode::Int(number) => {
            out.push(b'i');
            out.extend_from_slice(number.to_string().as_bytes());
            out.push(b'e');
        }
        Bencode::Bytes(bytes) => write_bytes(bytes, out),
        Bencode::List(items) => {
            out.push(b'l');
            for item in items {
                write_value(item, out);
            }
            out.push(b'e');
        }
        Bencode::Dict(entries) => {
            out.push(b'd');
            for (key, item) in entries {
                write_bytes(key, out);
                write_value(item, out);
            }
            out.push(b'e');
        }
    }
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn peek(&self) -> MetainfoResult<u8> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(MetainfoError::UnexpectedEof { offset: self.pos })
    }

    fn find(&self, needle: u8) -> MetainfoResult<usize> {
        self.input[self.pos..]
            .iter()
            .position(|byte| *byte == needle)
            .map(|index| self.pos + index)
            .ok_or(MetainfoError::UnexpectedEof {
                offset: self.input.len(),
            })
    }

    fn value(&mut self, depth: usize) -> MetainfoResult<Bencode> {
        if depth > MAX_DEPTH {
            return Err(MetainfoError::NestingTooDeep { offset: self.pos });
        }
        match self.peek()? {
            b'i' => self.integer(),
            b'l' => {
                self.pos += 1;
                let mut items = Vec::new();
                while self.peek()? != b'e' {
                    items.push(self.value(depth + 1)?);
                }
                self.pos += 1;
                Ok(Bencode::List(items))
            }
            b'd' => {
                self.pos += 1;
                let mut entries = BTreeMap::new();
                while self.peek()? != b'e' {
                    let key = self.bytes()?;
                    let item = self.value(depth + 1)?;
                    entries.insert(key, item);
                }
                self.pos += 1;
                Ok(Bencode::Dict(entries))
            }
            b'0'..=b'9' => self.bytes().map(Bencode::Bytes),
            byte => Err(MetainfoError::InvalidByte {
                offset: self.pos,
                byte,
            }),
        }
    }

    fn integer(&mut self) -> MetainfoResult<Bencode> {
        let start = self.pos + 1;
        self.pos = start;
        let end = self.find(b'e')?;
        let body = &self.input[start..end];
        let invalid = MetainfoError::InvalidInteger { offset: start };
        let digits = body.strip_prefix(b"-").unwrap_or(body);
        if digits.is_empty()
            || !digits.iter().all(u8::is_ascii_digit)
            || (digits.len() > 1 && digits[0] == b'0')
            || body == b"-0"
        {
            return Err(invalid);
        }
        let number = std::str::from_utf8(body)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .ok_or(invalid)?;
        self.pos = end + 1;
        Ok(Bencode::Int(number))
    }

    fn bytes(&mut self) -> MetainfoResult<Vec<u8>> {
        let start = self.pos;
        let first = self.peek()?;
        if !first.is_ascii_digit() {
            return Err(MetainfoError::InvalidByte {
                offset: start,
                byte: first,
            });
        }
        let colon = self.find(b':')?;
        let prefix = &self.input[start..colon];
        let invalid = MetainfoError::InvalidLength { offset: start };
        if !prefix.iter().all(u8::is_ascii_digit) || (prefix.len() > 1 && prefix[0] == b'0') {
            return Err(invalid);
        }
        let length = std::str::from_utf8(prefix)
            .ok()
            .and_then(|text| text.parse::<usize>().ok())
            .ok_or(invalid)?;
        let body_start = colon + 1;
        let body_end = body_start
            .checked_add(length)
            .filter(|end| *end <= self.input.len())
            .ok_or(MetainfoError::UnexpectedEof {
                offset: self.input.len(),
            })?;
        self.pos = body_end;
        Ok(self.input[body_start..body_end].to_vec())
    }
}
