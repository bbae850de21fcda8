//! Token layer of the state format.

#![allow(missing_docs)]

use indexmap::IndexSet;
use smol_str::SmolStr;

use crate::error::DecodeError;
use crate::value::{CompositeValue, EnumValue, PropertyValue};

/// Leading bytes of every encoded blob.
pub(crate) const STATE_MARKER: [u8; 2] = [0xFF, 0x01];

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy)]
enum TokenTag {
    Null = 0x01,
    True = 0x02,
    False = 0x03,
    Int = 0x04,
    Long = 0x05,
    Double = 0x06,
    String = 0x07,
    Enum = 0x08,
    List = 0x09,
    Composite = 0x0A,
    Type = 0x10,
    IndexedStringAdd = 0x11,
    IndexedStringRef = 0x12,
}

/// A decoded top-level token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Value(PropertyValue),
    /// A stored part type name.
    Type(SmolStr),
    /// An interned string, already resolved against the string table.
    Name(SmolStr),
}

impl Token {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Value(value) => value.kind(),
            Self::Type(_) => "type",
            Self::Name(_) => "indexed string",
        }
    }
}

/// Writes a token stream.
///
/// Public so tests and migration tools can hand-build blobs in older
/// layouts.
#[derive(Debug, Default)]
pub struct TokenWriter {
    out: Vec<u8>,
    count: u32,
    names: IndexSet<SmolStr>,
}

impl TokenWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&mut self, value: &PropertyValue) -> &mut Self {
        encode_value(&mut self.out, value);
        self.count += 1;
        self
    }

    pub fn int(&mut self, value: i32) -> &mut Self {
        self.value(&PropertyValue::Int(value))
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.value(&PropertyValue::Bool(value))
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.out.push(TokenTag::String as u8);
        encode_str(&mut self.out, value);
        self.count += 1;
        self
    }

    pub fn type_name(&mut self, name: &str) -> &mut Self {
        self.out.push(TokenTag::Type as u8);
        encode_str(&mut self.out, name);
        self.count += 1;
        self
    }

    /// Interned name; the first occurrence carries the text, later ones an index.
    pub fn name(&mut self, name: &str) -> &mut Self {
        if let Some(index) = self.names.get_index_of(name) {
            self.out.push(TokenTag::IndexedStringRef as u8);
            self.out.extend_from_slice(&(index as u32).to_le_bytes());
        } else {
            self.names.insert(SmolStr::new(name));
            self.out.push(TokenTag::IndexedStringAdd as u8);
            encode_str(&mut self.out, name);
        }
        self.count += 1;
        self
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.out.len() + 6);
        bytes.extend_from_slice(&STATE_MARKER);
        bytes.extend_from_slice(&self.count.to_le_bytes());
        bytes.extend_from_slice(&self.out);
        bytes
    }
}

fn encode_str(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

fn encode_value(out: &mut Vec<u8>, value: &PropertyValue) {
    match value {
        PropertyValue::Null => out.push(TokenTag::Null as u8),
        PropertyValue::Bool(true) => out.push(TokenTag::True as u8),
        PropertyValue::Bool(false) => out.push(TokenTag::False as u8),
        PropertyValue::Int(v) => {
            out.push(TokenTag::Int as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        PropertyValue::Long(v) => {
            out.push(TokenTag::Long as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        PropertyValue::Double(v) => {
            out.push(TokenTag::Double as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        PropertyValue::String(v) => {
            out.push(TokenTag::String as u8);
            encode_str(out, v);
        }
        PropertyValue::Enum(v) => {
            out.push(TokenTag::Enum as u8);
            encode_str(out, &v.type_name);
            encode_str(out, &v.variant);
            out.extend_from_slice(&v.numeric.to_le_bytes());
        }
        PropertyValue::List(items) => {
            out.push(TokenTag::List as u8);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                encode_value(out, item);
            }
        }
        PropertyValue::Composite(v) => {
            out.push(TokenTag::Composite as u8);
            encode_str(out, &v.type_name);
            out.extend_from_slice(&(v.fields.len() as u32).to_le_bytes());
            for (name, field) in &v.fields {
                encode_str(out, name);
                encode_value(out, field);
            }
        }
    }
}

/// Splits a blob into its top-level tokens.
pub(crate) fn read_tokens(bytes: &[u8]) -> Result<Vec<Token>, DecodeError> {
    let mut reader = TokenReader::new(bytes);
    if reader.read_bytes(2)? != STATE_MARKER {
        return Err(DecodeError::BadMarker);
    }
    let count = reader.read_u32()? as usize;
    let mut tokens = Vec::with_capacity(count.min(reader.remaining()));
    let mut names: Vec<SmolStr> = Vec::new();
    for _ in 0..count {
        tokens.push(reader.read_token(&mut names)?);
    }
    if reader.remaining() > 0 {
        return Err(DecodeError::TrailingBytes(reader.remaining()));
    }
    Ok(tokens)
}

struct TokenReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> TokenReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.offset,
            });
        }
        let start = self.offset;
        self.offset += len;
        Ok(&self.data[start..self.offset])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let offset = self.offset;
        self.read_bytes(N)?
            .try_into()
            .map_err(|_| DecodeError::Truncated { offset })
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    fn read_string(&mut self) -> Result<SmolStr, DecodeError> {
        let len = self.read_u32()? as usize;
        let offset = self.offset;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(SmolStr::new)
            .map_err(|_| DecodeError::InvalidUtf8 { offset })
    }

    fn read_token(&mut self, names: &mut Vec<SmolStr>) -> Result<Token, DecodeError> {
        let offset = self.offset;
        let tag = self.read_u8()?;
        let token = match tag {
            x if x == TokenTag::Type as u8 => Token::Type(self.read_string()?),
            x if x == TokenTag::IndexedStringAdd as u8 => {
                let name = self.read_string()?;
                names.push(name.clone());
                Token::Name(name)
            }
            x if x == TokenTag::IndexedStringRef as u8 => {
                let index = self.read_u32()?;
                let name = names
                    .get(index as usize)
                    .cloned()
                    .ok_or(DecodeError::UnknownStringIndex(index))?;
                Token::Name(name)
            }
            _ => {
                self.offset = offset;
                Token::Value(self.read_value(0)?)
            }
        };
        Ok(token)
    }

    fn read_value(&mut self, depth: usize) -> Result<PropertyValue, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH));
        }
        let offset = self.offset;
        let tag = self.read_u8()?;
        let value = match tag {
            x if x == TokenTag::Null as u8 => PropertyValue::Null,
            x if x == TokenTag::True as u8 => PropertyValue::Bool(true),
            x if x == TokenTag::False as u8 => PropertyValue::Bool(false),
            x if x == TokenTag::Int as u8 => PropertyValue::Int(self.read_i32()?),
            x if x == TokenTag::Long as u8 => PropertyValue::Long(self.read_i64()?),
            x if x == TokenTag::Double as u8 => PropertyValue::Double(self.read_f64()?),
            x if x == TokenTag::String as u8 => PropertyValue::String(self.read_string()?),
            x if x == TokenTag::Enum as u8 => {
                let type_name = self.read_string()?;
                let variant = self.read_string()?;
                let numeric = self.read_i64()?;
                PropertyValue::Enum(EnumValue {
                    type_name,
                    variant,
                    numeric,
                })
            }
            x if x == TokenTag::List as u8 => {
                let len = self.read_u32()? as usize;
                let mut items = Vec::with_capacity(len.min(self.remaining()));
                for _ in 0..len {
                    items.push(self.read_value(depth + 1)?);
                }
                PropertyValue::List(items)
            }
            x if x == TokenTag::Composite as u8 => {
                let mut composite = CompositeValue::new(self.read_string()?);
                let len = self.read_u32()? as usize;
                for _ in 0..len {
                    let name = self.read_string()?;
                    let field = self.read_value(depth + 1)?;
                    composite.fields.insert(name, field);
                }
                PropertyValue::Composite(composite)
            }
            _ => return Err(DecodeError::UnknownTag { tag, offset }),
        };
        Ok(value)
    }
}
