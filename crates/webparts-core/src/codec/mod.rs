//! Versioned binary codec for personalization records.
//!
//! A blob is a marker, a token count and a flat token stream:
//!
//! ```text
//! version, record count,
//! per record:
//!   Type(name) [virtual path if templated] control id   (static part)
//!   | control id                                         (dynamic part)
//!   property count, (indexed name, value)*
//!   custom count, (indexed name, value, is shared, is sensitive)*
//! ```
//!
//! Version 1 custom entries carry no sensitivity flag. The walk is strictly
//! positional; any mismatch fails the whole blob.

mod cursor;
mod token;

use tracing::debug;

use crate::entry::{PersonalizationDictionary, PersonalizationEntry};
use crate::error::{CodecError, DecodeError};
use crate::part::{PartType, TEMPLATED_CONTROL_TYPE};
use crate::record::{PersonalizationMap, PersonalizationRecord};
use crate::scope::PersonalizationScope;
use crate::value::{PropertyMap, PropertyValue};

use cursor::TokenCursor;
use token::{read_tokens, Token};

pub use token::TokenWriter;

/// Layout versions of the state blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    /// Custom entries without the sensitivity flag.
    Beta2 = 1,
    /// Custom entries carry a sensitivity flag.
    Rtm = 2,
}

impl FormatVersion {
    /// Version every encoder writes.
    pub const CURRENT: FormatVersion = FormatVersion::Rtm;

    /// Maps the leading version token, `None` if unknown.
    #[must_use]
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Beta2),
            2 => Some(Self::Rtm),
            _ => None,
        }
    }

    fn has_sensitivity_flag(self) -> bool {
        matches!(self, Self::Rtm)
    }
}

/// Encodes `records` in the current format.
///
/// Records without any data are skipped. Returns `None` when nothing is
/// left to store so callers can tell "no data" apart from an empty blob.
#[must_use]
pub fn encode_state(records: &PersonalizationMap) -> Option<Vec<u8>> {
    let surviving: Vec<&PersonalizationRecord> =
        records.values().filter(|record| !record.is_empty()).collect();
    if surviving.is_empty() {
        return None;
    }
    let mut writer = TokenWriter::new();
    writer.int(FormatVersion::CURRENT as i32);
    writer.int(surviving.len() as i32);
    for record in surviving {
        write_record(&mut writer, record);
    }
    Some(writer.finish())
}

fn write_record(writer: &mut TokenWriter, record: &PersonalizationRecord) {
    match &record.declared_type {
        Some(part_type) => {
            writer.type_name(part_type.name());
            if part_type.is_templated() {
                writer.string(part_type.virtual_path().unwrap_or_default());
            }
            writer.string(&record.control_id);
        }
        None => {
            writer.string(&record.control_id);
        }
    }

    let properties = record.properties.as_ref().filter(|map| !map.is_empty());
    writer.int(properties.map_or(0, |map| map.len() as i32));
    for (name, value) in properties.into_iter().flatten() {
        writer.name(name).value(value);
    }

    let custom = record.custom_properties.as_ref().filter(|dict| !dict.is_empty());
    writer.int(custom.map_or(0, |dict| dict.len() as i32));
    for (name, entry) in custom.into_iter().flatten() {
        writer
            .name(name)
            .value(&entry.value)
            .bool(entry.scope.is_shared())
            .bool(entry.is_sensitive);
    }
}

/// Decodes a blob produced by [`encode_state`] or by an older writer.
///
/// Empty input yields an empty map.
pub fn decode_state(bytes: &[u8]) -> Result<PersonalizationMap, CodecError> {
    if bytes.is_empty() {
        return Ok(PersonalizationMap::new());
    }
    decode_records(bytes).map_err(|err| {
        debug!(error = %err, len = bytes.len(), "rejecting personalization blob");
        CodecError::Malformed(err)
    })
}

fn decode_records(bytes: &[u8]) -> Result<PersonalizationMap, DecodeError> {
    let mut cursor = TokenCursor::new(read_tokens(bytes)?);
    let raw_version = cursor.int("format version")?;
    let version =
        FormatVersion::from_i32(raw_version).ok_or(DecodeError::UnsupportedVersion(raw_version))?;
    let count = cursor.count("record")?;
    let mut records = PersonalizationMap::with_capacity(count.min(cursor.remaining()));
    for _ in 0..count {
        let record = read_record(&mut cursor, version)?;
        records.insert(record.control_id.clone(), record);
    }
    if cursor.remaining() > 0 {
        return Err(DecodeError::TrailingTokens(cursor.remaining()));
    }
    Ok(records)
}

fn read_record(
    cursor: &mut TokenCursor,
    version: FormatVersion,
) -> Result<PersonalizationRecord, DecodeError> {
    let mut record = match cursor.next("part type or identifier")? {
        Token::Type(name) => {
            let part_type = if name == TEMPLATED_CONTROL_TYPE {
                PartType::templated(cursor.string("virtual path")?)
            } else {
                PartType::new(name)
            };
            PersonalizationRecord::for_static(cursor.string("control id")?, part_type)
        }
        Token::Value(PropertyValue::String(id)) => PersonalizationRecord::new(id),
        other => return Err(cursor.unexpected("part type or identifier", &other)),
    };

    let property_count = cursor.count("property")?;
    if property_count > 0 {
        let mut properties = PropertyMap::with_capacity(property_count.min(cursor.remaining()));
        for _ in 0..property_count {
            let name = cursor.name("property name")?;
            let value = cursor.value("property value")?;
            properties.insert(name, value);
        }
        record.properties = Some(properties);
    }

    let custom_count = cursor.count("custom property")?;
    if custom_count > 0 {
        let mut custom = PersonalizationDictionary::new();
        for _ in 0..custom_count {
            let name = cursor.name("custom property name")?;
            let value = cursor.value("custom property value")?;
            let scope = if cursor.bool("custom property scope")? {
                PersonalizationScope::Shared
            } else {
                PersonalizationScope::User
            };
            let is_sensitive = if version.has_sensitivity_flag() {
                cursor.bool("custom property sensitivity")?
            } else {
                false
            };
            custom.insert(
                name,
                PersonalizationEntry {
                    value,
                    scope,
                    is_sensitive,
                },
            );
        }
        record.custom_properties = Some(custom);
    }

    Ok(record)
}
