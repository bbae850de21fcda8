//! `webparts-core` - personalization data model and binary state codec for WebParts pages.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Versioned binary codec for personalization records.
pub mod codec;
/// Provider and consumer connection point descriptors.
pub mod connection_point;
/// Scope-tagged personalization entries.
pub mod entry;
/// Codec and part errors.
pub mod error;
/// Part capability traits.
pub mod part;
/// Per-identifier personalization records.
pub mod record;
/// Personalization scope.
pub mod scope;
/// Typed property values.
pub mod value;

pub use codec::{decode_state, encode_state, FormatVersion, TokenWriter};
pub use connection_point::{
    ConnectionPoint, ConnectionPointKind, ConnectionPointSet, InterfaceType,
};
pub use entry::{PersonalizationDictionary, PersonalizationEntry};
pub use error::{CodecError, DecodeError, PartError};
pub use part::{
    LoadContext, Part, PartType, Personalizable, PropertyDescriptor, TrackingPersonalizable,
    VersioningPersonalizable, TEMPLATED_CONTROL_TYPE,
};
pub use record::{PersonalizationMap, PersonalizationRecord};
pub use scope::PersonalizationScope;
pub use value::{CompositeValue, EnumValue, PropertyMap, PropertyValue};
