//! Personalization, connection and manager errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;
use webparts_core::{CodecError, PartError};

use crate::manager::DisplayMode;

/// Errors raised by the personalization engine and the page manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebPartsError {
    /// Apply was called before the shared state was loaded.
    #[error("personalization state has not been loaded")]
    NotLoaded,

    /// Extract was called before any part was personalized.
    #[error("personalization has not been applied")]
    NotApplied,

    /// The same identifier was personalized twice in one page lifecycle.
    #[error("personalization has already been applied to '{0}'")]
    AlreadyApplied(SmolStr),

    /// Extract was called for an identifier that was never applied.
    #[error("cannot extract personalization for '{0}': it was not applied in this request")]
    CannotExtract(SmolStr),

    #[error("personalization is not enabled")]
    PersonalizationDisabled,

    #[error("personalization cannot be modified in {0} scope")]
    NotModifiable(webparts_core::PersonalizationScope),

    /// Persisted state could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("part '{part}': {source}")]
    Part {
        part: SmolStr,
        #[source]
        source: PartError,
    },

    #[error("{operation} is not allowed after {phase}")]
    TooLate {
        operation: &'static str,
        phase: &'static str,
    },

    #[error("{operation} is not allowed before {phase}")]
    TooEarly {
        operation: &'static str,
        phase: &'static str,
    },

    #[error("unknown zone '{0}'")]
    UnknownZone(SmolStr),

    #[error("zone '{0}' is already registered")]
    DuplicateZone(SmolStr),

    #[error("zone '{0}' does not host web parts")]
    NotAWebPartZone(SmolStr),

    #[error("unknown web part '{0}'")]
    UnknownPart(SmolStr),

    #[error("web part id '{0}' is already in use")]
    DuplicatePart(SmolStr),

    #[error("web part '{0}' is already in a zone")]
    AlreadyInZone(SmolStr),

    #[error("web part '{0}' is already closed")]
    AlreadyClosed(SmolStr),

    #[error("web part '{0}' is closed")]
    PartClosed(SmolStr),

    #[error("static web part '{0}' cannot be deleted")]
    CantDeleteStatic(SmolStr),

    #[error("shared web part '{0}' cannot be deleted in user scope")]
    CantDeleteSharedInUserScope(SmolStr),

    #[error("no part type available for '{0}'")]
    UnknownPartType(SmolStr),

    #[error("web part type '{0}' is not authorized on this page")]
    Unauthorized(SmolStr),

    #[error("connection has no id")]
    MissingConnectionId,

    #[error("duplicate connection id '{0}'")]
    DuplicateConnectionId(SmolStr),

    #[error("unknown connection '{0}'")]
    UnknownConnection(SmolStr),

    #[error("connection '{connection}' references missing provider '{provider}'")]
    MissingProvider {
        connection: SmolStr,
        provider: SmolStr,
    },

    #[error("connection '{connection}' references missing consumer '{consumer}'")]
    MissingConsumer {
        connection: SmolStr,
        consumer: SmolStr,
    },

    #[error("web part '{0}' cannot be connected to itself")]
    ConnectToSelf(SmolStr),

    #[error("connection point '{point}' does not belong to web part '{part}'")]
    InvalidConnectionPoint { part: SmolStr, point: SmolStr },

    #[error("connection point '{point}' on '{part}' is disabled")]
    DisabledConnectionPoint { part: SmolStr, point: SmolStr },

    #[error("connection point '{point}' on '{part}' does not allow more connections")]
    DuplicateConnection { part: SmolStr, point: SmolStr },

    #[error("provider interface '{provider}' does not match consumer interface '{consumer}'")]
    NoCommonInterface { provider: SmolStr, consumer: SmolStr },

    #[error("consumer point '{point}' on '{part}' does not support the provider's secondary interfaces")]
    IncompatibleSecondaryInterfaces { part: SmolStr, point: SmolStr },

    #[error("transformer '{0}' is not available")]
    TransformerNotAvailable(SmolStr),

    #[error("transformer '{transformer}' does not accept provider interface '{interface}'")]
    IncompatibleProviderTransformer {
        transformer: SmolStr,
        interface: SmolStr,
    },

    #[error("transformer '{transformer}' does not produce consumer interface '{interface}'")]
    IncompatibleConsumerTransformer {
        transformer: SmolStr,
        interface: SmolStr,
    },

    #[error("consumer point '{point}' on '{part}' requires secondary interfaces a transformer cannot provide")]
    ConsumerRequiresSecondaryInterfaces { part: SmolStr, point: SmolStr },

    #[error("{0} connections are read-only")]
    ConnectionsReadOnly(&'static str),

    #[error("connection '{0}' is already disconnected")]
    AlreadyDisconnected(SmolStr),

    #[error("display mode '{0}' is not supported by this page")]
    UnsupportedDisplayMode(DisplayMode),

    #[error("display mode '{0}' is not enabled")]
    DisabledDisplayMode(DisplayMode),

    #[error("operation requires display mode '{0}'")]
    WrongDisplayMode(DisplayMode),

    #[error("no web part is selected")]
    NoSelectedPart,

    #[error("personalization store: {0}")]
    Store(SmolStr),

    #[error("invalid config: {0}")]
    InvalidConfig(SmolStr),
}
