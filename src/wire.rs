//! CBOR wire codec for update notifications.
//!
//! The envelope is a definite-length map with stable integer field tags:
//! 0 version, 1 origin, 2 updates, 3 etag. Entries travel as embedded
//! canonical JSON byte strings, so the envelope stays agnostic of the
//! application's entry type.

use std::convert::Infallible;

use minicbor::data::Type;
use minicbor::{Decoder, Encoder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::core::{ClusterId, Etag, UpdateNotification, Version};
use crate::limits::Limits;

const TAG_VERSION: u32 = 0;
const TAG_ORIGIN: u32 = 1;
const TAG_UPDATES: u32 = 2;
const TAG_ETAG: u32 = 3;

#[derive(Debug, Error)]
pub enum WireEncodeError {
    #[error("cbor encode: {0}")]
    Cbor(#[from] minicbor::encode::Error<Infallible>),
    #[error("entry encode: {0}")]
    Entry(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum WireDecodeError {
    #[error("indefinite-length CBOR not allowed")]
    IndefiniteLength,
    #[error("missing required field tag {0}")]
    MissingField(u32),
    #[error("unknown field tag {0}")]
    UnknownField(u32),
    #[error("invalid field tag {field}: {reason}")]
    InvalidField { field: u32, reason: String },
    #[error("trailing bytes after message body")]
    TrailingBytes,
    #[error("too many updates: {got}/{max}")]
    TooManyUpdates { got: u64, max: usize },
    #[error("cbor decode: {0}")]
    Cbor(#[from] minicbor::decode::Error),
}

pub fn encode_notification<E: Serialize>(
    notification: &UpdateNotification<E>,
) -> Result<Vec<u8>, WireEncodeError> {
    let mut encoder = Encoder::new(Vec::new());
    encoder.map(4)?;
    encoder.u32(TAG_VERSION)?.u64(notification.version.get())?;
    encoder.u32(TAG_ORIGIN)?.str(notification.origin.as_str())?;
    encoder
        .u32(TAG_UPDATES)?
        .array(notification.updates.len() as u64)?;
    for entry in &notification.updates {
        let bytes = serde_json::to_vec(entry)?;
        encoder.bytes(&bytes)?;
    }
    encoder.u32(TAG_ETAG)?;
    match &notification.etag {
        Some(etag) => {
            encoder.str(etag.as_str())?;
        }
        None => {
            encoder.null()?;
        }
    }
    Ok(encoder.into_writer())
}

pub fn decode_notification<E: DeserializeOwned>(
    bytes: &[u8],
    limits: &Limits,
) -> Result<UpdateNotification<E>, WireDecodeError> {
    let mut decoder = Decoder::new(bytes);
    let fields = decoder.map()?.ok_or(WireDecodeError::IndefiniteLength)?;

    let mut version = None;
    let mut origin = None;
    let mut updates = None;
    let mut etag = None;

    for _ in 0..fields {
        let tag = decoder.u32()?;
        match tag {
            TAG_VERSION => {
                version = Some(Version::new(decoder.u64()?));
            }
            TAG_ORIGIN => {
                let raw = decoder.str()?;
                let parsed =
                    ClusterId::new(raw).map_err(|err| WireDecodeError::InvalidField {
                        field: TAG_ORIGIN,
                        reason: err.to_string(),
                    })?;
                origin = Some(parsed);
            }
            TAG_UPDATES => {
                let count = decoder.array()?.ok_or(WireDecodeError::IndefiniteLength)?;
                if count > limits.max_merged_updates as u64 {
                    return Err(WireDecodeError::TooManyUpdates {
                        got: count,
                        max: limits.max_merged_updates,
                    });
                }
                let mut decoded = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let raw = decoder.bytes()?;
                    let entry =
                        serde_json::from_slice(raw).map_err(|err| {
                            WireDecodeError::InvalidField {
                                field: TAG_UPDATES,
                                reason: err.to_string(),
                            }
                        })?;
                    decoded.push(entry);
                }
                updates = Some(decoded);
            }
            TAG_ETAG => {
                if decoder.datatype()? == Type::Null {
                    decoder.null()?;
                    etag = Some(None);
                } else {
                    etag = Some(Some(Etag::new(decoder.str()?)));
                }
            }
            other => return Err(WireDecodeError::UnknownField(other)),
        }
    }

    if decoder.position() != bytes.len() {
        return Err(WireDecodeError::TrailingBytes);
    }

    let version = version.ok_or(WireDecodeError::MissingField(TAG_VERSION))?;
    let origin = origin.ok_or(WireDecodeError::MissingField(TAG_ORIGIN))?;
    let updates = updates.ok_or(WireDecodeError::MissingField(TAG_UPDATES))?;
    let etag = etag.ok_or(WireDecodeError::MissingField(TAG_ETAG))?;

    let notification = UpdateNotification {
        version,
        origin,
        updates,
        etag,
    };
    if notification.version.get() < notification.updates.len() as u64 {
        return Err(WireDecodeError::InvalidField {
            field: TAG_VERSION,
            reason: format!(
                "version {} below update count {}",
                notification.version,
                notification.updates.len(),
            ),
        });
    }
    Ok(notification)
}
