//! Errors raised while encoding or decoding entity bodies.

/// Errors that can occur while an entity writes itself into a [`crate::SaveBuffer`].
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Failed to encode a value to MessagePack.
    #[error("failed to encode value: {0}")]
    MessagePack(#[from] rmp_serde::encode::Error),

    /// The entity refused to serialise itself.
    #[error("{0}")]
    Custom(String),
}

/// Errors that can occur while an entity reads itself from a [`crate::BufferReader`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body ended before a read completed.
    #[error("unexpected end of body: needed {needed} bytes at offset {position}, {remaining} left")]
    UnexpectedEof {
        needed: usize,
        position: usize,
        remaining: usize,
    },

    /// A length-prefixed string did not hold valid UTF-8.
    #[error("invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),

    /// A 7-bit encoded integer ran past five bytes.
    #[error("malformed encoded integer at offset {0}")]
    BadEncodedInt(usize),

    /// Failed to decode a value from MessagePack.
    #[error("failed to decode value: {0}")]
    MessagePack(#[from] rmp_serde::decode::Error),

    /// The body was read but its content was not acceptable.
    #[error("{0}")]
    Invalid(String),
}
