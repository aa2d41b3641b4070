//! Legacy 8-bit code page text conversion.
//!
//! Script text crossing the VM boundary is not Unicode: it is a fixed
//! single-byte code page chosen per deployment. Conversion is strict in
//! both directions: a sequence the code page cannot represent is an
//! error, never a replacement character.

use std::borrow::Cow;

use encoding_rs::{Encoding as RsEncoding, IBM866, WINDOWS_1251, WINDOWS_1252};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Western European. The usual default for legacy game servers.
    Cp1252,
    /// Cyrillic.
    Cp1251,
    /// DOS Cyrillic, still seen in older server communities.
    Cp866,
}

impl Encoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::Cp1252 => WINDOWS_1252,
            Encoding::Cp1251 => WINDOWS_1251,
            Encoding::Cp866 => IBM866,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("byte sequence is not valid {0:?}")]
    Decode(Encoding),

    #[error("text is not representable in {0:?}")]
    Encode(Encoding),
}

/// Encoder/decoder bound to one code page.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    enc: Encoding,
}

impl Codec {
    #[inline]
    pub fn new(enc: Encoding) -> Self {
        Self { enc }
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.enc
    }

    /// Encode host text into code-page bytes. No terminator is appended.
    pub fn encode<'a>(&self, s: &'a str) -> Result<Cow<'a, [u8]>, CodecError> {
        let (bytes, _, had_errors) = self.enc.as_encoding_rs().encode(s);
        if had_errors {
            return Err(CodecError::Encode(self.enc));
        }
        Ok(bytes)
    }

    /// Decode code-page bytes into host text.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>, CodecError> {
        let (text, had_errors) = self
            .enc
            .as_encoding_rs()
            .decode_without_bom_handling(bytes);
        if had_errors {
            return Err(CodecError::Decode(self.enc));
        }
        Ok(text)
    }

    /// Decode a C-style string: stop at the first NUL (0x00).
    pub fn decode_cstr<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>, CodecError> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        self.decode(&bytes[..end])
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Encoding::Cp1252)
    }
}
