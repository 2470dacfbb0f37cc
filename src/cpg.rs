//! Text-encoding hint (.cpg) resolver.
//!
//! The .cpg sibling holds a single ASCII token naming the code page used by
//! the attribute table. Tokens map to static `encoding_rs` encodings; an
//! unrecognized token is a constructor-time parse failure, since decoding
//! attribute text with a guessed encoding would corrupt it silently.

use crate::common::error::{Error, Result};
use encoding_rs::Encoding;
use std::io::Read;

/// File extension of the encoding hint.
pub const PATH_EXTENSION: &str = "cpg";

/// Recognized code-page tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePage {
    IsoLatin2,
    ShiftJis,
    Windows1250,
    Windows1251,
    Windows1252,
    Windows1253,
    Windows1254,
    Utf8,
    Utf16,
}

impl CodePage {
    /// Map an on-disk token to a variant.
    pub fn from_token(token: &str) -> Option<CodePage> {
        match token {
            "latin2" => Some(CodePage::IsoLatin2),
            "shiftjis" => Some(CodePage::ShiftJis),
            "1250" => Some(CodePage::Windows1250),
            "1251" => Some(CodePage::Windows1251),
            "1252" => Some(CodePage::Windows1252),
            "1253" => Some(CodePage::Windows1253),
            "1254" => Some(CodePage::Windows1254),
            "UTF-8" => Some(CodePage::Utf8),
            "UTF-16" => Some(CodePage::Utf16),
            _ => None,
        }
    }

    /// The `encoding_rs` encoding for this code page.
    pub fn encoding(&self) -> &'static Encoding {
        match self {
            CodePage::IsoLatin2 => encoding_rs::ISO_8859_2,
            CodePage::ShiftJis => encoding_rs::SHIFT_JIS,
            CodePage::Windows1250 => encoding_rs::WINDOWS_1250,
            CodePage::Windows1251 => encoding_rs::WINDOWS_1251,
            CodePage::Windows1252 => encoding_rs::WINDOWS_1252,
            CodePage::Windows1253 => encoding_rs::WINDOWS_1253,
            CodePage::Windows1254 => encoding_rs::WINDOWS_1254,
            CodePage::Utf8 => encoding_rs::UTF_8,
            CodePage::Utf16 => encoding_rs::UTF_16LE,
        }
    }
}

/// Reader for the single-token encoding hint file.
pub struct CpgFile;

impl CpgFile {
    /// Read the token and resolve it to an encoding.
    ///
    /// Surrounding ASCII whitespace (typically a trailing newline) is
    /// tolerated; the token match itself is exact.
    pub fn open<R: Read>(mut reader: R) -> Result<&'static Encoding> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if !bytes.is_ascii() {
            return Err(Error::parse("cpg file is not ASCII"));
        }
        let text = String::from_utf8_lossy(&bytes);
        let token = text.trim_matches(|c: char| c.is_ascii_whitespace());

        CodePage::from_token(token)
            .map(|page| page.encoding())
            .ok_or_else(|| Error::parse(format!("Unrecognized code page token {token:?}")))
    }
}
