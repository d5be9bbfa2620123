use anyhow::{anyhow, Result};
use encoding_rs::Encoding;
use std::{fmt, str::FromStr};
use tracing::warn;

/// Text encoding of an export file.
///
/// Exports come either as UTF-8 or in a Central European code page, and the bytes
/// alone do not always tell which, so this is always configured explicitly.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SourceEncoding(&'static Encoding);

impl SourceEncoding {
    pub fn utf8() -> Self {
        SourceEncoding(encoding_rs::UTF_8)
    }

    pub fn windows_1250() -> Self {
        SourceEncoding(encoding_rs::WINDOWS_1250)
    }

    /// Resolve a WHATWG label such as `utf-8`, `cp1250` or `iso-8859-2`.
    pub fn from_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(SourceEncoding)
            .ok_or_else(|| anyhow!("unknown text encoding label {:?}", label))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Decode `bytes`, dropping a leading BOM for this encoding.
    /// Malformed sequences become U+FFFD and are reported, not fatal.
    pub fn decode(&self, bytes: &[u8], file_name: &str) -> String {
        let (text, had_errors) = self.0.decode_with_bom_removal(bytes);
        if had_errors {
            warn!(
                file = %file_name,
                encoding = self.name(),
                "malformed byte sequences replaced while decoding"
            );
        }
        text.into_owned()
    }
}

impl FromStr for SourceEncoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_label(s)
    }
}

impl fmt::Debug for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceEncoding({})", self.name())
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve() -> Result<()> {
        assert_eq!(SourceEncoding::from_label("utf-8")?, SourceEncoding::utf8());
        assert_eq!(SourceEncoding::from_label("cp1250")?, SourceEncoding::windows_1250());
        assert_eq!(SourceEncoding::from_label(" Windows-1250 ")?.name(), "windows-1250");
        assert_eq!(SourceEncoding::from_label("iso-8859-2")?.name(), "ISO-8859-2");
        assert!(SourceEncoding::from_label("klingon").is_err());
        Ok(())
    }

    #[test]
    fn windows_1250_decodes_czech_letters() {
        // "Zkouška" in cp1250: š = 0x9A
        let bytes = b"Zkou\x9Aka;1";
        let text = SourceEncoding::windows_1250().decode(bytes, "t.csv");
        assert_eq!(text, "Zkouška;1");
    }

    #[test]
    fn utf8_bom_is_removed() {
        let bytes = b"\xEF\xBB\xBFa;b";
        assert_eq!(SourceEncoding::utf8().decode(bytes, "t.csv"), "a;b");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let bytes = b"a\x9Ab";
        assert_eq!(SourceEncoding::utf8().decode(bytes, "t.csv"), "a\u{FFFD}b");
    }
}
