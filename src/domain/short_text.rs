use unicode_segmentation::UnicodeSegmentation;

const MAX_LENGTH: usize = 255;

/// Non-blank text capped at 255 characters (medication names, dosages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortText(String);

impl ShortText {
    /// `s` is expected to be trimmed and non-blank already.
    pub fn parse(s: String) -> Result<ShortText, String> {
        if s.trim().is_empty() {
            return Err(crate::domain::BLANK.to_string());
        }
        // A grapheme is defined by the Unicode standard as a "user-perceived"
        // character: `å` is a single grapheme, but it is composed of two characters
        if s.graphemes(true).count() > MAX_LENGTH {
            return Err(format!(
                "Ensure this field has no more than {} characters.",
                MAX_LENGTH
            ));
        }
        Ok(Self(s))
    }
}

impl AsRef<str> for ShortText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
