//! Validated domain primitives for the SNCOP storage backend.
//!
//! The storage catalog keys everything by free-text subject and unit names,
//! so the few places where structure *does* exist are encoded as types here:
//! the three resource categories a subject can hold ([`ResourceKind`]), the
//! coarse file classification used by the browser client ([`FileKind`]), and
//! a trimmed, guaranteed non-empty string ([`NonEmptyText`]).

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A trimmed string guaranteed to contain at least one non-whitespace character.
///
/// Leading and trailing whitespace is removed during construction; an input
/// that trims to nothing is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, trimming the input first.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Error returned when a resource-type string is not one of the known kinds.
#[derive(Debug, thiserror::Error)]
#[error("invalid resource type: {0}")]
pub struct ResourceKindError(pub String);

/// The three resource categories a subject directory can hold.
///
/// The string forms are directory-name literals on disk and wire values in
/// the HTTP API, so they are spelled exactly as stored: `notes`,
/// `practice-tests`, `practicals`. Notes are the only kind subdivided into
/// units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "notes")]
    Notes,
    #[serde(rename = "practice-tests")]
    PracticeTests,
    #[serde(rename = "practicals")]
    Practicals,
}

impl ResourceKind {
    /// All kinds, in the order subject directories are provisioned.
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Notes,
        ResourceKind::PracticeTests,
        ResourceKind::Practicals,
    ];

    /// The directory-name literal for this kind.
    pub fn dir_name(self) -> &'static str {
        match self {
            ResourceKind::Notes => "notes",
            ResourceKind::PracticeTests => "practice-tests",
            ResourceKind::Practicals => "practicals",
        }
    }

    /// Whether files of this kind live inside per-unit subdirectories.
    pub fn has_units(self) -> bool {
        matches!(self, ResourceKind::Notes)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = ResourceKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notes" => Ok(ResourceKind::Notes),
            "practice-tests" => Ok(ResourceKind::PracticeTests),
            "practicals" => Ok(ResourceKind::Practicals),
            other => Err(ResourceKindError(other.to_owned())),
        }
    }
}

/// Coarse classification of a stored file, derived from its extension.
///
/// The browser client only distinguishes PDFs (rendered in the PDF viewer)
/// from images (rendered inline); everything that is not a PDF is treated as
/// an image, matching the upload filter which admits only PDFs and images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FileKind {
    #[serde(rename = "pdf")]
    Pdf,
    #[serde(rename = "image")]
    Image,
}

impl FileKind {
    /// Classifies a filename by its extension.
    pub fn from_file_name(name: &str) -> Self {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ext.contains("pdf") {
            FileKind::Pdf
        } else {
            FileKind::Image
        }
    }

    /// The wire literal for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Image => "image",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Pharmacology  ").unwrap();
        assert_eq!(text.as_str(), "Pharmacology");
    }

    #[test]
    fn non_empty_text_rejects_whitespace_only() {
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
        assert!(matches!(NonEmptyText::new(""), Err(TextError::Empty)));
    }

    #[test]
    fn resource_kind_round_trips_through_strings() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_str(kind.dir_name()).unwrap(), kind);
        }
    }

    #[test]
    fn resource_kind_rejects_unknown_strings() {
        let err = ResourceKind::from_str("lectures").unwrap_err();
        assert_eq!(err.0, "lectures");
    }

    #[test]
    fn resource_kind_serde_uses_directory_literals() {
        let json = serde_json::to_string(&ResourceKind::PracticeTests).unwrap();
        assert_eq!(json, "\"practice-tests\"");
        let back: ResourceKind = serde_json::from_str("\"notes\"").unwrap();
        assert_eq!(back, ResourceKind::Notes);
    }

    #[test]
    fn only_notes_have_units() {
        assert!(ResourceKind::Notes.has_units());
        assert!(!ResourceKind::PracticeTests.has_units());
        assert!(!ResourceKind::Practicals.has_units());
    }

    #[test]
    fn file_kind_classifies_by_extension() {
        assert_eq!(FileKind::from_file_name("intro.pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_file_name("intro.PDF"), FileKind::Pdf);
        assert_eq!(FileKind::from_file_name("diagram.png"), FileKind::Image);
        assert_eq!(FileKind::from_file_name("scan.jpeg"), FileKind::Image);
        assert_eq!(FileKind::from_file_name("no-extension"), FileKind::Image);
    }
}
