//! Embedded font programs and the caller-owned font registry.
//!
//! Resolution never installs fonts anywhere. A caller that wants to make
//! embedded programs available to a presentation layer registers them in a
//! [`FontRegistry`] it owns, scoped to a document or a session.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Container format of an embedded font program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontFormat {
    /// `/FontFile2`: TrueType or CIDFontType2.
    TrueType,
    /// `/FontFile`: Type 1.
    Type1,
    /// `/FontFile3` with `/Subtype /Type1C` or `/CIDFontType0C` (bare CFF).
    OpenType,
    /// `/FontFile3` with any other subtype.
    Binary,
}

impl FontFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontFormat::TrueType => "truetype",
            FontFormat::Type1 => "type1",
            FontFormat::OpenType => "opentype",
            FontFormat::Binary => "binary",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            FontFormat::TrueType => "font/ttf",
            FontFormat::Type1 => "application/x-font-type1",
            FontFormat::OpenType => "font/otf",
            FontFormat::Binary => "application/octet-stream",
        }
    }
}

impl fmt::Display for FontFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes of an embedded font file plus its format tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontProgram {
    pub bytes: Arc<[u8]>,
    pub format: FontFormat,
}

impl FontProgram {
    pub fn new(bytes: impl Into<Arc<[u8]>>, format: FontFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Result of [`FontRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Stored under the requested family name.
    Registered,
    /// An identical program was already stored under this family.
    Duplicate,
    /// A different program already owned the family name; this one was
    /// stored under the returned name instead.
    Renamed(String),
}

/// Caller-owned set of installed font programs, keyed by family name.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: HashMap<String, FontProgram>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `program` under `family`.
    ///
    /// Subsets of the same face embedded by different fonts share a family
    /// name but differ in bytes, so the second one gets a numbered alias.
    pub fn register(&mut self, family: &str, program: FontProgram) -> RegistrationOutcome {
        let mut name = family.to_string();
        let mut suffix = 1;
        loop {
            match self.fonts.get(&name) {
                None => {
                    self.fonts.insert(name.clone(), program);
                    return if suffix == 1 {
                        RegistrationOutcome::Registered
                    } else {
                        RegistrationOutcome::Renamed(name)
                    };
                }
                Some(existing) if *existing == program => return RegistrationOutcome::Duplicate,
                Some(_) => {
                    suffix += 1;
                    name = format!("{family}#{suffix}");
                }
            }
        }
    }

    pub fn get(&self, family: &str) -> Option<&FontProgram> {
        self.fonts.get(family)
    }

    pub fn contains(&self, family: &str) -> bool {
        self.fonts.contains_key(family)
    }

    /// Registered family names, sorted.
    pub fn families(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fonts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
