use smk_log_model::LogRecord;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum Level {
    #[display("debug")]
    Debug,
    #[display("info")]
    Info,
    #[display("warning")]
    Warning,
    #[display("error")]
    Error,
    #[display("critical")]
    Critical,
    #[display("unknown")]
    Unknown,
}

impl Level {
    const KNOWN: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Case-insensitive lookup of one of the known level names.
    pub fn from_name(name: &str) -> Option<Level> {
        let name = name.trim();
        Self::KNOWN
            .into_iter()
            .find(|level| level.to_string().eq_ignore_ascii_case(name))
    }

    /// Short marker for text renderers.
    pub fn marker(&self) -> &'static str {
        match self {
            Level::Critical => "!!",
            Level::Error => "E",
            Level::Warning => "W",
            Level::Info => "i",
            Level::Debug => "d",
            Level::Unknown => "?",
        }
    }
}

/// Maps level names onto [Level].
///
/// A name that is present but not one of the known levels and a name that is missing entirely are
/// resolved separately. Leaving either fallback as `None` uses the default, [Level::Unknown].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelClassifier {
    pub unrecognized: Option<Level>,
    pub absent: Option<Level>,
}

impl LevelClassifier {
    const DEFAULT_FALLBACK: Level = Level::Unknown;

    pub fn new(unrecognized: Option<Level>, absent: Option<Level>) -> Self {
        Self {
            unrecognized,
            absent,
        }
    }

    pub fn classify(&self, name: Option<&str>) -> Level {
        match name {
            None => self.absent.unwrap_or(Self::DEFAULT_FALLBACK),
            Some(name) => Level::from_name(name)
                .unwrap_or_else(|| self.unrecognized.unwrap_or(Self::DEFAULT_FALLBACK)),
        }
    }

    pub fn classify_record(&self, record: &LogRecord) -> Level {
        self.classify(record.levelname.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_ignore_case() {
        let classifier = LevelClassifier::default();
        assert_eq!(classifier.classify(Some("INFO")), Level::Info);
        assert_eq!(classifier.classify(Some("Warning")), Level::Warning);
        assert_eq!(classifier.classify(Some("critical")), Level::Critical);
        assert_eq!(classifier.classify(Some("DEBUG")), Level::Debug);
        assert_eq!(classifier.classify(Some("error")), Level::Error);
    }

    #[test]
    fn defaults_to_unknown() {
        let classifier = LevelClassifier::default();
        assert_eq!(classifier.classify(None), Level::Unknown);
        assert_eq!(classifier.classify(Some("NOTSET")), Level::Unknown);
        // The fallback itself is not a name that can be matched.
        assert_eq!(classifier.classify(Some("unknown")), Level::Unknown);
        assert_eq!(Level::from_name("unknown"), None);
    }

    #[test]
    fn fallbacks_are_independent() {
        let classifier = LevelClassifier::new(Some(Level::Warning), Some(Level::Info));
        assert_eq!(classifier.classify(Some("VERBOSE")), Level::Warning);
        assert_eq!(classifier.classify(None), Level::Info);

        let only_absent = LevelClassifier::new(None, Some(Level::Debug));
        assert_eq!(only_absent.classify(Some("VERBOSE")), Level::Unknown);
        assert_eq!(only_absent.classify(None), Level::Debug);
    }

    #[test]
    fn markers_are_distinct() {
        let mut markers = Level::KNOWN.map(|level| level.marker()).to_vec();
        markers.push(Level::Unknown.marker());
        markers.sort();
        markers.dedup();
        assert_eq!(markers.len(), 6);
    }
}
