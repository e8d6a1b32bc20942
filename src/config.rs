//! Folding configuration
//!
//! Which columns count as translatable is an explicit allow-list rather than
//! a guess from the column name's shape: `relevant::x` stays a plain column
//! named `relevant::x`, while `label::French` folds into `label`.

/// Attributes whose columns may carry a `::language` suffix
pub const DEFAULT_TRANSLATABLE: &[&str] = &[
    "label",
    "hint",
    "guidance_hint",
    "constraint_message",
    "required_message",
    "image",
    "audio",
    "video",
    "big-image",
    "media::image",
    "media::audio",
    "media::video",
    "media::big-image",
    "jr:constraintMsg",
    "jr:requiredMsg",
];

/// Separator between a translatable base name and its language tag
pub const DEFAULT_DELIMITER: &str = "::";

/// Language key used for the unsuffixed column inside a translation group
pub const DEFAULT_LANGUAGE: &str = "default";

/// Options shared by every fold/unfold of one conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldOptions {
    pub translatable: Vec<String>,
    pub delimiter: String,
    pub default_language: String,
}

impl Default for FoldOptions {
    fn default() -> Self {
        Self {
            translatable: DEFAULT_TRANSLATABLE.iter().map(|s| s.to_string()).collect(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl FoldOptions {
    /// Extend the allow-list, skipping blanks and duplicates
    #[must_use]
    pub fn with_translatable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into().trim().to_string();
            if !name.is_empty() && !self.translatable.contains(&name) {
                self.translatable.push(name);
            }
        }
        self
    }

    pub fn is_translatable(&self, base: &str) -> bool {
        self.translatable.iter().any(|t| t == base)
    }

    /// Split a column name into (base, language).
    ///
    /// Returns `None` for columns outside the allow-list. The longest matching
    /// base wins, so `media::image::French` is `media::image` + `French`.
    /// An empty tag (`label::`) comes back as `Some((base, Some("")))` for the
    /// caller to reject.
    pub fn split_column<'a>(&self, column: &'a str) -> Option<(&'a str, Option<&'a str>)> {
        let mut best: Option<(&'a str, Option<&'a str>)> = None;
        for base in &self.translatable {
            let candidate = if column == base {
                Some((&column[..base.len()], None))
            } else {
                column
                    .strip_prefix(base.as_str())
                    .and_then(|rest| rest.strip_prefix(self.delimiter.as_str()))
                    .map(|language| (&column[..base.len()], Some(language)))
            };
            if let Some((b, l)) = candidate {
                if best.map_or(true, |(current, _)| b.len() > current.len()) {
                    best = Some((b, l));
                }
            }
        }
        best
    }

    /// Column name for one language of a translatable attribute
    pub fn column_name(&self, base: &str, language: &str) -> String {
        if language == self.default_language {
            base.to_string()
        } else {
            format!("{base}{}{language}", self.delimiter)
        }
    }
}
