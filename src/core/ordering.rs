//! The one ordering table for attributes and columns.
//!
//! Both the unfolder (spreadsheet column order) and the text codecs (key order
//! inside each emitted mapping) go through [`order_keys`], so a form that is
//! converted twice produces the same bytes and the same columns.

pub const TYPE: &str = "type";
pub const NAME: &str = "name";
pub const LABEL: &str = "label";
pub const LIST_NAME: &str = "list_name";
/// Column holding free-form comments; always ordered last
pub const COMMENT: &str = "#";

/// Keys the text form uses for nesting, so no survey column may use them
pub const CHILDREN_KEY: &str = "children";
pub const END_KEY: &str = "end";
pub const RESERVED_SURVEY_KEYS: &[&str] = &[CHILDREN_KEY, END_KEY];

/// Top-level section for conversion metadata, next to the three sheets
pub const META_KEY: &str = "yxf";
/// Inside [`META_KEY`]: header columns no row fills, per sheet
pub const EMPTY_COLUMNS_KEY: &str = "empty_columns";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    Survey,
    Choices,
    Settings,
}

impl SheetKind {
    pub const ALL: [SheetKind; 3] = [SheetKind::Survey, SheetKind::Choices, SheetKind::Settings];

    pub fn sheet_name(self) -> &'static str {
        match self {
            SheetKind::Survey => "survey",
            SheetKind::Choices => "choices",
            SheetKind::Settings => "settings",
        }
    }

    pub fn from_sheet_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.sheet_name() == name)
    }

    /// Keys that always come first, in this order
    pub fn leading(self) -> &'static [&'static str] {
        match self {
            SheetKind::Survey => &[TYPE, NAME, LABEL],
            SheetKind::Choices => &[LIST_NAME, NAME, LABEL],
            SheetKind::Settings => &[],
        }
    }
}

/// Order keys for a sheet: leading keys first, then the rest in the order
/// given, then the comment column.
pub fn order_keys<'a, I>(kind: SheetKind, keys: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let keys: Vec<&'a str> = keys.into_iter().collect();
    let leading = kind.leading();

    let mut ordered: Vec<&'a str> = leading
        .iter()
        .filter_map(|lead| keys.iter().copied().find(|k| k == lead))
        .collect();
    for key in &keys {
        if *key != COMMENT && !leading.contains(key) && !ordered.contains(key) {
            ordered.push(key);
        }
    }
    if keys.contains(&COMMENT) {
        ordered.push(COMMENT);
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survey_order_puts_type_name_label_first_and_comment_last() {
        let keys = ["#", "hint", "label", "required", "name", "type"];
        assert_eq!(
            order_keys(SheetKind::Survey, keys),
            vec!["type", "name", "label", "hint", "required", "#"]
        );
    }

    #[test]
    fn test_choices_order_starts_with_list_name() {
        let keys = ["label", "name", "filter", "list_name"];
        assert_eq!(
            order_keys(SheetKind::Choices, keys),
            vec!["list_name", "name", "label", "filter"]
        );
    }

    #[test]
    fn test_settings_keep_given_order() {
        let keys = ["form_id", "#", "form_title"];
        assert_eq!(
            order_keys(SheetKind::Settings, keys),
            vec!["form_id", "form_title", "#"]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let keys = ["name", "hint", "name", "hint"];
        assert_eq!(order_keys(SheetKind::Survey, keys), vec!["name", "hint"]);
    }

    #[test]
    fn test_sheet_name_lookup() {
        assert_eq!(SheetKind::from_sheet_name("choices"), Some(SheetKind::Choices));
        assert_eq!(SheetKind::from_sheet_name("Survey"), None);
    }
}
