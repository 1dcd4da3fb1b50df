use serde::Serialize;

/// Input widget kind of a property, as the plugin host renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropKind {
    ShortText,
    LongText,
    DateTime,
    Array,
    StaticDropdown { options: Vec<&'static str> },
}

/// One input property of an action or trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    #[serde(flatten)]
    pub kind: PropKind,
    pub required: bool,
}

impl PropSpec {
    pub(crate) fn required(name: &'static str, display_name: &'static str, kind: PropKind) -> Self {
        Self {
            name,
            display_name,
            kind,
            required: true,
        }
    }

    pub(crate) fn optional(name: &'static str, display_name: &'static str, kind: PropKind) -> Self {
        Self {
            name,
            display_name,
            kind,
            required: false,
        }
    }
}
