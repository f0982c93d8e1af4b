use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum LabelValue {
    String(String),
    /// Value and unit.
    Number(i64, String),
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Label {
    pub key: String,
    pub value: LabelValue,
}

impl Label {
    pub fn from_string_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Label {
            key: key.into(),
            value: LabelValue::String(value.into()),
        }
    }

    pub fn from_number_value(key: impl Into<String>, value: i64, unit: impl Into<String>) -> Self {
        Label {
            key: key.into(),
            value: LabelValue::Number(value, unit.into()),
        }
    }
}

impl Display for LabelValue {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            LabelValue::String(value) => write!(f, "{:?}", value),
            LabelValue::Number(value, unit) if unit.is_empty() => write!(f, "{}", value),
            LabelValue::Number(value, unit) => write!(f, "{}{}", value, unit),
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
