/// A change reported by a named input control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputChange {
    /// Raw text typed into a text, number or select input.
    Text { name: String, value: String },
    /// Checkbox or switch toggled.
    Checked { name: String, checked: bool },
}

impl InputChange {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        InputChange::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn checked(name: impl Into<String>, checked: bool) -> Self {
        InputChange::Checked {
            name: name.into(),
            checked,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InputChange::Text { name, .. } | InputChange::Checked { name, .. } => name,
        }
    }
}
