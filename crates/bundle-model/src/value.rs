/// A single property list value.
///
/// Numbers and dates are kept in their textual form; nothing in a bundle
/// launcher needs to do arithmetic on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlistValue {
    String(String),
    Bool(bool),
    Array(Vec<PlistValue>),
    Dict(Dictionary),
}

impl PlistValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlistValue::Bool(value) => Some(*value),
            PlistValue::String(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            PlistValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PlistValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

impl From<&str> for PlistValue {
    fn from(value: &str) -> Self {
        PlistValue::String(value.to_string())
    }
}

impl From<String> for PlistValue {
    fn from(value: String) -> Self {
        PlistValue::String(value)
    }
}

impl From<bool> for PlistValue {
    fn from(value: bool) -> Self {
        PlistValue::Bool(value)
    }
}

/// Insertion-ordered plist dictionary.
///
/// `Info.plist` output order is significant for reproducible bundles, so this
/// is a plain list rather than a map. Inserting an existing key replaces the
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: Vec<(String, PlistValue)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PlistValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    /// Non-empty, trimmed string value for `key`.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(PlistValue::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// String items of an array value. A lone string is treated as a
    /// one-element list.
    pub fn strings(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(PlistValue::Array(items)) => items
                .iter()
                .filter_map(PlistValue::as_str)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            Some(PlistValue::String(value)) if !value.is_empty() => vec![value.clone()],
            _ => Vec::new(),
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PlistValue::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlistValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Dictionary> for PlistValue {
    fn from(value: Dictionary) -> Self {
        PlistValue::Dict(value)
    }
}

impl FromIterator<(String, PlistValue)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (String, PlistValue)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }
        dict
    }
}
