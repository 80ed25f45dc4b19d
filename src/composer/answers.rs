use serde_json::{Map, Value};

/// Placeholder written wherever an expected answer is missing.
pub const NOT_SPECIFIED: &str = "[NO ESPECIFICADO]";

/// Read-only view over a raw answer map keyed by question text.
///
/// Answers may be scalars, lists, or nested "context" maps produced by
/// duplicated questions. Accessors never surface a missing value as null.
#[derive(Debug, Clone, Copy)]
pub struct AnswerMap<'a> {
    inner: &'a Map<String, Value>,
}

impl<'a> AnswerMap<'a> {
    pub fn new(inner: &'a Map<String, Value>) -> Self {
        Self { inner }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.inner.iter()
    }

    /// Non-empty text for `question`, if any.
    pub fn text(&self, question: &str) -> Option<String> {
        self.inner.get(question).and_then(scalar_text)
    }

    pub fn text_or(&self, question: &str, placeholder: &str) -> String {
        self.text(question).unwrap_or_else(|| placeholder.to_string())
    }

    /// List answers; a single scalar becomes a one-element list.
    pub fn list(&self, question: &str) -> Vec<String> {
        match self.inner.get(question) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(other) => scalar_text(other).into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn nested(&self, question: &str) -> Option<AnswerMap<'a>> {
        match self.inner.get(question) {
            Some(Value::Object(map)) => Some(AnswerMap::new(map)),
            _ => None,
        }
    }

    /// Every context map stored under `question` (a single map or a list of maps).
    pub fn contexts(&self, question: &str) -> Vec<AnswerMap<'a>> {
        match self.inner.get(question) {
            Some(Value::Object(map)) => vec![AnswerMap::new(map)],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_object().map(AnswerMap::new))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Render a scalar answer as text. Lists are joined; maps have no scalar form.
pub fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "Sí".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Array(items) => items.iter().filter_map(scalar_text).collect::<Vec<_>>().join(", "),
        Value::Null | Value::Object(_) => String::new(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
