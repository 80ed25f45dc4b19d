/// Tagged state of a protected string field in records written before
/// encryption was introduced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealedField {
    Plain(String),
    Encrypted(String),
}

impl SealedField {
    /// Legacy detector for untagged values: anything containing the `:`
    /// separator is treated as already encrypted. Best-effort only, a
    /// plaintext with a colon is misclassified. Use it for one-time
    /// migrations, not as a general type check.
    pub fn classify_legacy(raw: &str) -> Self {
        if raw.contains(':') {
            SealedField::Encrypted(raw.to_string())
        } else {
            SealedField::Plain(raw.to_string())
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, SealedField::Encrypted(_))
    }
}
