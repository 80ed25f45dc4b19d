use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::crypto::{self, CryptoVault};

pub fn hash_password(password: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    let hash = crypto::hash_password(password)?;
    output_value(&output_format, "hash", &hash)
}

pub fn blind_index(value: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let index = CryptoVault::blind_index(value).ok_or_else(|| anyhow::anyhow!("value must not be empty"))?;
    output_value(&output_format, "blind_index", &index)
}

pub fn generate_key(output_format: OutputFormat) -> anyhow::Result<()> {
    output_value(&output_format, "key", &CryptoVault::generate_key_hex())
}
