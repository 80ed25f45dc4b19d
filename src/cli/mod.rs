pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "docflow")]
#[command(about = "Docflow CLI - Maintenance commands for the HR document workflow backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Encrypt every workflow still stored in plaintext (safe to re-run)")]
    MigrateWorkflows,

    #[command(about = "Print the Argon2id hash of a password")]
    HashPassword {
        #[arg(help = "Password to hash")]
        password: String,
    },

    #[command(about = "Print the blind index of a value")]
    BlindIndex {
        #[arg(help = "Value to index (trimmed and lowercased first)")]
        value: String,
    },

    #[command(about = "Generate a new random 256-bit encryption key")]
    GenerateKey,

    #[command(about = "Create a user with encrypted name and email")]
    CreateUser {
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Login email")]
        email: String,
        #[arg(long, help = "Password (at least 8 characters)")]
        password: String,
        #[arg(long, default_value = "user", help = "Role")]
        role: String,
        #[arg(long, help = "Company the user belongs to")]
        company: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::MigrateWorkflows => commands::workflows::migrate(output_format).await,
        Commands::HashPassword { password } => commands::keys::hash_password(&password, output_format),
        Commands::BlindIndex { value } => commands::keys::blind_index(&value, output_format),
        Commands::GenerateKey => commands::keys::generate_key(output_format),
        Commands::CreateUser {
            name,
            email,
            password,
            role,
            company,
        } => {
            let new = crate::services::NewUser {
                name,
                email,
                password,
                role,
                company,
            };
            commands::users::create(new, output_format).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_subcommands() {
        let cli = Cli::try_parse_from(["docflow", "migrate-workflows"]).unwrap();
        assert!(matches!(cli.command, Commands::MigrateWorkflows));

        let cli = Cli::try_parse_from([
            "docflow",
            "--json",
            "create-user",
            "--name",
            "Ana",
            "--email",
            "ana@empresa.cl",
            "--password",
            "secreto123",
        ])
        .unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::CreateUser { role, company, .. } => {
                assert_eq!(role, "user");
                assert!(company.is_none());
            }
            _ => panic!("expected create-user"),
        }
    }
}
