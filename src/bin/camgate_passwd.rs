//! CLI entry point for camgate-passwd: credential file maintenance.

use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "camgate-passwd", about = "camgate credential file tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a bcrypt hash for a password
    Hash {
        /// Password to hash; read from stdin when omitted.
        password: Option<String>,
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
    /// Add or replace a user in the credential file
    Add {
        #[arg(long, default_value = "passwords.json")]
        file: PathBuf,
        #[arg(long)]
        user: String,
        /// Password; read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Hash { password, cost } => {
            let password = password_or_stdin(password)?;
            println!("{}", camgate::auth::hash_password(&password, cost)?);
        }
        Commands::Add {
            file,
            user,
            password,
            cost,
        } => {
            let password = password_or_stdin(password)?;
            let hash = camgate::auth::hash_password(&password, cost)?;
            camgate::auth::upsert_credential(&file, &user, &hash)?;
            eprintln!("Updated {} in {}", user, file.display());
        }
    }
    Ok(())
}

fn password_or_stdin(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("no password given");
    }
    Ok(password)
}
