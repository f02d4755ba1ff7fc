use crate::args::{BackendKind, InitArgs};
use crate::commands::Out;
use crate::config::Backend;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;
use uuid::Uuid;

/// Creates the data directory, its subdirectories and an initial `config.json`.
///
/// # Arguments
/// - `kakeibo_home` - The directory that will be the root of data directory, e.g. `$HOME/kakeibo`
/// - `args` - The backend to use. The local backend gets a freshly generated user id and an empty
///   SQLite database. The supabase backend needs the project URL and anon key.
///
/// # Errors
/// - Returns an error if the directory is already initialized or any file operations fail.
pub async fn init(kakeibo_home: &Path, args: &InitArgs) -> Result<Out<()>> {
    let backend = match args.backend() {
        BackendKind::Local => Backend::Local {
            user_id: Uuid::new_v4().to_string(),
        },
        BackendKind::Supabase => Backend::Supabase {
            url: args
                .url()
                .context("--url is required for the supabase backend")
                .pub_result(ErrorType::Config)?
                .to_string(),
            anon_key: args
                .anon_key()
                .context("--anon-key is required for the supabase backend")
                .pub_result(ErrorType::Config)?
                .to_string(),
        },
    };
    let config = Config::create(kakeibo_home, backend).await?;

    let mut message = format!(
        "Successfully created the kakeibo directory at '{}'",
        config.root().display()
    );
    if args.backend() == BackendKind::Supabase {
        message.push_str("\nRun 'kakeibo login' to sign in");
    }
    Ok(message.into())
}
