use crate::api::{SessionFile, SupabaseStore};
use crate::args::LoginArgs;
use crate::commands::Out;
use crate::config::Backend;
use crate::error::{Error, ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::{anyhow, Context};

/// Signs in to the configured Supabase project with an email and password and saves the session
/// to `.secrets/session.json`. Later commands refresh it as needed.
///
/// # Errors
/// - Returns a `Config` error if the local backend is configured.
/// - Returns an `Auth` error if the credentials are rejected.
pub async fn login(config: Config, args: LoginArgs) -> Result<Out<String>> {
    let Backend::Supabase { url, anon_key } = config.backend() else {
        return Err(Error::new(
            ErrorType::Config,
            anyhow!("The local backend has a single user and needs no login"),
        ));
    };
    let store = SupabaseStore::new(url, anon_key.clone(), None).pub_result(ErrorType::Config)?;
    let session = store
        .sign_in(args.email(), args.password())
        .await
        .context("Unable to sign in")
        .pub_result(ErrorType::Auth)?;
    let user_id = session.user_id.clone();

    SessionFile::new(config.session_path(), session)
        .save()
        .await
        .pub_result(ErrorType::Io)?;
    Ok(Out::new(format!("Signed in as {}", args.email()), user_id))
}
