//! Creates a user and prints a personal access token for it.
//!
//! The token is shown once; only its hash is stored. Running the command again for an
//! existing username replaces that user's token.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use osf_web::{
    auth::{generate_api_token, hash_api_token},
    config::ConfigLoader,
    db,
    repositories::UserRepository,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Unique login name
    #[arg(long)]
    username: String,

    /// Display name; defaults to the username
    #[arg(long)]
    fullname: Option<String>,

    /// Address sanction approval links are mailed to
    #[arg(long)]
    email: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new().load().context("loading configuration")?;
    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::migrate(&db).await?;

    let users = UserRepository::new(Arc::new(db));
    let token = generate_api_token();
    let token_hash = hash_api_token(&token);

    let user = match users
        .find_by_username(&args.username)
        .await
        .context("looking up user")?
    {
        Some(existing) => users
            .set_token_hash(existing, token_hash)
            .await
            .context("replacing token")?,
        None => {
            let fullname = args.fullname.as_deref().unwrap_or(&args.username);
            users
                .create(&args.username, fullname, args.email.as_deref(), Some(token_hash))
                .await
                .context("creating user")?
        }
    };

    println!("user id: {}", user.id);
    println!("token:   {token}");
    Ok(())
}
