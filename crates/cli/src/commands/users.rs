use anyhow::Result;
use clap::Subcommand;
use folio_core::AppConfig;

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create a user and print its bearer token
    Create {
        username: String,

        #[arg(long)]
        superuser: bool,
    },
}

pub async fn run(config: &AppConfig, command: UserCommand) -> Result<()> {
    let store = super::open_store(config).await?;

    match command {
        UserCommand::Create { username, superuser } => {
            let user = store.create_user(&username, superuser).await?;
            tracing::info!(id = user.id, username = %user.username, superuser, "user created");
            println!("{}", user.token);
        }
    }
    Ok(())
}
