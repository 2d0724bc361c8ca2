use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::krist::new;
use anyhow::Result;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            jwt_secret,
        } => {
            // Fail early on an unparseable DSN instead of at pool creation
            let dsn = Url::parse(&dsn)?;

            let globals = GlobalArgs::new(jwt_secret);

            new(port, dsn.to_string(), &globals).await?;
        }
    }

    Ok(())
}
