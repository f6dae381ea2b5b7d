use std::sync::Arc;

use chrono::{DateTime, Utc};
use shorty_error::{bail, AuthError, ShortyResult};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Command, HELP};
use crate::{
    app::App,
    auth::{transport, IssuedToken},
    clock::Millis,
    engine::Storage,
};

/// What the console should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Console state: the application plus the current session token, which is
/// replaced by every refreshed token the service hands back.
pub struct Session<S> {
    app: Arc<App<S>>,
    token: Option<String>,
}

impl<S: Storage> Session<S> {
    pub fn new(app: Arc<App<S>>) -> Self {
        Self { app, token: None }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// Runs one command. Every command, help included, passes the global
    /// rate limiter first.
    pub async fn execute(
        &mut self,
        command: Command,
        cancel: &CancellationToken,
    ) -> ShortyResult<Reply> {
        self.app.admit()?;
        debug!(command = command.name(), "executing");

        let text = match command {
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
            Command::Register { username, password } => {
                let account = self
                    .app
                    .accounts
                    .register(&username, &password, cancel)
                    .await?;
                format!("registered {} with id {}", account.username, account.id)
            }
            Command::Login { username, password } => {
                let issued = self.app.accounts.login(&username, &password).await?;
                let text = format!(
                    "logged in as {username}, session expires {}",
                    format_millis(issued.expires_at())
                );
                self.keep(issued);
                text
            }
            Command::WhoAmI => {
                let token = self.require_token()?;
                let (session, fresh) = self.app.accounts.authenticate(&token, cancel).await?;
                self.keep(fresh);
                let account = session.account;
                format!(
                    "{} (id {}), member since {}",
                    account.username,
                    account.id,
                    format_millis(account.created_at)
                )
            }
            Command::Passwd { current, new } => {
                let token = self.require_token()?;
                self.app
                    .accounts
                    .change_password(&token, &current, &new, cancel)
                    .await?;
                self.token = None;
                "password changed, please log in again".to_string()
            }
            Command::Rename { password, username } => {
                let token = self.require_token()?;
                let issued = self
                    .app
                    .accounts
                    .change_username(&token, &password, &username, cancel)
                    .await?;
                self.keep(issued);
                format!("username changed to {username}")
            }
            Command::Logout => {
                self.token = None;
                format!(
                    "logged out\nSet-Cookie: {}",
                    transport::logout_cookie()
                )
            }
            Command::Shorten { url } => {
                let token = self.require_token()?;
                let (link, fresh) = self.app.shorten(&token, &url, cancel).await?;
                self.keep(fresh);
                format!("{} -> {}", link.code, link.original_url)
            }
            Command::Resolve { code } => {
                let link = self.app.links.resolve(&code).await?;
                format!(
                    "{} ({} view{})",
                    link.original_url,
                    link.view_count,
                    if link.view_count == 1 { "" } else { "s" }
                )
            }
            Command::ApiKeyNew => {
                let token = self.require_token()?;
                let (issued, fresh) = self.app.issue_api_key(&token, cancel).await?;
                self.keep(fresh);
                format!(
                    "{}\nstore it now, it is not shown again",
                    issued.plaintext.expose()
                )
            }
            Command::ApiKeyCheck { key } => {
                let key = self.app.api_keys.verify(&key).await?;
                format!("valid key {} owned by user {}", key.id, key.owner_id)
            }
        };
        Ok(Reply::Text(text))
    }

    fn require_token(&self) -> ShortyResult<String> {
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => bail!(AuthError::MissingToken),
        }
    }

    fn keep(
        &mut self,
        issued: IssuedToken,
    ) {
        self.token = Some(issued.token);
    }
}

fn format_millis(ms: Millis) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}
