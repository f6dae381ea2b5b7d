use std::str::FromStr;

use thiserror::Error;

/// One console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { username: String, password: String },
    Login { username: String, password: String },
    WhoAmI,
    Passwd { current: String, new: String },
    Rename { password: String, username: String },
    Logout,
    Shorten { url: String },
    Resolve { code: String },
    ApiKeyNew,
    ApiKeyCheck { key: String },
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', try HELP")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
REGISTER <username> <password>   create an account
LOGIN <username> <password>      log in and keep the session token
WHOAMI                           show the current account (refreshes the token)
PASSWD <current> <new>           change password (logs out every session)
RENAME <password> <new-username> change username
LOGOUT                           drop the session token
SHORTEN <url>                    create a short link
RESOLVE <code>                   follow a short link
APIKEY NEW                       issue an API key
APIKEY CHECK <key>               verify an API key
HELP                             this text
QUIT                             leave";

impl Command {
    /// Name used in logs and rate limiter rejections.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "REGISTER",
            Self::Login { .. } => "LOGIN",
            Self::WhoAmI => "WHOAMI",
            Self::Passwd { .. } => "PASSWD",
            Self::Rename { .. } => "RENAME",
            Self::Logout => "LOGOUT",
            Self::Shorten { .. } => "SHORTEN",
            Self::Resolve { .. } => "RESOLVE",
            Self::ApiKeyNew => "APIKEY NEW",
            Self::ApiKeyCheck { .. } => "APIKEY CHECK",
            Self::Help => "HELP",
            Self::Quit => "QUIT",
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((head, args)) = parts.split_first() else {
            return Err(CommandError::Empty);
        };
        let owned = |i: usize| args[i].to_string();

        let command = match (head.to_ascii_uppercase().as_str(), args.len()) {
            ("REGISTER", 2) => Self::Register {
                username: owned(0),
                password: owned(1),
            },
            ("REGISTER", _) => return Err(CommandError::Usage("REGISTER <username> <password>")),
            ("LOGIN", 2) => Self::Login {
                username: owned(0),
                password: owned(1),
            },
            ("LOGIN", _) => return Err(CommandError::Usage("LOGIN <username> <password>")),
            ("WHOAMI", 0) => Self::WhoAmI,
            ("WHOAMI", _) => return Err(CommandError::Usage("WHOAMI")),
            ("PASSWD", 2) => Self::Passwd {
                current: owned(0),
                new: owned(1),
            },
            ("PASSWD", _) => return Err(CommandError::Usage("PASSWD <current> <new>")),
            ("RENAME", 2) => Self::Rename {
                password: owned(0),
                username: owned(1),
            },
            ("RENAME", _) => return Err(CommandError::Usage("RENAME <password> <new-username>")),
            ("LOGOUT", 0) => Self::Logout,
            ("LOGOUT", _) => return Err(CommandError::Usage("LOGOUT")),
            ("SHORTEN", 1) => Self::Shorten { url: owned(0) },
            ("SHORTEN", _) => return Err(CommandError::Usage("SHORTEN <url>")),
            ("RESOLVE", 1) => Self::Resolve { code: owned(0) },
            ("RESOLVE", _) => return Err(CommandError::Usage("RESOLVE <code>")),
            ("APIKEY", _) => match args.split_first() {
                Some((sub, [])) if sub.eq_ignore_ascii_case("NEW") => Self::ApiKeyNew,
                Some((sub, [key])) if sub.eq_ignore_ascii_case("CHECK") => Self::ApiKeyCheck {
                    key: key.to_string(),
                },
                _ => return Err(CommandError::Usage("APIKEY NEW | APIKEY CHECK <key>")),
            },
            ("HELP" | "?", _) => Self::Help,
            ("QUIT" | "EXIT", _) => Self::Quit,
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}
