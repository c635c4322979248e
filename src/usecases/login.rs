use std::io;

use anyhow::Result;

use crate::{
    domain::user::{display_name_or_fallback, CurrentUser, UserId},
    infra::auth_store::{user_id_from_token, AuthStore},
};

pub const DEFAULT_ATTEMPTS: usize = 3;

pub trait AuthTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()>;
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

pub struct StdTerminal;

impl AuthTerminal for StdTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        println!("{line}");
        Ok(())
    }

    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        use std::io::Write;

        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_owned()))
    }

    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match rpassword::prompt_password(prompt) {
            Ok(secret) => Ok(Some(secret.trim().to_owned())),
            Err(source) if source.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(source) => Err(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn(UserId),
    Cancelled,
}

/// Stores an access token issued by the marketplace web login.
///
/// The user id comes from the token's claims; opaque tokens fall back to
/// asking for it.
pub fn run_login(
    terminal: &mut dyn AuthTerminal,
    store: &AuthStore,
    attempts: usize,
) -> Result<LoginOutcome> {
    terminal.print_line("Paste the access token from the marketplace web session.")?;

    let Some(access_token) = collect_token(terminal, attempts)? else {
        return Ok(LoginOutcome::Cancelled);
    };

    let user_id = match user_id_from_token(&access_token) {
        Ok(user_id) => user_id,
        Err(error) => {
            terminal.print_line(&format!("AUTH_TOKEN_OPAQUE: {error}"))?;
            match collect_user_id(terminal, attempts)? {
                Some(user_id) => user_id,
                None => return Ok(LoginOutcome::Cancelled),
            }
        }
    };

    let name = terminal
        .prompt_line("Display name (optional): ")?
        .unwrap_or_default();

    let user = CurrentUser {
        id: user_id,
        display_name: display_name_or_fallback(&name, user_id),
        access_token,
    };
    store.save(&user)?;

    tracing::info!(code = "AUTH_LOGGED_IN", user_id, "credentials stored");
    terminal.print_line(&format!("Logged in as {} (#{user_id}).", user.display_name))?;

    Ok(LoginOutcome::LoggedIn(user_id))
}

fn collect_token(terminal: &mut dyn AuthTerminal, attempts: usize) -> io::Result<Option<String>> {
    for attempt in 1..=attempts {
        let Some(token) = terminal.prompt_secret("Access token: ")? else {
            terminal.print_line("Input cancelled (EOF). Run roomchat login again to retry.")?;
            return Ok(None);
        };

        let token = token.strip_prefix("Bearer ").unwrap_or(&token).trim();
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            terminal.print_line(&format!(
                "Token must be a single non-empty value. Attempts left: {}",
                attempts.saturating_sub(attempt)
            ))?;
            continue;
        }

        return Ok(Some(token.to_owned()));
    }

    terminal.print_line("Token step failed too many times.")?;
    Ok(None)
}

fn collect_user_id(terminal: &mut dyn AuthTerminal, attempts: usize) -> io::Result<Option<UserId>> {
    for attempt in 1..=attempts {
        let Some(raw) = terminal.prompt_line("Your user id: ")? else {
            terminal.print_line("Input cancelled (EOF). Run roomchat login again to retry.")?;
            return Ok(None);
        };

        match raw.parse::<UserId>() {
            Ok(user_id) if user_id > 0 => return Ok(Some(user_id)),
            _ => terminal.print_line(&format!(
                "User id must be a positive number. Attempts left: {}",
                attempts.saturating_sub(attempt)
            ))?,
        }
    }

    terminal.print_line("User id step failed too many times.")?;
    Ok(None)
}
