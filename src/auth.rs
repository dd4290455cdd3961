//! API authentication module
//!
//! The metadata API issues short-lived bearer tokens in exchange for an API
//! key. Both are persisted in a small credential file so that later runs can
//! reuse a token until it is about to expire.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Tokens closer than this to their expiry are replaced before use
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

const API_KEY_PROMPT: &str = "Enter API key <https://thetvdb.com/dashboard/account/apikey>";

/// Errors that prevent obtaining a bearer token
///
/// Without a token no metadata can be fetched, so these abort the run.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Reading the API key from the user failed
    #[error("failed to read API key: {0}")]
    Prompt(String),

    /// The login request could not be sent or its response not read
    #[error("login request failed: {0}")]
    LoginRequest(String),

    /// The API refused the login
    #[error("login failed with HTTP {status}: {body}")]
    LoginRejected { status: u16, body: String },

    /// The login response did not contain a token
    #[error("malformed login response ({reason}): {body}")]
    MalformedLoginResponse { reason: String, body: String },
}

/// Errors that can occur while persisting credentials
#[derive(Debug, Error)]
pub enum CredentialFileError {
    /// Failed to create the directory holding the credential file
    #[error("Failed to create credential directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the credential file
    #[error("Failed to write credential file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize the credentials
    #[error("Failed to serialize credentials: {0}")]
    SerializationFailed(#[from] toml::ser::Error),
}

/// The persisted credential record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, rename = "apikey")]
    pub api_key: String,
    #[serde(default)]
    pub token: String,
}

/// A TOML file holding [`Credentials`]
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The credential file in the platform's configuration directory
    pub fn default_location() -> Option<Self> {
        let proj_dirs = directories::ProjectDirs::from("", "", "horrible-organizer")?;
        Some(Self::new(proj_dirs.config_dir().join("auth.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored credentials
    ///
    /// A missing or unreadable file yields empty credentials, which leads
    /// to a fresh login.
    pub fn load(&self) -> Credentials {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Credentials::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read credentials");
                return Credentials::default();
            }
        };

        toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "ignoring malformed credentials");
            Credentials::default()
        })
    }

    /// Writes the credentials, readable by the owner only on unix
    pub fn save(&self, credentials: &Credentials) -> Result<(), CredentialFileError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CredentialFileError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string(credentials)?;
        let write_failed = |e: std::io::Error| CredentialFileError::WriteFailed {
            path: self.path.clone(),
            source: e,
        };

        fs::write(&self.path, content).map_err(write_failed)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(write_failed)?;
        }

        Ok(())
    }
}

/// Source of the API key when none is stored
pub trait KeyPrompt {
    /// Asks for the API key once; the answer may be empty.
    fn read_api_key(&mut self) -> Result<String, AuthError>;
}

/// Prompts for the API key on the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl KeyPrompt for TerminalPrompt {
    fn read_api_key(&mut self) -> Result<String, AuthError> {
        dialoguer::Input::<String>::new()
            .with_prompt(API_KEY_PROMPT)
            .allow_empty(true)
            .interact_text_on(&dialoguer::console::Term::stderr())
            .map_err(|e| AuthError::Prompt(e.to_string()))
    }
}

/// Lifecycle of the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Credentials have not been read yet
    Unloaded,
    /// The stored token is far enough from expiry to be reused
    Valid,
    /// The token is missing or about to expire and must be replaced
    Expiring,
    /// A new token was obtained during this run
    Refreshed,
}

/// Hands out bearer tokens, logging in again when the token is stale
///
/// Credentials are loaded on first use. The token is checked for imminent
/// expiry before every use and replaced through the supplied login
/// exchange; a request rejected with a stale token is not retried. A token
/// obtained during the run whose expiry cannot be read is reused until the
/// run ends.
pub struct AuthManager {
    file: CredentialFile,
    prompt: Box<dyn KeyPrompt>,
    credentials: Credentials,
    state: AuthState,
}

impl AuthManager {
    pub fn new(file: CredentialFile, prompt: impl KeyPrompt + 'static) -> Self {
        Self {
            file,
            prompt: Box::new(prompt),
            credentials: Credentials::default(),
            state: AuthState::Unloaded,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Returns a usable bearer token
    ///
    /// `login` exchanges an API key for a new token; it is only called when
    /// the current token is missing or expiring.
    pub fn bearer_token<F>(&mut self, login: F) -> Result<&str, AuthError>
    where
        F: FnOnce(&str) -> Result<String, AuthError>,
    {
        if self.state == AuthState::Unloaded {
            self.credentials = self.file.load();
            tracing::debug!(path = %self.file.path().display(), "loaded credentials");
        }

        // A token issued during this run is kept even if its expiry is unreadable
        let trusted = self.state == AuthState::Refreshed
            && token_expiry(&self.credentials.token).is_none();

        if !trusted && needs_refresh(&self.credentials.token, SystemTime::now()) {
            self.state = AuthState::Expiring;
            self.refresh(login)?;
        } else if self.state == AuthState::Unloaded {
            self.state = AuthState::Valid;
        }

        Ok(&self.credentials.token)
    }

    fn refresh<F>(&mut self, login: F) -> Result<(), AuthError>
    where
        F: FnOnce(&str) -> Result<String, AuthError>,
    {
        while self.credentials.api_key.is_empty() {
            self.credentials.api_key = self.prompt.read_api_key()?.trim().to_string();
        }

        self.credentials.token = login(&self.credentials.api_key)?;
        self.state = AuthState::Refreshed;

        if token_expiry(&self.credentials.token).is_none() {
            tracing::warn!("cannot read expiry from new token, reusing it for this run");
        }

        if let Err(e) = self.file.save(&self.credentials) {
            tracing::warn!(error = %e, "failed to persist credentials");
        }

        Ok(())
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: f64,
}

/// Reads the `exp` claim of a JWT without verifying its signature
pub fn token_expiry(token: &str) -> Option<SystemTime> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&decoded).ok()?;

    let since_epoch = Duration::try_from_secs_f64(claims.exp).ok()?;
    UNIX_EPOCH.checked_add(since_epoch)
}

/// Whether a token is missing, undecodable or within [`REFRESH_MARGIN`] of expiry
pub fn needs_refresh(token: &str, now: SystemTime) -> bool {
    if token.is_empty() {
        return true;
    }

    match token_expiry(token) {
        Some(expiry) => expiry
            .duration_since(now)
            .map_or(true, |remaining| remaining < REFRESH_MARGIN),
        None => {
            tracing::warn!("cannot read expiry from stored token");
            true
        }
    }
}
