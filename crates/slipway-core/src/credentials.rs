use secrecy::{ExposeSecret, SecretString};

/// Registry credentials sourced from the environment.
///
/// The access token is held as a [`SecretString`] so `Debug` output redacts
/// it; it is only ever written to `docker login --password-stdin`, never
/// rendered into a command line or a log record.
#[derive(Debug)]
pub struct RegistryCredentials {
    pub username: String,
    token: SecretString,
}

impl RegistryCredentials {
    pub const USERNAME_VAR: &'static str = "DOCKER_USERNAME";
    pub const TOKEN_VAR: &'static str = "DOCKER_ACCESS_TOKEN";

    /// Read `DOCKER_USERNAME` / `DOCKER_ACCESS_TOKEN` from the process
    /// environment.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let username = lookup(Self::USERNAME_VAR).ok_or(crate::Error::MissingSecret {
            var: Self::USERNAME_VAR,
        })?;
        let token = lookup(Self::TOKEN_VAR).ok_or(crate::Error::MissingSecret {
            var: Self::TOKEN_VAR,
        })?;
        Ok(Self {
            username,
            token: token.into(),
        })
    }

    /// Token bytes for piping to stdin.
    pub fn expose_token(&self) -> &str {
        self.token.expose_secret()
    }
}
