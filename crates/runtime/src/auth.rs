//! Registry credentials for image pulls.

use bollard::auth::DockerCredentials;

/// Credentials attached to every pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
    pub email: String,
    pub identity_token: String,
}

impl RegistryAuth {
    /// Read `DOCKER_REGISTRY_USER`, `DOCKER_REGISTRY_PWD`,
    /// `DOCKER_REGISTRY_MAIL` and `DOCKER_REGISTRY_TOKEN`.
    ///
    /// Returns `None` when none of them is set.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        let auth = Self {
            username: var("DOCKER_REGISTRY_USER"),
            password: var("DOCKER_REGISTRY_PWD"),
            email: var("DOCKER_REGISTRY_MAIL"),
            identity_token: var("DOCKER_REGISTRY_TOKEN"),
        };
        (auth != Self::default()).then_some(auth)
    }

    /// Client credentials; empty fields are left out.
    pub fn credentials(&self) -> DockerCredentials {
        let set = |v: &str| (!v.is_empty()).then(|| v.to_string());
        DockerCredentials {
            username: set(&self.username),
            password: set(&self.password),
            email: set(&self.email),
            identitytoken: set(&self.identity_token),
            ..Default::default()
        }
    }
}
