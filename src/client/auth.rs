/// Personal access token credential pair for Tableau REST sign-in.
#[derive(Clone)]
pub struct PatCredentials {
    pub token_name: String,
    pub token_secret: String,
}

impl PatCredentials {
    pub fn new(token_name: impl Into<String>, token_secret: impl Into<String>) -> Self {
        Self {
            token_name: token_name.into(),
            token_secret: token_secret.into(),
        }
    }
}

impl std::fmt::Debug for PatCredentials {
    // The secret never reaches debug output or logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatCredentials")
            .field("token_name", &self.token_name)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Display for PatCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "token {}", self.token_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let credentials = PatCredentials::new("exporter", "hunter2");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("exporter"));
        assert!(!debug.contains("hunter2"));
    }
}
