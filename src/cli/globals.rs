use secrecy::SecretString;

/// Process-wide configuration resolved at startup. The token secret is
/// required: without it the server cannot verify a single request, so
/// startup fails instead of failing every verification at runtime.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub token_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            token_secret: secret,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(SecretString::from("hush"));
        assert_eq!(args.token_secret.expose_secret(), "hush");
    }
}
