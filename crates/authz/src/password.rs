//! One-way salted password hashing.

use bcrypt::BcryptError;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, BcryptError> {
        bcrypt::hash(plaintext, self.cost)
    }

    /// A stored hash that cannot be parsed never verifies.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        match bcrypt::verify(plaintext, hash) {
            Ok(valid) => valid,
            Err(err) => {
                tracing::warn!(error = %err, "stored password hash is unreadable");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
