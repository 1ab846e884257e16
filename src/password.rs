use bcrypt::{hash, verify};

const BCRYPT_COST: u32 = 10;
const PASSWORD_MIN_LEN: usize = 10;
const PASSWORD_MAX_LEN: usize = 20;
const PASSWORD_SPECIALS: &str = "!@#$%^&*";

/// hash_password
///
/// Produces a salted bcrypt hash (cost 10) suitable for the `users.password` column.
pub fn hash_password(plain: &str) -> Result<String, bcrypt::BcryptError> {
    hash(plain, BCRYPT_COST)
}

/// verify_password
///
/// Returns `false` on mismatch and also when the stored hash is malformed.
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    match verify(plain, hashed) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::debug!("password verification failed: {:?}", e);
            false
        }
    }
}

/// is_email_valid
///
/// Accepts `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the
/// domain with non-empty labels on both sides.
pub fn is_email_valid(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// is_password_valid
///
/// 10 to 20 characters with at least one digit, one lowercase letter, one uppercase
/// letter and one of `!@#$%^&*`.
pub fn is_password_valid(password: &str) -> bool {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return false;
    }

    password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}
