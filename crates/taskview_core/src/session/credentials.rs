use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new<E: Into<String>, P: Into<String>>(email: E, password: P) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Trimmed copy, or the first field that is not acceptable.
    pub fn validated(&self) -> Result<Credentials, AppError> {
        let email = self.email.trim();
        if !is_valid_email(email) {
            return Err(AppError::validation("email", "Valid email is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        Ok(Credentials {
            email: email.to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn validated(&self) -> Result<Credentials, AppError> {
        let credentials = Credentials::new(self.email.clone(), self.password.clone()).validated()?;
        if self.confirm_password.is_empty() {
            return Err(AppError::validation(
                "confirm_password",
                "Confirm password is required",
            ));
        }
        if self.confirm_password != self.password {
            return Err(AppError::validation("confirm_password", "Passwords don't match"));
        }
        Ok(credentials)
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
