/// Input validation
///
/// Field rules are declared as data ([`Rule`]) and evaluated by a [`Validator`]
/// that collects every failure per field. A request is valid only when no rule
/// failed.
///
/// # Example
///
/// ```
/// use birgedo_shared::validation::{validate_email, validate_password_plaintext, Validator};
///
/// let mut v = Validator::new();
/// validate_email(&mut v, "not-an-email");
/// validate_password_plaintext(&mut v, "short");
///
/// assert!(!v.is_valid());
/// let errors = v.into_errors();
/// assert_eq!(errors["email"], vec!["must be a valid email address"]);
/// assert_eq!(errors["password"], vec!["must be at least 8 bytes long"]);
/// ```

use std::collections::BTreeMap;

use validator::ValidateEmail;

/// Field name to failure messages, ordered by field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Message attached to ids that fail an existence lookup
pub const DOES_NOT_EXIST: &str = "doesn't exist with this id";

/// Character classes usable with [`Rule::Contains`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Digit,
    Lowercase,
    Uppercase,
    Symbol,
}

impl CharClass {
    fn matches(self, c: char) -> bool {
        match self {
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::Lowercase => c.is_lowercase(),
            CharClass::Uppercase => c.is_uppercase(),
            CharClass::Symbol => !c.is_alphanumeric() && !c.is_whitespace(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            CharClass::Digit => "a digit",
            CharClass::Lowercase => "a lowercase letter",
            CharClass::Uppercase => "an uppercase letter",
            CharClass::Symbol => "a symbol",
        }
    }
}

/// A single declarative check on a string field
///
/// Lengths are measured in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Email,
    Contains(CharClass),
}

impl Rule {
    /// Evaluates the rule, returning the failure message if it does not hold
    pub fn check(&self, value: &str) -> Option<String> {
        match *self {
            Rule::Required if value.trim().is_empty() => Some("must be provided".to_string()),
            Rule::MinLength(n) if value.len() < n => {
                Some(format!("must be at least {n} bytes long"))
            }
            Rule::MaxLength(n) if value.len() > n => {
                Some(format!("must not be more than {n} bytes long"))
            }
            Rule::Email if !value.validate_email() => {
                Some("must be a valid email address".to_string())
            }
            Rule::Contains(class) if !value.chars().any(|c| class.matches(c)) => {
                Some(format!("must contain {}", class.describe()))
            }
            _ => None,
        }
    }
}

/// Collects validation failures keyed by field name
#[derive(Debug, Default, Clone)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff no check has failed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a failure for `field`
    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Records `message` for `field` unless `ok` holds
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add_error(field, message);
        }
    }

    /// Evaluates every rule against `value`
    ///
    /// All failing rules are recorded. An empty value only reports `Required`
    /// so clients are not told an absent field is also too short.
    pub fn apply(&mut self, field: &str, value: &str, rules: &[Rule]) {
        if rules.contains(&Rule::Required) {
            if let Some(message) = Rule::Required.check(value) {
                self.add_error(field, message);
                return;
            }
        }

        for rule in rules.iter().filter(|r| **r != Rule::Required) {
            if let Some(message) = rule.check(value) {
                self.add_error(field, message);
            }
        }
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.apply("email", email, &[Rule::Required, Rule::Email]);
}

/// Password rules: 8 to 72 bytes (the Argon2 input is not truncated, but the
/// upper bound keeps hashing cost predictable)
pub fn validate_password_plaintext(v: &mut Validator, password: &str) {
    v.apply(
        "password",
        password,
        &[Rule::Required, Rule::MinLength(8), Rule::MaxLength(72)],
    );
}

pub fn validate_user_name(v: &mut Validator, name: &str) {
    v.apply("name", name, &[Rule::Required, Rule::MaxLength(500)]);
}

pub fn validate_room_title(v: &mut Validator, title: &str) {
    v.apply("title", title, &[Rule::Required, Rule::MaxLength(100)]);
}

pub fn validate_task_title(v: &mut Validator, title: &str) {
    v.apply("title", title, &[Rule::Required, Rule::MaxLength(200)]);
}

/// Ids must be positive; absent ids deserialize as zero and fail here
pub fn validate_id(v: &mut Validator, field: &str, id: i64) {
    v.check(id > 0, field, "must be a positive integer");
}
