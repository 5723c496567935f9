//! Field validators for storefront forms. Each returns `Some(message)` on failure.

/// Validate an email: must contain '@' and a '.' after it, max 254 chars.
pub fn validate_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Some("Adres e-mail jest wymagany".to_string());
    }
    if trimmed.len() > 254 {
        return Some("Adres e-mail może mieć najwyżej 254 znaki".to_string());
    }
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !trimmed.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Some("Podaj poprawny adres e-mail".to_string());
    }
    None
}

/// Validate a new password: 8–128 chars with at least one letter and one digit.
pub fn validate_password(password: &str) -> Option<String> {
    if password.is_empty() {
        return Some("Hasło jest wymagane".to_string());
    }
    if password.chars().count() < 8 {
        return Some("Hasło musi mieć co najmniej 8 znaków".to_string());
    }
    if password.chars().count() > 128 {
        return Some("Hasło może mieć najwyżej 128 znaków".to_string());
    }
    if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("Hasło musi zawierać literę i cyfrę".to_string());
    }
    None
}

pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Option<String> {
    if password != confirmation {
        return Some("Hasła nie są identyczne".to_string());
    }
    None
}

/// Validate a required text field with a max length.
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(format!("{field_name}: pole jest wymagane"));
    }
    if trimmed.chars().count() > max_len {
        return Some(format!("{field_name}: najwyżej {max_len} znaków"));
    }
    None
}

/// Validate an optional text field with a max length (empty is OK).
pub fn validate_optional(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    if value.trim().chars().count() > max_len {
        return Some(format!("{field_name}: najwyżej {max_len} znaków"));
    }
    None
}

/// Optional phone number: digits, spaces, dashes and a leading '+', 9–15 digits.
pub fn validate_phone(phone: &str) -> Option<String> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return None;
    }
    let allowed = trimmed
        .char_indices()
        .all(|(i, c)| c.is_ascii_digit() || c == ' ' || c == '-' || (c == '+' && i == 0));
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    if !allowed || !(9..=15).contains(&digits) {
        return Some("Podaj poprawny numer telefonu".to_string());
    }
    None
}

/// Postal code. Polish addresses must use the `NN-NNN` form.
pub fn validate_postal_code(code: &str, country_code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Some("Kod pocztowy jest wymagany".to_string());
    }
    if country_code.eq_ignore_ascii_case("pl") {
        let bytes = trimmed.as_bytes();
        let valid = bytes.len() == 6
            && bytes[2] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 2 || b.is_ascii_digit());
        if !valid {
            return Some("Kod pocztowy musi mieć format 00-000".to_string());
        }
    } else if trimmed.len() > 12 {
        return Some("Kod pocztowy jest za długi".to_string());
    }
    None
}

/// Two-letter ISO country code.
pub fn validate_country_code(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some("Wybierz kraj".to_string());
    }
    None
}

/// Quantity chosen in a cart form.
pub fn validate_quantity(quantity: i64) -> Option<String> {
    if !(1..=99).contains(&quantity) {
        return Some("Ilość musi być liczbą od 1 do 99".to_string());
    }
    None
}
