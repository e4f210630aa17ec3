//! Identifier case conversion for generated Go code.
//!
//! Table and column names arrive in SQL `snake_case`; generated types,
//! fields and methods use Go `CamelCase`, while parameters use
//! `lowerCamel`. A handful of whole-word acronyms keep Go's initialism
//! style (`id` becomes `ID`).

/// Whole-word acronyms applied before camel casing.
const ACRONYMS: &[(&str, &str)] = &[("id", "ID"), ("ip", "IP")];

fn is_separator(c: char) -> bool {
    matches!(c, '_' | '-' | ' ' | '.')
}

fn camel(s: &str, upper_first: bool) -> String {
    let s = s.trim();
    if s.is_empty() {
        return String::new();
    }

    let (s, acronym) = match ACRONYMS.iter().find(|(word, _)| *word == s) {
        Some((_, replacement)) => (*replacement, true),
        None => (s, false),
    };

    let mut out = String::with_capacity(s.len());
    let mut cap_next = upper_first;
    let mut prev_upper = false;

    for (i, c) in s.chars().enumerate() {
        let is_upper = c.is_ascii_uppercase();
        let is_lower = c.is_ascii_lowercase();

        let c = if cap_next && is_lower {
            c.to_ascii_uppercase()
        } else if !cap_next && i == 0 && is_upper {
            c.to_ascii_lowercase()
        } else if !cap_next && prev_upper && is_upper && !acronym {
            c.to_ascii_lowercase()
        } else {
            c
        };
        prev_upper = is_upper;

        if is_upper || is_lower {
            out.push(c);
            cap_next = false;
        } else if c.is_ascii_digit() {
            out.push(c);
            cap_next = true;
        } else if is_separator(c) {
            cap_next = true;
        } else if !c.is_ascii() {
            out.push(c);
            cap_next = false;
        }
    }
    out
}

/// Convert an identifier to Go `CamelCase`.
///
/// ```
/// use ddlgen::naming::to_camel;
///
/// assert_eq!(to_camel("fido_credential"), "FidoCredential");
/// assert_eq!(to_camel("id"), "ID");
/// ```
pub fn to_camel(s: &str) -> String {
    camel(s, true)
}

/// Convert an identifier to Go `lowerCamel` (parameter names).
pub fn to_lower_camel(s: &str) -> String {
    camel(s, false)
}

/// Convert an identifier to `snake_case`.
///
/// Digits stay attached to the word before them, so `Sha1Hash` becomes
/// `sha1_hash` rather than `sha_1_hash`.
pub fn to_snake(s: &str) -> String {
    let chars: Vec<char> = s.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if is_separator(c) {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let lower_to_upper = prev.is_ascii_lowercase() || prev.is_ascii_digit();
            let acronym_end =
                prev.is_ascii_uppercase() && next.is_some_and(|n| n.is_ascii_lowercase());
            if (lower_to_upper || acronym_end) && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }

    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_camel() {
        assert_eq!(to_camel("user"), "User");
        assert_eq!(to_camel("created_at"), "CreatedAt");
        assert_eq!(to_camel("user_id"), "UserId");
        assert_eq!(to_camel("TENANT_ID"), "TenantId");
        assert_eq!(to_camel("id"), "ID");
        assert_eq!(to_camel("ip"), "IP");
        assert_eq!(to_camel("sha1_hash"), "Sha1Hash");
        assert_eq!(to_camel("CreatedAt"), "CreatedAt");
    }

    #[test]
    fn test_to_lower_camel() {
        assert_eq!(to_lower_camel("ID"), "id");
        assert_eq!(to_lower_camel("UserId"), "userId");
        assert_eq!(to_lower_camel("CreatedAt"), "createdAt");
        assert_eq!(to_lower_camel("email"), "email");
    }

    #[test]
    fn test_to_snake() {
        assert_eq!(to_snake("CreatedAt"), "created_at");
        assert_eq!(to_snake("ID"), "id");
        assert_eq!(to_snake("UserID"), "user_id");
        assert_eq!(to_snake("UserId"), "user_id");
        assert_eq!(to_snake("HTTPServer"), "http_server");
        assert_eq!(to_snake("Sha1Hash"), "sha1_hash");
        assert_eq!(to_snake("already_snake"), "already_snake");
        assert_eq!(to_snake("FidoCredential"), "fido_credential");
    }

    #[test]
    fn test_snake_camel_stable() {
        for column in ["tenant_id", "public_key", "sign_count", "created_at"] {
            assert_eq!(to_snake(&to_camel(column)), column);
        }
    }
}
