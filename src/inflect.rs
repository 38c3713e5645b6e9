//! Naming conventions shared by the store and the renderer
//!
//! Foreign keys are `snake_case(TypeName) + "_id"`; display labels are the
//! humanized field name.

/// Suffix marking a foreign-key field
pub const FOREIGN_KEY_SUFFIX: &str = "_id";

/// Prefix of lookup-table foreign keys, dropped from display labels
pub const LOOKUP_PREFIX: &str = "lookup_";

/// `LineItem` → `line_item`, `Admin::User` → `admin_user`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c == ':' {
            if prev != Some(':') && !out.is_empty() {
                out.push('_');
            }
            prev = Some(c);
            continue;
        }
        if c.is_uppercase() {
            let after_word = prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            if after_word {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// `owner` / `line_item` → `Owner` / `LineItem`
pub fn camelize(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Conventional foreign-key field name pointing at `type_name`
pub fn foreign_key(type_name: &str) -> String {
    format!("{}{}", snake_case(type_name), FOREIGN_KEY_SUFFIX)
}

pub fn is_foreign_key(field: &str) -> bool {
    field.len() > FOREIGN_KEY_SUFFIX.len() && field.ends_with(FOREIGN_KEY_SUFFIX)
}

/// Conventional target type of a foreign-key field: `owner_id` → `Owner`
pub fn foreign_key_target(field: &str) -> String {
    camelize(strip_foreign_key(field))
}

/// Drop the `lookup_` prefix and `_id` suffix
pub fn strip_foreign_key(field: &str) -> &str {
    let field = field.strip_prefix(LOOKUP_PREFIX).unwrap_or(field);
    field.strip_suffix(FOREIGN_KEY_SUFFIX).unwrap_or(field)
}

/// Human label for a field: `first_name` → `First name`, `owner_id` → `Owner`
pub fn humanize(field: &str) -> String {
    let base = field.strip_suffix(FOREIGN_KEY_SUFFIX).unwrap_or(field);
    let words = base.trim_matches('_').replace('_', " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("Owner"), "owner");
        assert_eq!(snake_case("LineItem"), "line_item");
        assert_eq!(snake_case("Admin::User"), "admin_user");
        assert_eq!(snake_case("Item2Part"), "item2_part");
    }

    #[test]
    fn test_foreign_keys() {
        assert_eq!(foreign_key("LineItem"), "line_item_id");
        assert!(is_foreign_key("owner_id"));
        assert!(!is_foreign_key("_id"));
        assert!(!is_foreign_key("identity"));
        assert_eq!(foreign_key_target("line_item_id"), "LineItem");
        assert_eq!(strip_foreign_key("lookup_country_id"), "country");
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("status"), "Status");
        assert_eq!(humanize("owner_id"), "Owner");
        assert_eq!(humanize("first_name"), "First name");
        assert_eq!(humanize("country"), "Country");
    }
}
