//! Name inflection for query definitions.
//!
//! A definition named `ProductCategoriesQuery` binds to the `product_categories`
//! table and the `ProductCategory` model unless told otherwise.

const QUERY_SUFFIX: &str = "Query";

/// Convert string to snake_case
pub fn snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    result
}

/// Convert string to PascalCase
pub fn pascal_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize = true;
    for c in s.chars() {
        if c == '_' {
            capitalize = true;
        } else if capitalize {
            result.extend(c.to_uppercase());
            capitalize = false;
        } else {
            result.push(c);
        }
    }
    result
}

/// Plural of a lower-case English noun, using the common suffix rules.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    if word.ends_with("us") || ["ss", "sh", "ch", "x", "z"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

/// Singulars ending in `e` whose plurals look like `-ies` or sibilant `-es`
/// plurals. Matched as word endings, so `warehouses` is covered by `house`.
const E_SINGULARS: &[&str] = &[
    "abuse", "avalanche", "breeze", "cache", "calorie", "cause", "cliche", "cookie", "excuse",
    "freeze", "headache", "house", "maze", "movie", "moustache", "mustache", "niche", "prize",
    "psyche", "quiche", "rookie", "size", "zombie",
];

/// Inverse of [`pluralize`] for the same suffix rules.
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('s') {
        if E_SINGULARS.iter().any(|singular| stem.ends_with(singular)) {
            return stem.to_string();
        }
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes", "uses"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") {
        return word.to_string();
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}

/// `Admin::ProductsQuery` -> `Products`
fn base_name(definition_name: &str) -> &str {
    let last = definition_name
        .rsplit("::")
        .next()
        .unwrap_or(definition_name);
    match last.strip_suffix(QUERY_SUFFIX) {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => last,
    }
}

/// Apply `f` to the last `_`-separated segment only.
fn map_last_segment(snake: &str, f: impl Fn(&str) -> String) -> String {
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", f(last)),
        None => f(snake),
    }
}

/// Default table for a definition: `ProductsQuery` -> `products`.
pub fn table_name_for(definition_name: &str) -> String {
    map_last_segment(&snake_case(base_name(definition_name)), pluralize)
}

/// Default model for a definition: `ProductsQuery` -> `Product`.
pub fn model_name_for(definition_name: &str) -> String {
    pascal_case(&map_last_segment(
        &snake_case(base_name(definition_name)),
        singularize,
    ))
}
