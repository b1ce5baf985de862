// src/db/mod.rs

pub mod catalog;
pub mod certificates;
pub mod courses;
pub mod custom_songs;
pub mod email_templates;
pub mod learning;
pub mod orders;
pub mod transactions;
pub mod users;

/// Lowercase ASCII slug: alphanumerics kept, every other run becomes `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
