//! `{{variable}}` substitution for email templates.

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::TemplateVariable;

/// Replaces every `{{name}}` that has a value in `vars`.
///
/// Matching is exact: `{{ name }}` is not the same placeholder as
/// `{{name}}`. Placeholders without a value are left as written.
pub fn render(text: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) if is_placeholder_name(&after_open[..end]) => {
                let name = &after_open[..end];
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                }
                rest = &after_open[end + 2..];
            }
            Some(_) => {
                // not a placeholder; keep the braces and rescan what follows
                out.push_str("{{");
                rest = after_open;
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Distinct placeholder names in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };
        let name = &after_open[..end];
        if !is_placeholder_name(name) {
            rest = after_open;
            continue;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after_open[end + 2..];
    }
    names
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

pub fn example_values(variables: &[TemplateVariable]) -> HashMap<String, String> {
    variables
        .iter()
        .map(|v| (v.name.clone(), v.example.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Preview {
    pub subject: String,
    pub html: String,
    /// Placeholders used in subject or body that are not declared.
    pub undeclared: Vec<String>,
}

pub fn preview(subject: &str, html_body: &str, variables: &[TemplateVariable]) -> Preview {
    let values = example_values(variables);
    let mut undeclared: Vec<String> = Vec::new();
    for name in placeholders(subject).into_iter().chain(placeholders(html_body)) {
        if !values.contains_key(&name) && !undeclared.contains(&name) {
            undeclared.push(name);
        }
    }

    Preview {
        subject: render(subject, &values),
        html: render(html_body, &values),
        undeclared,
    }
}

/// Template as shipped with the application, used by the seed endpoint.
#[derive(Debug, Clone)]
pub struct DefaultTemplate {
    pub name: &'static str,
    pub subject: &'static str,
    pub html_body: &'static str,
    pub variables: &'static [(&'static str, &'static str)],
}

impl DefaultTemplate {
    pub fn variables(&self) -> Vec<TemplateVariable> {
        self.variables
            .iter()
            .map(|(name, example)| TemplateVariable {
                name: (*name).to_string(),
                example: (*example).to_string(),
            })
            .collect()
    }
}

pub const COURSE_PURCHASE_CONFIRMATION: &str = "course_purchase_confirmation";
pub const ORDER_CONFIRMATION: &str = "order_confirmation";
pub const ORDER_SHIPPED: &str = "order_shipped";
pub const CUSTOM_SONG_RECEIVED: &str = "custom_song_received";
pub const CUSTOM_SONG_READY: &str = "custom_song_ready";
pub const CERTIFICATE_ISSUED: &str = "certificate_issued";
pub const PAYMENT_FAILED: &str = "payment_failed";

pub fn default_templates() -> Vec<DefaultTemplate> {
    vec![
        DefaultTemplate {
            name: COURSE_PURCHASE_CONFIRMATION,
            subject: "You're enrolled in {{courseTitle}}",
            html_body: concat!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 24px; color: #1f2937;">"#,
                "<h2>Welcome, {{userName}}!</h2>",
                "<p>Your purchase of <strong>{{courseTitle}}</strong> is confirmed.</p>",
                "<p>Amount paid: {{amount}}</p>",
                r#"<p><a href="{{courseUrl}}">Start learning</a></p></div>"#
            ),
            variables: &[
                ("userName", "Asha"),
                ("courseTitle", "Carnatic Vocals for Beginners"),
                ("amount", "INR 2,499.00"),
                ("courseUrl", "https://academy.example.com/courses/1"),
            ],
        },
        DefaultTemplate {
            name: ORDER_CONFIRMATION,
            subject: "Order #{{orderId}} received",
            html_body: concat!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 24px; color: #1f2937;">"#,
                "<h2>Thank you, {{customerName}}!</h2>",
                "<p>We received your order <strong>#{{orderId}}</strong>.</p>",
                "<p>{{itemsSummary}}</p>",
                "<p>Total: {{total}} ({{paymentMethod}})</p></div>"
            ),
            variables: &[
                ("customerName", "Ravi"),
                ("orderId", "1042"),
                ("itemsSummary", "2 x Tanpura Keychain (Gold)"),
                ("total", "INR 598.00"),
                ("paymentMethod", "cod"),
            ],
        },
        DefaultTemplate {
            name: ORDER_SHIPPED,
            subject: "Order #{{orderId}} is on its way",
            html_body: concat!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 24px; color: #1f2937;">"#,
                "<h2>Good news, {{customerName}}!</h2>",
                "<p>Your order <strong>#{{orderId}}</strong> has shipped.</p>",
                "<p>Tracking ID: <strong>{{trackingId}}</strong></p></div>"
            ),
            variables: &[
                ("customerName", "Ravi"),
                ("orderId", "1042"),
                ("trackingId", "DL123456789IN"),
            ],
        },
        DefaultTemplate {
            name: CUSTOM_SONG_RECEIVED,
            subject: "We're composing your song for {{recipientName}}",
            html_body: concat!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 24px; color: #1f2937;">"#,
                "<h2>Hi {{customerName}},</h2>",
                "<p>Your custom {{occasion}} song for <strong>{{recipientName}}</strong> is in our queue.</p>",
                "<p>Order reference: #{{orderId}}</p></div>"
            ),
            variables: &[
                ("customerName", "Meera"),
                ("occasion", "birthday"),
                ("recipientName", "Arjun"),
                ("orderId", "77"),
            ],
        },
        DefaultTemplate {
            name: CUSTOM_SONG_READY,
            subject: "Your song for {{recipientName}} is ready",
            html_body: concat!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 24px; color: #1f2937;">"#,
                "<h2>Hi {{customerName}},</h2>",
                "<p>Your song for <strong>{{recipientName}}</strong> is ready to listen.</p>",
                r#"<p><a href="{{previewUrl}}">Listen to the preview</a></p></div>"#
            ),
            variables: &[
                ("customerName", "Meera"),
                ("recipientName", "Arjun"),
                ("previewUrl", "https://cdn.example.com/custom-songs/77-preview.mp3"),
            ],
        },
        DefaultTemplate {
            name: CERTIFICATE_ISSUED,
            subject: "Your certificate for {{courseTitle}}",
            html_body: concat!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 24px; color: #1f2937;">"#,
                "<h2>Congratulations, {{userName}}!</h2>",
                "<p>You completed <strong>{{courseTitle}}</strong>.</p>",
                "<p>Certificate ID: {{certificateId}}</p>",
                r#"<p><a href="{{certificateUrl}}">View your certificate</a></p></div>"#
            ),
            variables: &[
                ("userName", "Asha"),
                ("courseTitle", "Carnatic Vocals for Beginners"),
                ("certificateId", "CERT-20240601-1A2B3C4D"),
                ("certificateUrl", "https://academy.example.com/certificates/CERT-20240601-1A2B3C4D"),
            ],
        },
        DefaultTemplate {
            name: PAYMENT_FAILED,
            subject: "Payment for {{itemName}} did not go through",
            html_body: concat!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 24px; color: #1f2937;">"#,
                "<h2>Hi {{customerName}},</h2>",
                "<p>We could not confirm your payment for <strong>{{itemName}}</strong>.</p>",
                "<p>You can retry from your account at any time.</p></div>"
            ),
            variables: &[("customerName", "Ravi"), ("itemName", "Order #1042")],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_every_occurrence() {
        let out = render("{{name}} and {{name}} again", &vars(&[("name", "Asha")]));
        assert_eq!(out, "Asha and Asha again");
    }

    #[test]
    fn leaves_unknown_placeholders_untouched() {
        let out = render("Hi {{name}}, order {{orderId}}", &vars(&[("name", "Asha")]));
        assert_eq!(out, "Hi Asha, order {{orderId}}");
    }

    #[test]
    fn matching_is_exact() {
        let out = render("{{ name }} / {{name}}", &vars(&[("name", "Asha")]));
        assert_eq!(out, "{{ name }} / Asha");
    }

    #[test]
    fn unterminated_braces_are_kept() {
        let out = render("price {{amount", &vars(&[("amount", "10")]));
        assert_eq!(out, "price {{amount");
    }

    #[test]
    fn nested_open_braces_still_match_inner_placeholder() {
        let out = render("{{ {{name}}", &vars(&[("name", "Asha")]));
        assert_eq!(out, "{{ Asha");
    }

    #[test]
    fn values_are_not_rescanned() {
        let out = render("{{a}}", &vars(&[("a", "{{b}}"), ("b", "nope")]));
        assert_eq!(out, "{{b}}");
    }

    #[test]
    fn placeholders_in_first_seen_order() {
        let names = placeholders("{{b}} {{a}} {{b}} {{ c }} {{d.e}}");
        assert_eq!(names, vec!["b", "a", "d.e"]);
    }

    #[test]
    fn preview_reports_undeclared_names() {
        let declared = vec![TemplateVariable {
            name: "userName".into(),
            example: "Asha".into(),
        }];
        let p = preview("Hi {{userName}}", "<p>{{userName}} {{courseTitle}}</p>", &declared);
        assert_eq!(p.subject, "Hi Asha");
        assert_eq!(p.html, "<p>Asha {{courseTitle}}</p>");
        assert_eq!(p.undeclared, vec!["courseTitle"]);
    }

    #[test]
    fn seed_templates_declare_all_their_placeholders() {
        for t in default_templates() {
            let p = preview(t.subject, t.html_body, &t.variables());
            assert!(p.undeclared.is_empty(), "{} uses {:?}", t.name, p.undeclared);
        }
    }
}
