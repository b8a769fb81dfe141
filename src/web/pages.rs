//! HTML rendering for the home, survey and result pages.
//!
//! Every interpolated value goes through [`html_escape`].

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::domain::schema::SURVEY_FIELDS;
use crate::domain::{FieldKind, PredictionResult};
use crate::ports::CategoricalEncoder;

/// Escape text for use in element content and quoted attributes.
#[must_use]
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Heart Check</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 40rem; margin: 2rem auto; padding: 0 1rem; color: #1f2937; }}
label {{ display: block; margin-top: 0.75rem; font-weight: 600; }}
input, select {{ width: 100%; padding: 0.4rem; margin-top: 0.25rem; }}
button, .button {{ margin-top: 1.25rem; padding: 0.5rem 1.25rem; }}
.error {{ background: #fee2e2; color: #991b1b; padding: 0.75rem; border-radius: 0.25rem; }}
.badge {{ display: inline-block; padding: 0.25rem 0.75rem; border-radius: 999px; color: #fff; font-weight: 700; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = html_escape(title),
    )
}

#[must_use]
pub fn home_page() -> String {
    layout(
        "Home",
        r#"<h1>Heart Disease Risk Check</h1>
<p>Answer twelve short questions about your health and habits to get an
estimate of your risk of heart disease from a pre-trained model.</p>
<p>The estimate is not a diagnosis. Talk to a clinician about any concern.</p>
<p><a class="button" href="/predict">Start the survey</a></p>"#,
    )
}

/// The survey form.
///
/// Categorical questions become a `<select>` when the encoder knows the
/// field's vocabulary, otherwise a free-text input. `previous` refills the
/// form after a failed submission.
#[must_use]
pub fn survey_page(
    encoder: &dyn CategoricalEncoder,
    error: Option<&str>,
    previous: Option<&HashMap<String, String>>,
) -> String {
    let mut body = String::from("<h1>Health Survey</h1>\n");

    if let Some(message) = error {
        let _ = writeln!(
            body,
            r#"<p class="error" role="alert">Error: {}</p>"#,
            html_escape(message)
        );
    }

    body.push_str("<form method=\"post\" action=\"/predict\">\n");
    for field in &SURVEY_FIELDS {
        let name = html_escape(field.name);
        let current = previous
            .and_then(|form| form.get(field.name))
            .map(String::as_str)
            .unwrap_or_default();

        let _ = writeln!(
            body,
            r#"<label for="{name}">{}</label>"#,
            html_escape(field.label)
        );

        let vocabulary = match field.kind {
            FieldKind::Categorical => encoder.vocabulary(field.name),
            FieldKind::Numeric => None,
        };

        match (field.kind, vocabulary) {
            (FieldKind::Categorical, Some(options)) if !options.is_empty() => {
                let _ = writeln!(body, r#"<select id="{name}" name="{name}" required>"#);
                for option in options {
                    let selected = if option == current { " selected" } else { "" };
                    let escaped = html_escape(option);
                    let _ = writeln!(
                        body,
                        r#"<option value="{escaped}"{selected}>{escaped}</option>"#
                    );
                }
                body.push_str("</select>\n");
            }
            (FieldKind::Numeric, _) => {
                let _ = writeln!(
                    body,
                    r#"<input id="{name}" name="{name}" type="text" inputmode="decimal" value="{}" required>"#,
                    html_escape(current)
                );
            }
            (FieldKind::Categorical, _) => {
                let _ = writeln!(
                    body,
                    r#"<input id="{name}" name="{name}" type="text" value="{}" required>"#,
                    html_escape(current)
                );
            }
        }
    }
    body.push_str("<button type=\"submit\">Predict</button>\n</form>\n");

    layout("Survey", &body)
}

#[must_use]
pub fn result_page(result: &PredictionResult) -> String {
    let risk = result.risk_level();
    let (r, g, b) = risk.color();
    let verdict = if result.prediction == 1 {
        "Heart disease indicated"
    } else {
        "No heart disease indicated"
    };

    let body = format!(
        r#"<h1>Your Result</h1>
<p><span class="badge" style="background: #{r:02x}{g:02x}{b:02x}">{risk} RISK</span></p>
<p><strong>{verdict}</strong> (class {class})</p>
<p>Estimated probability of heart disease: <strong>{positive:.2}%</strong></p>
<p>Estimated probability of no heart disease: {negative:.2}%</p>
<p>{description}</p>
<p><a class="button" href="/predict">Take the survey again</a></p>"#,
        class = result.prediction,
        positive = result.positive_percent(),
        negative = result.negative_percent(),
        description = html_escape(risk.description()),
    );

    layout("Result", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::artifacts::LabelEncoder;

    fn sex_encoder() -> LabelEncoder {
        let fields = [("Sex".to_string(), vec!["Female".to_string(), "Male".to_string()])]
            .into_iter()
            .collect();
        LabelEncoder::per_field(fields).expect("valid vocabulary")
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_survey_page_lists_every_field() {
        let page = survey_page(&sex_encoder(), None, None);
        for field in &SURVEY_FIELDS {
            assert!(page.contains(&format!(r#"name="{}""#, field.name)));
        }
        assert!(page.contains(r#"<select id="Sex" name="Sex" required>"#));
        assert!(page.contains(r#"<option value="Male">Male</option>"#));
        assert!(!page.contains("Error:"));
    }

    #[test]
    fn test_survey_page_shows_escaped_error_and_keeps_answers() {
        let previous: HashMap<String, String> = [
            ("Sex".to_string(), "Male".to_string()),
            ("WeightInKilograms".to_string(), "<abc>".to_string()),
        ]
        .into_iter()
        .collect();
        let page = survey_page(&sex_encoder(), Some("bad <value>"), Some(&previous));

        assert!(page.contains("Error: bad &lt;value&gt;"));
        assert!(page.contains(r#"value="&lt;abc&gt;""#));
        assert!(page.contains(r#"<option value="Male" selected>"#));
    }

    #[test]
    fn test_result_page_percentages() {
        let result = PredictionResult::from_probabilities([0.25, 0.75]);
        let page = result_page(&result);
        assert!(page.contains("75.00%"));
        assert!(page.contains("25.00%"));
        assert!(page.contains("HIGH RISK"));
        assert!(page.contains("#f43f5e"));
    }
}
