//! Server-rendered HTML: the input form, the result page and the error page

use crate::data::FeatureSchema;
use crate::inference::PredictionResult;
use axum::http::StatusCode;
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #f5f7fa; color: #2c3e50; margin: 0; }
main { max-width: 720px; margin: 2rem auto; background: #fff; padding: 2rem; border-radius: 8px;
       box-shadow: 0 2px 8px rgba(0,0,0,.08); }
h1 { margin-top: 0; font-size: 1.6rem; }
label { display: block; margin: .8rem 0 .2rem; font-weight: 600; }
input, select { width: 100%; padding: .5rem; border: 1px solid #ccd; border-radius: 4px; box-sizing: border-box; }
button, .button { margin-top: 1.5rem; padding: .7rem 1.4rem; background: #2c7be5; color: #fff; border: 0;
         border-radius: 4px; font-size: 1rem; cursor: pointer; text-decoration: none; display: inline-block; }
.hint { color: #7f8c8d; font-weight: 400; font-size: .85rem; }
.notice { background: #fff4e5; border-left: 4px solid #f39c12; padding: .8rem 1rem; margin-bottom: 1rem; }
.card { border: 1px solid #e3e7ee; border-radius: 6px; padding: 1rem; margin: 1rem 0; }
.badge { display: inline-block; padding: .25rem .7rem; border-radius: 12px; color: #fff; font-weight: 600; }
table { width: 100%; border-collapse: collapse; margin-top: .6rem; }
td { padding: .25rem 0; border-top: 1px solid #f0f2f5; }
.error { color: #c0392b; }
"#;

/// Escape text for HTML element and attribute content
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n<main>\n{}\n</main>\n</body>\n</html>\n",
        escape(title),
        STYLE,
        body
    )
}

/// Input form with one field per schema feature
pub fn index_page(schema: &FeatureSchema, model_ready: bool) -> String {
    let mut body = String::new();
    body.push_str("<h1>Lifestyle Disease Risk Check</h1>\n");
    if !model_ready {
        body.push_str(
            "<p class=\"notice\">No trained model is loaded yet. \
             Submitting the form will fail until one is available.</p>\n",
        );
    }
    body.push_str("<form method=\"post\" action=\"/predict\">\n");

    for f in &schema.numeric {
        let name = escape(&f.name);
        let (bounds, hint) = match f.range {
            Some((lo, hi)) => (
                format!(" min=\"{}\" max=\"{}\"", lo, hi),
                format!(" <span class=\"hint\">({} to {})</span>", lo, hi),
            ),
            None => (String::new(), String::new()),
        };
        let _ = writeln!(
            body,
            "<label for=\"{name}\">{name}{hint}</label>\
             <input type=\"number\" step=\"any\" id=\"{name}\" name=\"{name}\"{bounds} required>"
        );
    }

    for f in &schema.categorical {
        let name = escape(&f.name);
        match &f.allowed {
            Some(values) => {
                let _ = write!(
                    body,
                    "<label for=\"{name}\">{name}</label><select id=\"{name}\" name=\"{name}\" required>"
                );
                for v in values {
                    let v = escape(v);
                    let _ = write!(body, "<option value=\"{v}\">{v}</option>");
                }
                body.push_str("</select>\n");
            }
            None => {
                let _ = writeln!(
                    body,
                    "<label for=\"{name}\">{name}</label>\
                     <input type=\"text\" id=\"{name}\" name=\"{name}\" required>"
                );
            }
        }
    }

    body.push_str("<button type=\"submit\">Predict risk</button>\n</form>\n");
    layout("Lifestyle Disease Risk Check", &body)
}

/// One card per disease with the predicted level and class probabilities
pub fn result_page(schema: &FeatureSchema, result: &PredictionResult) -> String {
    let mut body = String::new();
    body.push_str("<h1>Your Risk Assessment</h1>\n");
    for p in &result.predictions {
        let color = p.color.as_deref().unwrap_or("#7f8c8d");
        let _ = write!(
            body,
            "<div class=\"card\"><h2>{}</h2>\
             <span class=\"badge\" style=\"background:{}\">{}</span> \
             <span class=\"hint\">{:.1}% confidence</span><table>",
            escape(&p.disease),
            escape(color),
            escape(&p.label),
            p.probability * 100.0
        );
        let target = schema.target(&p.disease);
        for (class, prob) in &p.probabilities {
            let label = target
                .map(|t| t.label_for(*class))
                .unwrap_or_else(|| class.to_string());
            let _ = write!(
                body,
                "<tr><td>{}</td><td>{:.1}%</td></tr>",
                escape(&label),
                prob * 100.0
            );
        }
        body.push_str("</table></div>\n");
    }
    body.push_str("<a class=\"button\" href=\"/\">Check again</a>\n");
    layout("Risk Assessment", &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p class=\"error\">{}</p>\n<a class=\"button\" href=\"/\">Back to the form</a>\n",
        status.as_u16(),
        escape(message)
    );
    layout("Error", &body)
}
