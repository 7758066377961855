use std::path::Path;

/// Hero images in priority order; the last one ships with the app.
pub const HERO_CANDIDATES: [&str; 2] = ["img/turbine.png", "img/wind_turbine.jpg"];
pub const HERO_FALLBACK: &str = "img/wind.svg";

pub fn select_hero_image(static_dir: &Path) -> &'static str {
    HERO_CANDIDATES
        .iter()
        .copied()
        .find(|candidate| static_dir.join(candidate).exists())
        .unwrap_or(HERO_FALLBACK)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Formats a rounded prediction the way Python's `repr` shows a float
/// (`1240.0`, `3.14`, `1e+16`).
pub fn format_prediction(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let scientific = format!("{:e}", value);
        return match scientific.split_once('e') {
            Some((mantissa, exponent)) => match exponent.parse::<i32>() {
                Ok(exp) => format!(
                    "{}e{}{:02}",
                    mantissa,
                    if exp < 0 { '-' } else { '+' },
                    exp.abs()
                ),
                Err(_) => scientific.clone(),
            },
            None => scientific.clone(),
        };
    }
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        body = body
    )
}

pub fn render_index(hero_image: &str) -> String {
    let body = format!(
        r#"<header><h1>Wind Turbine Power Prediction</h1></header>
<img class="hero" src="/static/{hero}" alt="wind turbine">
<p><a href="/y_predict">Predict energy output</a></p>"#,
        hero = escape_html(hero_image)
    );
    layout("Wind Power", &body)
}

pub fn render_predict(cities: &[&str], prediction: Option<f64>, error: Option<&str>) -> String {
    let options: String = cities
        .iter()
        .map(|city| format!("<option value=\"{0}\">{0}</option>", escape_html(city)))
        .collect::<Vec<_>>()
        .join("\n");

    let mut body = format!(
        r#"<h1>Predict energy output</h1>
<form method="post" action="/y_predict">
<label>Theoretical power <input name="theoretical_power" type="text"></label>
<label>Wind speed <input name="windspeed" type="text"></label>
<button type="submit">Predict</button>
</form>
<label>City <select id="city">
{options}
</select></label>
<div id="weather"></div>"#,
        options = options
    );

    if let Some(value) = prediction {
        body.push_str(&format!(
            "\n<p class=\"prediction\">Predicted energy output: {}</p>",
            format_prediction(value)
        ));
    }
    if let Some(message) = error {
        body.push_str(&format!("\n<p class=\"error\">{}</p>", escape_html(message)));
    }

    layout("Predict", &body)
}
