//! Dashboard sections
//!
//! Each section is computed into a `Result` and rendered by
//! [`render_section`]; a failing section becomes an inline error card while
//! the rest of the page still renders.

use std::fmt::Write;
use std::path::Path;

use ndarray::Array2;
use serde::Deserialize;

use super::charts::{histogram_svg, scatter_svg};
use crate::artifacts::PredictionTable;
use crate::config::DashboardConfig;
use crate::data::FEATURE_COLUMNS;
use crate::error::{PipelineError, Result};
use crate::evaluation::{ClassificationMetrics, ClassificationReport, RegressionMetrics};
use crate::training::{model_file_name, Algorithm, TaskType, TrainedModel};

const HISTOGRAM_BINS: usize = 20;

/// Escape text for HTML bodies and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Wrap a section body in a card, or show the error in its place
pub fn render_section(title: &str, body: Result<String>) -> String {
    match body {
        Ok(html) => format!(
            r#"<section class="card"><h2>{}</h2>{}</section>"#,
            escape_html(title),
            html
        ),
        Err(e) => format!(
            r#"<section class="card error"><h2>{}</h2><p class="error-message">{}</p></section>"#,
            escape_html(title),
            escape_html(&e.to_string())
        ),
    }
}

fn metric_tiles(tiles: &[(&str, f64)]) -> String {
    let mut html = String::from(r#"<div class="grid">"#);
    for (name, value) in tiles {
        let _ = write!(
            html,
            r#"<div class="tile"><div class="label">{}</div><div class="metric">{:.4}</div></div>"#,
            name, value
        );
    }
    html.push_str("</div>");
    html
}

fn preview_table(table: &PredictionTable, rows: usize) -> String {
    let mut html = format!(
        r#"<p>{} rows (showing {})</p><div class="scroll"><table><tr><th>real</th><th>prediction_label</th><th>prediction_score</th></tr>"#,
        table.len(),
        rows.min(table.len())
    );
    for i in 0..rows.min(table.len()) {
        let _ = write!(
            html,
            "<tr><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td></tr>",
            table.real[i], table.prediction_label[i], table.prediction_score[i]
        );
    }
    html.push_str("</table></div>");
    html
}

fn report_table(report: &ClassificationReport) -> String {
    let mut html = String::from(
        "<table><tr><th></th><th>precision</th><th>recall</th><th>f1-score</th><th>support</th></tr>",
    );
    let rows = report
        .classes
        .iter()
        .map(|(name, s)| (name.as_str(), s))
        .chain([("macro avg", &report.macro_avg), ("weighted avg", &report.weighted_avg)]);
    for (name, s) in rows {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td></tr>",
            name, s.precision, s.recall, s.f1_score, s.support
        );
    }
    let _ = write!(
        html,
        "<tr><td>accuracy</td><td></td><td></td><td>{:.2}</td><td>{}</td></tr></table>",
        report.accuracy, report.macro_avg.support
    );
    html
}

/// Classification prediction table with its metrics
#[derive(Debug, Clone)]
pub struct ClassificationSection {
    pub table: PredictionTable,
    pub metrics: ClassificationMetrics,
    pub report: ClassificationReport,
}

impl ClassificationSection {
    pub fn load(path: &Path) -> Result<Self> {
        let table = PredictionTable::read(path)?;
        let metrics = ClassificationMetrics::from_table(&table)?;
        let report = ClassificationReport::new(&table.real, &table.prediction_label)?;
        Ok(Self {
            table,
            metrics,
            report,
        })
    }

    pub fn render(&self, preview_rows: usize) -> String {
        let mut html = preview_table(&self.table, preview_rows);
        html.push_str(&metric_tiles(&[
            ("F1 score", self.metrics.f1_score),
            ("Log loss", self.metrics.log_loss),
        ]));
        html.push_str("<h3>Classification report</h3>");
        html.push_str(&report_table(&self.report));
        html.push_str("<h3>Distribution of prediction_score</h3>");
        html.push_str(&histogram_svg(&self.table.prediction_score, HISTOGRAM_BINS, "prediction_score"));
        html
    }
}

/// Regression prediction table with its error metrics
#[derive(Debug, Clone)]
pub struct RegressionSection {
    pub table: PredictionTable,
    pub metrics: RegressionMetrics,
}

impl RegressionSection {
    pub fn load(path: &Path) -> Result<Self> {
        let table = PredictionTable::read(path)?;
        let metrics = RegressionMetrics::from_table(&table)?;
        Ok(Self { table, metrics })
    }

    pub fn render(&self, preview_rows: usize) -> String {
        let mut html = preview_table(&self.table, preview_rows);
        html.push_str(&metric_tiles(&[
            ("MAE", self.metrics.mae),
            ("MSE", self.metrics.mse),
            ("RMSE", self.metrics.rmse),
            ("R²", self.metrics.r2),
        ]));
        html.push_str("<h3>Real vs predicted</h3>");
        html.push_str(&scatter_svg(
            &self.table.real,
            &self.table.prediction_label,
            "real",
            "prediction_label",
        ));
        html.push_str("<h3>Distribution of errors</h3>");
        html.push_str(&histogram_svg(&self.table.residuals(), HISTOGRAM_BINS, "real - prediction_label"));
        html
    }
}

/// Raw form fields; parsed on submit so bad input is reported inline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShotForm {
    pub lat: String,
    pub lon: String,
    pub minutes_remaining: String,
    pub period: String,
    pub playoffs: String,
    pub shot_distance: String,
}

impl Default for ShotForm {
    fn default() -> Self {
        Self {
            lat: "33.0".to_string(),
            lon: "-118.0".to_string(),
            minutes_remaining: "6".to_string(),
            period: "1".to_string(),
            playoffs: "no".to_string(),
            shot_distance: "15".to_string(),
        }
    }
}

fn parse_field(name: &str, raw: &str, range: Option<(f64, f64)>) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| PipelineError::value(format!("{} must be a number, got '{}'", name, raw)))?;
    if !value.is_finite() {
        return Err(PipelineError::value(format!("{} must be finite", name)));
    }
    if let Some((lo, hi)) = range {
        if value < lo || value > hi {
            return Err(PipelineError::value(format!(
                "{} must be between {} and {}, got {}",
                name, lo, hi, value
            )));
        }
    }
    Ok(value)
}

impl ShotForm {
    /// Feature row in model column order
    pub fn features(&self) -> Result<[f64; 6]> {
        let playoffs = match self.playoffs.trim().to_ascii_lowercase().as_str() {
            "yes" | "1" | "true" => 1.0,
            "no" | "0" | "false" => 0.0,
            other => {
                return Err(PipelineError::value(format!(
                    "playoffs must be yes or no, got '{}'",
                    other
                )))
            }
        };
        Ok([
            parse_field("lat", &self.lat, None)?,
            parse_field("lon", &self.lon, None)?,
            parse_field("minutes_remaining", &self.minutes_remaining, Some((0.0, 12.0)))?,
            parse_field("period", &self.period, Some((1.0, 4.0)))?,
            playoffs,
            parse_field("shot_distance", &self.shot_distance, Some((0.0, 50.0)))?,
        ])
    }

    fn render(&self) -> String {
        let input = |name: &str, label: &str, value: &str, extra: &str| {
            format!(
                r#"<label>{label}<input name="{name}" value="{}" {extra}></label>"#,
                escape_html(value)
            )
        };
        let playoffs_yes = matches!(self.playoffs.trim(), "yes" | "1" | "true");
        format!(
            r#"<form method="post" action="/predict" class="grid">{}{}{}{}<label>Playoffs<select name="playoffs"><option value="no"{}>no</option><option value="yes"{}>yes</option></select></label>{}<button type="submit">Predict</button></form>"#,
            input("lat", "Latitude", &self.lat, r#"type="number" step="any""#),
            input("lon", "Longitude", &self.lon, r#"type="number" step="any""#),
            input("minutes_remaining", "Minutes remaining", &self.minutes_remaining, r#"type="number" min="0" max="12""#),
            input("period", "Period", &self.period, r#"type="number" min="1" max="4""#),
            if playoffs_yes { "" } else { " selected" },
            if playoffs_yes { " selected" } else { "" },
            input("shot_distance", "Shot distance (ft)", &self.shot_distance, r#"type="number" min="0" max="50""#),
        )
    }
}

/// Outcome of a single live prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotPrediction {
    pub made: bool,
    pub probability: f64,
}

/// Path of the classifier used by the live form
pub fn live_model_path(models_dir: &Path) -> std::path::PathBuf {
    models_dir.join(model_file_name(Algorithm::DecisionTreeClassifier, TaskType::Classification))
}

/// Score one shot with the saved decision tree
pub fn predict_shot(model_path: &Path, form: &ShotForm) -> Result<ShotPrediction> {
    let features = form.features()?;
    let model = TrainedModel::load(model_path)?;
    let x = Array2::from_shape_vec((1, FEATURE_COLUMNS.len()), features.to_vec())?;

    let label = model.predict(&x)?;
    let proba = model.predict_proba(&x)?;
    Ok(ShotPrediction {
        made: label[0] == 1.0,
        probability: proba[0],
    })
}

fn render_prediction(prediction: Option<&Result<ShotPrediction>>) -> String {
    match prediction {
        None => String::new(),
        Some(Ok(p)) => format!(
            r#"<div class="prediction {}"><strong>{}</strong> (probability of a made shot: {:.1}%)</div>"#,
            if p.made { "made" } else { "missed" },
            if p.made { "Made" } else { "Missed" },
            p.probability * 100.0
        ),
        Some(Err(e)) => format!(
            r#"<div class="prediction error-message">Prediction failed: {}</div>"#,
            escape_html(&e.to_string())
        ),
    }
}

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 2em; background: #f5f5f5; color: #222; }
.card { background: white; border-radius: 8px; padding: 1.5em; margin: 1em 0; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
.card.error { border-left: 4px solid #c0392b; }
.error-message { color: #c0392b; }
h1 { color: #552583; } h2 { color: #444; margin-top: 0; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 1em; align-items: end; }
.tile .label { color: #666; font-size: 0.9em; }
.metric { font-size: 1.8em; font-weight: bold; color: #552583; }
.scroll { max-height: 280px; overflow-y: auto; }
table { border-collapse: collapse; } td, th { padding: 0.25em 0.75em; border-bottom: 1px solid #eee; text-align: right; }
label { display: flex; flex-direction: column; font-size: 0.9em; }
.prediction { margin-top: 1em; font-size: 1.2em; }
.prediction.made { color: #1e8449; } .prediction.missed { color: #c0392b; }
"#;

/// Full dashboard page; artifacts are read fresh on every call
pub fn render_dashboard(
    config: &DashboardConfig,
    form: &ShotForm,
    prediction: Option<&Result<ShotPrediction>>,
) -> String {
    let classification = ClassificationSection::load(&config.classification_predictions())
        .map(|s| s.render(config.preview_rows));
    let regression =
        RegressionSection::load(&config.regression_predictions()).map(|s| s.render(config.preview_rows));
    let live = Ok(format!("{}{}", form.render(), render_prediction(prediction)));

    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Kobe Bryant shot prediction</title><style>{}</style></head><body>
<h1>Kobe Bryant shot prediction</h1>
{}
{}
{}
</body></html>"#,
        STYLE,
        render_section("Classification: DecisionTreeClassifier", classification),
        render_section("Regression", regression),
        render_section("Live prediction", live),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"a\" & 'b'</b>"), "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_render_section_error_card() {
        let html = render_section("Regression", Err(PipelineError::schema("column 'real' <missing>")));
        assert!(html.contains("card error"));
        assert!(html.contains("&lt;missing&gt;"));
    }

    #[test]
    fn test_form_defaults_parse() {
        let features = ShotForm::default().features().unwrap();
        assert_eq!(features, [33.0, -118.0, 6.0, 1.0, 0.0, 15.0]);
    }

    #[test]
    fn test_form_rejects_out_of_range() {
        let form = ShotForm {
            period: "5".to_string(),
            ..ShotForm::default()
        };
        assert!(matches!(form.features(), Err(PipelineError::Value(_))));

        let form = ShotForm {
            shot_distance: "far".to_string(),
            ..ShotForm::default()
        };
        assert!(form.features().is_err());
    }

    #[test]
    fn test_missing_model_is_reported() {
        let err = predict_shot(Path::new("/nonexistent/model.json"), &ShotForm::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
        let html = render_prediction(Some(&Err(err)));
        assert!(html.contains("Prediction failed"));
    }
}
