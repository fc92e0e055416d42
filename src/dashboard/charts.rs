//! Inline SVG charts

use std::fmt::Write;

const WIDTH: f64 = 520.0;
const HEIGHT: f64 = 260.0;
const MARGIN: f64 = 36.0;

/// Equal-width bin counts over `[min, max]`; a constant series is widened by 0.5 each side.
pub fn histogram_counts(values: &[f64], bins: usize) -> (f64, f64, Vec<usize>) {
    let bins = bins.max(1);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return (0.0, 1.0, vec![0; bins]);
    }

    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0; bins];
    for v in finite {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    (lo, hi, counts)
}

fn frame(svg: &mut String, x_label: &str, y_label: &str) {
    let _ = write!(
        svg,
        r##"<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="#888"/><line x1="{m}" y1="{t}" x2="{m}" y2="{b}" stroke="#888"/><text x="{cx}" y="{ly}" font-size="11" text-anchor="middle">{x_label}</text><text x="10" y="{cy}" font-size="11" text-anchor="middle" transform="rotate(-90 10 {cy})">{y_label}</text>"##,
        m = MARGIN,
        t = MARGIN / 2.0,
        b = HEIGHT - MARGIN,
        r = WIDTH - MARGIN / 2.0,
        cx = WIDTH / 2.0,
        ly = HEIGHT - 6.0,
        cy = HEIGHT / 2.0,
    );
}

/// Histogram of `values` with `bins` bars
pub fn histogram_svg(values: &[f64], bins: usize, x_label: &str) -> String {
    let (lo, hi, counts) = histogram_counts(values, bins);
    let peak = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let plot_w = WIDTH - MARGIN * 1.5;
    let plot_h = HEIGHT - MARGIN * 1.5;
    let bar_w = plot_w / counts.len() as f64;

    let mut svg = format!(
        r#"<svg class="chart" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        WIDTH, HEIGHT, WIDTH, HEIGHT
    );
    for (i, &count) in counts.iter().enumerate() {
        let h = plot_h * count as f64 / peak;
        let _ = write!(
            svg,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#552583"><title>{}</title></rect>"##,
            MARGIN + i as f64 * bar_w + 1.0,
            HEIGHT - MARGIN - h,
            (bar_w - 2.0).max(1.0),
            h,
            count
        );
    }
    let _ = write!(
        svg,
        r#"<text x="{m}" y="{y}" font-size="10">{lo:.3}</text><text x="{r}" y="{y}" font-size="10" text-anchor="end">{hi:.3}</text>"#,
        m = MARGIN,
        r = WIDTH - MARGIN / 2.0,
        y = HEIGHT - MARGIN + 12.0,
    );
    frame(&mut svg, x_label, "count");
    svg.push_str("</svg>");
    svg
}

/// Scatter of `x` against `y` with the identity line
pub fn scatter_svg(x: &[f64], y: &[f64], x_label: &str, y_label: &str) -> String {
    let points: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();

    let (mut lo, mut hi) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(a, b)| {
            (lo.min(a).min(b), hi.max(a).max(b))
        });
    if points.is_empty() {
        lo = 0.0;
        hi = 1.0;
    } else if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let plot_w = WIDTH - MARGIN * 1.5;
    let plot_h = HEIGHT - MARGIN * 1.5;
    let sx = |v: f64| MARGIN + (v - lo) / (hi - lo) * plot_w;
    let sy = |v: f64| HEIGHT - MARGIN - (v - lo) / (hi - lo) * plot_h;

    let mut svg = format!(
        r#"<svg class="chart" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        WIDTH, HEIGHT, WIDTH, HEIGHT
    );
    let _ = write!(
        svg,
        r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#FDB927" stroke-dasharray="4"/>"##,
        sx(lo),
        sy(lo),
        sx(hi),
        sy(hi)
    );
    for (a, b) in &points {
        let _ = write!(
            svg,
            r##"<circle cx="{:.1}" cy="{:.1}" r="3" fill="#552583" fill-opacity="0.5"/>"##,
            sx(*a),
            sy(*b)
        );
    }
    frame(&mut svg, x_label, y_label);
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_counts() {
        let values = [0.0, 0.1, 0.5, 0.9, 1.0];
        let (lo, hi, counts) = histogram_counts(&values, 20);
        assert_eq!((lo, hi), (0.0, 1.0));
        assert_eq!(counts.len(), 20);
        assert_eq!(counts.iter().sum::<usize>(), 5);
        assert_eq!(counts[19], 1);
    }

    #[test]
    fn test_constant_series() {
        let (lo, hi, counts) = histogram_counts(&[0.1, 0.1], 20);
        assert!(lo < 0.1 && hi > 0.1);
        assert_eq!(counts.iter().sum::<usize>(), 2);
    }

    #[test]
    fn test_svg_output() {
        let svg = histogram_svg(&[0.2, 0.4], 20, "prediction_score");
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<rect").count(), 20);

        let svg = scatter_svg(&[1.1, 0.1], &[0.9, 0.3], "real", "prediction");
        assert_eq!(svg.matches("<circle").count(), 2);
    }
}
