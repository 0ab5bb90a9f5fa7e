// ============================================================
// Layer 6 - Diagnostic Plots
// ============================================================
// PNG charts drawn with plotters:
//
//   loss.png           train vs validation loss per epoch
//   accuracy.png       train vs validation accuracy per epoch
//   spectra.png        a few spectra with and without the target
//   elements.png       how many samples contain each element
//   class_balance.png  positive vs negative counts
//
// Reading the curves: a validation loss that turns upward while
// the training loss keeps falling is the overfitting signature.

use std::{error::Error, path::Path};

use anyhow::{bail, Result};
use plotters::prelude::*;

use crate::domain::sample::Sample;
use crate::infra::metrics::EpochMetrics;

const SIZE: (u32, u32) = (900, 540);

type DrawResult = std::result::Result<(), Box<dyn Error>>;

/// One named line on a chart
struct Series {
    label:  String,
    color:  RGBColor,
    points: Vec<(f64, f64)>,
}

pub fn plot_loss_curves(history: &[EpochMetrics], path: &Path) -> Result<()> {
    let series = vec![
        Series {
            label:  "training loss".into(),
            color:  BLUE,
            points: history.iter().map(|m| (m.epoch as f64, m.train_loss)).collect(),
        },
        Series {
            label:  "validation loss".into(),
            color:  RED,
            points: history
                .iter()
                .filter_map(|m| m.val_loss.map(|v| (m.epoch as f64, v)))
                .collect(),
        },
    ];
    draw_lines("Loss", "Epoch", "Binary cross-entropy", series, path)
}

pub fn plot_accuracy_curves(history: &[EpochMetrics], path: &Path) -> Result<()> {
    let series = vec![
        Series {
            label:  "training accuracy".into(),
            color:  BLUE,
            points: history.iter().map(|m| (m.epoch as f64, m.train_acc)).collect(),
        },
        Series {
            label:  "validation accuracy".into(),
            color:  RED,
            points: history
                .iter()
                .filter_map(|m| m.val_acc.map(|v| (m.epoch as f64, v)))
                .collect(),
        },
    ];
    draw_lines("Accuracy", "Epoch", "Accuracy", series, path)
}

/// Overlay up to `per_class` spectra containing `element` and as many
/// without it, plotted against the bin index.
pub fn plot_spectra(samples: &[Sample], element: &str, per_class: usize, path: &Path) -> Result<()> {
    let with: Vec<&Sample> = samples.iter().filter(|s| s.contains(element)).take(per_class).collect();
    let without: Vec<&Sample> = samples.iter().filter(|s| !s.contains(element)).take(per_class).collect();

    let to_points = |s: &Sample| -> Vec<(f64, f64)> {
        s.spectrum.iter().enumerate().map(|(i, &v)| (i as f64, v)).collect()
    };

    let mut series = Vec::with_capacity(with.len() + without.len());
    for (i, s) in with.iter().enumerate() {
        series.push(Series {
            // Only the first line of each class gets a legend entry
            label:  if i == 0 { format!("with {element}") } else { String::new() },
            color:  RED,
            points: to_points(s),
        });
    }
    for (i, s) in without.iter().enumerate() {
        series.push(Series {
            label:  if i == 0 { format!("without {element}") } else { String::new() },
            color:  BLUE,
            points: to_points(s),
        });
    }
    draw_lines("Example spectra", "Bin", "Intensity", series, path)
}

/// Vertical bar chart, one bar per (label, count)
pub fn plot_bar_chart(title: &str, bars: &[(String, usize)], path: &Path) -> Result<()> {
    if bars.is_empty() {
        bail!("Nothing to plot for '{title}'");
    }
    draw_bars(title, bars, path).map_err(|e| anyhow::anyhow!("Drawing '{}': {e}", path.display()))
}

fn draw_lines(title: &str, x_desc: &str, y_desc: &str, series: Vec<Series>, path: &Path) -> Result<()> {
    let all: Vec<(f64, f64)> = series
        .iter()
        .flat_map(|s| s.points.iter().copied())
        .filter(|(_, y)| y.is_finite())
        .collect();
    if all.is_empty() {
        bail!("Nothing to plot for '{title}'");
    }
    render_lines(title, x_desc, y_desc, &series, &all, path)
        .map_err(|e| anyhow::anyhow!("Drawing '{}': {e}", path.display()))
}

fn render_lines(
    title:  &str,
    x_desc: &str,
    y_desc: &str,
    series: &[Series],
    all:    &[(f64, f64)],
    path:   &Path,
) -> DrawResult {
    let (x_min, x_max) = bounds(all.iter().map(|p| p.0));
    let (y_min, y_max) = bounds(all.iter().map(|p| p.1));

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart.configure_mesh().x_desc(x_desc).y_desc(y_desc).draw()?;

    for s in series {
        let points = s.points.iter().copied().filter(|(_, y)| y.is_finite());
        let drawn  = chart.draw_series(LineSeries::new(points, &s.color))?;
        if !s.label.is_empty() {
            let color = s.color;
            drawn
                .label(s.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_bars(title: &str, bars: &[(String, usize)], path: &Path) -> DrawResult {
    let max = bars.iter().map(|b| b.1).max().unwrap_or(0).max(1) as f64;

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..bars.len() as f64, 0f64..max * 1.1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&|x| {
            let i = x.floor() as usize;
            bars.get(i).map(|b| b.0.clone()).unwrap_or_default()
        })
        .y_desc("Samples")
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, n))| {
        let x = i as f64;
        Rectangle::new([(x + 0.1, 0.0), (x + 0.9, *n as f64)], BLUE.filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Min/max of finite values, widened when flat so the axis range
/// is never empty.
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }
}
