//! SVG chart export.
//!
//! One scatter series and one fitted line per regime, with an R² legend.

use std::path::Path;

use plotters::prelude::*;

use crate::error::AppError;
use crate::plot::{PLOT_TITLE, RegimeSeries, bounds, pad_range};

/// Write the regime chart to `path` as an SVG document.
pub fn write_regime_svg(path: &Path, series: &[RegimeSeries], width: u32, height: u32) -> Result<(), AppError> {
    let (x_min, x_max, y_min, y_max) =
        bounds(series).ok_or_else(|| AppError::new(3, "Nothing to plot: no regime has finite data."))?;

    draw(path, series, (x_min, x_max), (y_min, y_max), (width, height))
        .map_err(|e| AppError::new(2, format!("Failed to write SVG plot '{}': {e}", path.display())))
}

fn draw(
    path: &Path,
    series: &[RegimeSeries],
    xr: (f64, f64),
    yr: (f64, f64),
    size: (u32, u32),
) -> Result<(), Box<dyn std::error::Error>> {
    let (x0, x1) = pad_range(xr.0, xr.1, 0.03);
    let (y0, y1) = pad_range(yr.0, yr.1, 0.05);

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(PLOT_TITLE, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart.configure_mesh().x_desc("NJS").y_desc("JD").draw()?;

    for (i, s) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();

        chart.draw_series(
            s.points
                .iter()
                .filter(|o| o.is_finite())
                .map(|o| Circle::new((o.njs, o.jd), 3, color.mix(0.6).filled())),
        )?;
        chart
            .draw_series(LineSeries::new(
                s.curve.iter().map(|p| (p.njs, p.jd)),
                color.stroke_width(2),
            ))?
            .label(s.legend())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
