//! Plotters-powered regime chart widget for Ratatui.
//!
//! Plotters output is rendered into the Ratatui buffer through
//! `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Line/dot colors per regime rank, high contrast on dark terminals.
pub const REGIME_COLORS: [RGBColor; 4] = [
    RGBColor(0, 255, 255),
    RGBColor(255, 0, 255),
    RGBColor(255, 255, 0),
    RGBColor(0, 255, 0),
];

/// One regime as drawn by the widget.
pub struct ChartRegime<'a> {
    pub points: &'a [(f64, f64)],
    pub curve: &'a [(f64, f64)],
}

/// A render-only chart description. All series and bounds are computed
/// outside the render call.
pub struct RegimePlottersChart<'a> {
    pub regimes: &'a [ChartRegime<'a>],
    /// Observations that belong to no kept regime (outliers, skipped clusters).
    pub others: &'a [(f64, f64)],
    /// X bounds (NJS).
    pub x_bounds: [f64; 2],
    /// Y bounds (JD).
    pub y_bounds: [f64; 2],
}

impl<'a> Widget for RegimePlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Mesh lines are clutter at terminal resolution.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc("NJS")
                .y_desc("JD")
                .x_labels(5)
                .y_labels(5)
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let muted = RGBColor(110, 110, 110);
            chart.draw_series(self.others.iter().map(|&(x, y)| Pixel::new((x, y), muted)))?;

            for (i, regime) in self.regimes.iter().enumerate() {
                let color = REGIME_COLORS[i % REGIME_COLORS.len()];
                chart.draw_series(LineSeries::new(regime.curve.iter().copied(), &color))?;
                // `Circle` radii are mis-scaled by the ratatui backend; pixels
                // render as clean dots.
                chart.draw_series(regime.points.iter().map(|&(x, y)| Pixel::new((x, y), color)))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
