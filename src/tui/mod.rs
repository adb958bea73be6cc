//! Ratatui-based terminal UI.
//!
//! Settings panel for the outlier multiplier, the highest polynomial degree,
//! the number of kept regimes and (on synthetic data) the sample size. Every
//! change refits immediately; the chart shows each kept regime in its own
//! color next to its JD table.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::pipeline::{LoadedObservations, ObservationSource, PipelineOutput, load_observations, run_pipeline};
use crate::app::{pipeline_config_from_args, sample_spec_from_args, source_from_args};
use crate::cli::TuiArgs;
use crate::domain::PipelineConfig;
use crate::error::AppError;
use crate::models::{MAX_DEGREE, MIN_DEGREE};

mod plotters_chart;

use plotters_chart::{ChartRegime, REGIME_COLORS, RegimePlottersChart};

const OUTLIER_K_STEP: f64 = 0.25;
const OUTLIER_K_MAX: f64 = 5.0;
const COUNT_STEP: usize = 10;

/// Start the TUI.
pub fn run(args: TuiArgs) -> Result<(), AppError> {
    // Load everything before touching the terminal so errors print normally.
    let mut app = App::new(args)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    OutlierK,
    MaxDegree,
    Keep,
    Count,
}

struct App {
    source: ObservationSource,
    loaded: LoadedObservations,
    config: PipelineConfig,
    player: String,
    out_dir: PathBuf,
    selected_field: usize,
    status: String,
    output: Option<PipelineOutput>,
}

impl App {
    fn new(args: TuiArgs) -> Result<Self, AppError> {
        let config = pipeline_config_from_args(&args.pipeline)?;
        let source = source_from_args(&args.input)
            .unwrap_or_else(|| ObservationSource::Sample(sample_spec_from_args(&args.sample)));
        let loaded = load_observations(&source)?;

        let mut app = Self {
            source,
            loaded,
            config,
            player: args.player,
            out_dir: args.out_dir,
            selected_field: 0,
            status: String::new(),
            output: None,
        };
        app.refit();
        Ok(app)
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::OutlierK, Field::MaxDegree, Field::Keep];
        if matches!(self.source, ObservationSource::Sample(_)) {
            fields.push(Field::Count);
        }
        fields
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < self.fields().len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1)?,
            KeyCode::Right => self.adjust_field(1)?,
            KeyCode::Char('r') => self.reseed()?,
            KeyCode::Char('w') => self.write_tables(),
            _ => {}
        }
        Ok(false)
    }

    fn adjust_field(&mut self, delta: i32) -> Result<(), AppError> {
        let Some(field) = self.fields().get(self.selected_field).copied() else {
            return Ok(());
        };
        match field {
            Field::OutlierK => {
                self.config.outlier_k = step_outlier_k(self.config.outlier_k, delta);
            }
            Field::MaxDegree => {
                self.config.fit.max_degree = step_clamped(self.config.fit.max_degree, delta, 1, MIN_DEGREE, MAX_DEGREE);
            }
            Field::Keep => {
                self.config.selection.keep =
                    step_clamped(self.config.selection.keep, delta, 1, 1, self.config.selection.max_regimes);
            }
            Field::Count => {
                if let ObservationSource::Sample(spec) = &mut self.source {
                    spec.count = step_clamped(spec.count, delta, COUNT_STEP, COUNT_STEP, 10_000);
                    self.loaded = load_observations(&self.source)?;
                }
            }
        }
        self.refit();
        Ok(())
    }

    fn reseed(&mut self) -> Result<(), AppError> {
        let ObservationSource::Sample(spec) = &mut self.source else {
            self.status = "Reseeding only applies to synthetic data.".to_string();
            return Ok(());
        };
        spec.seed = spec.seed.wrapping_add(1);
        self.loaded = load_observations(&self.source)?;
        self.refit();
        Ok(())
    }

    fn write_tables(&mut self) {
        let Some(output) = &self.output else {
            self.status = "Nothing to write.".to_string();
            return;
        };
        self.status = match crate::io::write_tables(&self.out_dir, &self.player, &output.selected) {
            Ok(paths) => format!("Wrote {} table(s) to {}", paths.len(), self.out_dir.display()),
            Err(err) => format!("Write failed: {err}"),
        };
    }

    /// Rerun the pipeline; failures are shown, not fatal.
    fn refit(&mut self) {
        match run_pipeline(&self.loaded.observations, &self.config) {
            Ok(output) => {
                self.status = format!(
                    "{} regime(s) kept, {} skipped",
                    output.selected.len(),
                    output.skipped.len()
                );
                self.output = Some(output);
            }
            Err(err) => {
                self.status = format!("Fit failed: {err}");
                self.output = None;
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("jd", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" NJS/JD regimes | {}", self.loaded.label)),
        ]));

        let gray = Style::default().fg(Color::Gray);
        match &self.output {
            Some(out) => {
                lines.push(Line::from(Span::styled(
                    format!(
                        "n={} | outliers removed={} | k-means: {} iteration(s){}",
                        out.input_count,
                        out.removed_outliers(),
                        out.clustering.iterations,
                        if out.clustering.converged { "" } else { " (not converged)" },
                    ),
                    gray,
                )));
                let spans: Vec<Span> = out
                    .selected
                    .iter()
                    .enumerate()
                    .map(|(i, s)| {
                        Span::styled(
                            format!(
                                "#{} deg {} R²={:.4}  ",
                                s.rank, s.regime.model.degree, s.regime.model.r_squared
                            ),
                            Style::default().fg(regime_color(i)),
                        )
                    })
                    .collect();
                lines.push(Line::from(spans));
            }
            None => {
                lines.push(Line::from(Span::styled(
                    format!("n={} | no usable fit", self.loaded.observations.len()),
                    gray,
                )));
            }
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(7)])
            .split(area);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(34)])
            .split(rows[0]);

        self.draw_chart(frame, cols[0]);
        self.draw_tables(frame, cols[1]);
        self.draw_settings(frame, rows[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Regimes").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(out) = &self.output else {
            let msg = Paragraph::new("No regime to show.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let series = chart_series(out, &self.loaded);
        let regimes: Vec<ChartRegime> = series
            .regimes
            .iter()
            .map(|(points, curve)| ChartRegime { points, curve })
            .collect();

        let (chart_rect, insets) = chart_layout(inner);
        let widget = RegimePlottersChart {
            regimes: &regimes,
            others: &series.others,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, series.x_bounds, series.y_bounds);
        }
    }

    fn draw_tables(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let text = self
            .output
            .as_ref()
            .map(|out| crate::report::format_tables(&out.selected))
            .unwrap_or_default();
        let p = Paragraph::new(text)
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().title("JD tables").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut items = Vec::new();
        for field in self.fields() {
            let label = match field {
                Field::OutlierK => format!("Outlier k: {:.2}", self.config.outlier_k),
                Field::MaxDegree => format!("Max degree: {}", self.config.fit.max_degree),
                Field::Keep => format!("Keep: {}", self.config.selection.keep),
                Field::Count => match &self.source {
                    ObservationSource::Sample(spec) => format!("Count: {} (seed {})", spec.count, spec.seed),
                    _ => "Count: -".to_string(),
                },
            };
            items.push(ListItem::new(label));
        }

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  r reseed  w write tables  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn regime_color(i: usize) -> Color {
    let c = REGIME_COLORS[i % REGIME_COLORS.len()];
    Color::Rgb(c.0, c.1, c.2)
}

/// Next outlier multiplier: `OUTLIER_K_STEP` increments in
/// `[OUTLIER_K_STEP, OUTLIER_K_MAX]`; a non-finite value snaps back into range.
fn step_outlier_k(current: f64, delta: i32) -> f64 {
    let base = if current.is_finite() {
        current
    } else {
        OUTLIER_K_MAX
    };
    (base + delta as f64 * OUTLIER_K_STEP).clamp(OUTLIER_K_STEP, OUTLIER_K_MAX)
}

fn step_clamped(current: usize, delta: i32, step: usize, min: usize, max: usize) -> usize {
    let next = if delta >= 0 {
        current.saturating_add(step)
    } else {
        current.saturating_sub(step)
    };
    next.clamp(min, max.max(min))
}

/// Chart-ready coordinates for one pipeline output.
struct ChartSeries {
    /// `(points, curve)` per kept regime, in rank order.
    regimes: Vec<(Vec<(f64, f64)>, Vec<(f64, f64)>)>,
    others: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_series(out: &PipelineOutput, loaded: &LoadedObservations) -> ChartSeries {
    let regimes: Vec<(Vec<(f64, f64)>, Vec<(f64, f64)>)> = out
        .selected
        .iter()
        .map(|s| {
            (
                s.regime.observations.iter().map(|o| (o.njs, o.jd)).collect(),
                s.curve.iter().map(|p| (p.njs, p.jd)).collect(),
            )
        })
        .collect();

    // Outliers plus members of clusters that were skipped or ranked out.
    let kept: Vec<usize> = out.selected.iter().map(|s| s.regime.cluster).collect();
    let mut others: Vec<(f64, f64)> = loaded
        .observations
        .iter()
        .filter(|o| o.is_finite())
        .filter(|o| out.fences.is_some_and(|f| !f.contains(o.jd)))
        .map(|o| (o.njs, o.jd))
        .collect();
    for cluster in &out.clustering.clusters {
        if !kept.contains(&cluster.index) {
            others.extend(cluster.members.iter().map(|o| (o.njs, o.jd)));
        }
    }

    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let all = regimes
        .iter()
        .flat_map(|(p, c)| p.iter().chain(c.iter()))
        .chain(others.iter());
    for &(x, y) in all {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    if !x_min.is_finite() || !x_max.is_finite() || x_max <= x_min {
        x_min = 8.0;
        x_max = 26.0;
    }
    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        y_min = 0.0;
        y_max = 30.0;
    }

    let x_pad = (x_max - x_min) * 0.03;
    let y_pad = (y_max - y_min) * 0.05;

    ChartSeries {
        regimes,
        others,
        x_bounds: [x_min - x_pad, x_max + x_pad],
        y_bounds: [y_min - y_pad, y_max + y_pad],
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = format!("{x_val:.1}");
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.1}");
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("NJS")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("JD").style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SampleSpec;

    #[test]
    fn outlier_k_steps_stay_in_range() {
        assert_eq!(step_outlier_k(1.5, 1), 1.75);
        assert_eq!(step_outlier_k(0.25, -1), 0.25);
        assert_eq!(step_outlier_k(5.0, 1), 5.0);
        assert_eq!(step_outlier_k(f64::INFINITY, -1), 4.75);
    }

    #[test]
    fn clamped_steps_respect_bounds() {
        assert_eq!(step_clamped(4, 1, 1, 1, 4), 4);
        assert_eq!(step_clamped(1, -1, 1, 1, 4), 1);
        assert_eq!(step_clamped(20, -1, 10, 10, 100), 10);
    }

    #[test]
    fn chart_series_covers_every_kept_regime() {
        let source = ObservationSource::Sample(SampleSpec::default());
        let loaded = load_observations(&source).unwrap();
        let out = run_pipeline(&loaded.observations, &PipelineConfig::default()).unwrap();

        let series = chart_series(&out, &loaded);
        assert_eq!(series.regimes.len(), out.selected.len());
        assert!(series.x_bounds[0] < series.x_bounds[1]);
        assert!(series.y_bounds[0] < series.y_bounds[1]);

        let shown: usize = series.regimes.iter().map(|(p, _)| p.len()).sum::<usize>() + series.others.len();
        assert_eq!(shown, loaded.observations.len());
    }
}
