//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic output (golden tests rely on it).
//!
//! Each regime gets its own glyph pair: points `o x + #`, curves `- = ~ :`.
//! Curves are drawn first so observations overlay them.

use crate::plot::{RegimeSeries, bounds, pad_range};

const POINT_GLYPHS: [char; 4] = ['o', 'x', '+', '#'];
const CURVE_GLYPHS: [char; 4] = ['-', '=', '~', ':'];

/// Render every regime into a `width × height` grid plus header and legend.
pub fn render_regime_plot(series: &[RegimeSeries], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((x_min, x_max, y_min, y_max)) = bounds(series) else {
        return "Plot: nothing to draw\n".to_string();
    };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    for (i, s) in series.iter().enumerate() {
        let ch = CURVE_GLYPHS[i % CURVE_GLYPHS.len()];
        let pts: Vec<(f64, f64)> = s.curve.iter().map(|p| (p.njs, p.jd)).collect();
        draw_curve(&mut grid, &pts, (x_min, x_max), (y_min, y_max), ch);
    }
    for (i, s) in series.iter().enumerate() {
        let ch = POINT_GLYPHS[i % POINT_GLYPHS.len()];
        for o in s.points.iter().filter(|o| o.is_finite()) {
            let x = map_x(o.njs, x_min, x_max, width);
            let y = map_y(o.jd, y_min, y_max, height);
            grid[y][x] = ch;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: njs=[{x_min:.2}, {x_max:.2}] | jd=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    for (i, s) in series.iter().enumerate() {
        out.push_str(&format!(
            "{} {} {} (degree {})\n",
            POINT_GLYPHS[i % POINT_GLYPHS.len()],
            CURVE_GLYPHS[i % CURVE_GLYPHS.len()],
            s.legend(),
            s.degree,
        ));
    }
    out
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top (largest jd).
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], xr: (f64, f64), yr: (f64, f64), ch: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let cx = map_x(x, xr.0, xr.1, width);
        let cy = map_y(y, yr.0, yr.1, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, cx, cy, ch),
            None => {
                if grid[cy][cx] == ' ' {
                    grid[cy][cx] = ch;
                }
            }
        }
        prev = Some((cx, cy));
    }
}

/// Integer line drawing (Bresenham). Never overwrites a non-blank cell.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurvePoint, Observation};

    fn series(rank: usize, points: Vec<Observation>, curve: Vec<CurvePoint>) -> RegimeSeries {
        RegimeSeries {
            rank,
            cluster: rank - 1,
            degree: 1,
            r_squared: 1.0,
            points,
            curve,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let s = series(
            1,
            vec![Observation::new(10.0, 20.0), Observation::new(20.0, 22.0)],
            vec![
                CurvePoint { njs: 10.0, jd: 20.0 },
                CurvePoint { njs: 20.0, jd: 20.0 },
            ],
        );

        let txt = render_regime_plot(&[s], 10, 5);
        let expected = concat!(
            "Plot: njs=[10.00, 20.00] | jd=[19.90, 22.10]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
            "o - Cluster 1 (R² = 1.0000) (degree 1)\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn second_regime_uses_its_own_glyphs() {
        let a = series(1, vec![Observation::new(10.0, 20.0)], Vec::new());
        let b = series(2, vec![Observation::new(20.0, 10.0)], Vec::new());
        let txt = render_regime_plot(&[a, b], 12, 6);
        let lines: Vec<&str> = txt.lines().collect();

        assert!(lines[1].starts_with('o'), "{txt}");
        assert!(lines[6].ends_with('x'), "{txt}");
        assert!(txt.contains("x = Cluster 2"), "{txt}");
    }

    #[test]
    fn empty_input_says_so() {
        assert_eq!(render_regime_plot(&[], 40, 10), "Plot: nothing to draw\n");
    }
}
