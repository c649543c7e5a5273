use crate::runtime::error::{RuntimeError, RuntimeResult};
use std::collections::HashSet;

const DEFAULT_WIDTH: usize = 50;
const DEFAULT_HEIGHT: usize = 15;
const MARKER_CYCLE: [char; 6] = ['*', 'o', '#', '@', 'x', '+'];

#[derive(Clone, Debug)]
struct Series {
    xs: Vec<f64>,
    ys: Vec<f64>,
    marker: char,
    line: bool,
    label: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Figure {
    width: usize,
    height: usize,
    series: Vec<Series>,
    title: Option<String>,
    xlabel: Option<String>,
    ylabel: Option<String>,
}

impl Figure {
    fn new(width: usize, height: usize) -> Self {
        Self {
            // A grid needs at least one row and column to carry its axes.
            width: width.max(1),
            height: height.max(1),
            series: Vec::new(),
            title: None,
            xlabel: None,
            ylabel: None,
        }
    }
}

/// ASCII plotting surface. One figure is current at a time; drawing calls
/// create a default-sized figure on demand.
#[derive(Clone, Debug, Default)]
pub struct PlotCanvas {
    current: Option<Figure>,
}

impl PlotCanvas {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn figure(&mut self, width: usize, height: usize) {
        self.current = Some(Figure::new(width, height));
    }

    fn figure_mut(&mut self) -> &mut Figure {
        self.current
            .get_or_insert_with(|| Figure::new(DEFAULT_WIDTH, DEFAULT_HEIGHT))
    }

    fn add_series(
        &mut self,
        xs: Vec<f64>,
        ys: Vec<f64>,
        marker: char,
        line: bool,
        label: Option<String>,
    ) -> RuntimeResult<()> {
        if xs.len() != ys.len() {
            return Err(RuntimeError::DimensionMismatch {
                message: "xs and ys must have the same length".into(),
            });
        }
        self.figure_mut().series.push(Series {
            xs,
            ys,
            marker,
            line,
            label,
        });
        Ok(())
    }

    pub fn plot(&mut self, xs: Vec<f64>, ys: Vec<f64>, label: Option<String>) -> RuntimeResult<()> {
        self.add_series(xs, ys, '*', true, label)
    }

    pub fn scatter(
        &mut self,
        xs: Vec<f64>,
        ys: Vec<f64>,
        label: Option<String>,
    ) -> RuntimeResult<()> {
        self.add_series(xs, ys, 'o', false, label)
    }

    pub fn set_title(&mut self, text: impl Into<String>) {
        self.figure_mut().title = Some(text.into());
    }

    pub fn set_xlabel(&mut self, text: impl Into<String>) {
        self.figure_mut().xlabel = Some(text.into());
    }

    pub fn set_ylabel(&mut self, text: impl Into<String>) {
        self.figure_mut().ylabel = Some(text.into());
    }

    pub fn clf(&mut self) {
        if let Some(figure) = &mut self.current {
            figure.series.clear();
            figure.title = None;
            figure.xlabel = None;
            figure.ylabel = None;
        }
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    pub fn render(&self) -> String {
        let figure = match &self.current {
            Some(figure) if !figure.series.is_empty() => figure,
            _ => return "(empty plot)\n".to_string(),
        };

        let mut all_xs: Vec<f64> = Vec::new();
        let mut all_ys: Vec<f64> = Vec::new();
        for series in &figure.series {
            all_xs.extend(&series.xs);
            all_ys.extend(&series.ys);
        }
        if all_xs.is_empty() {
            return "(empty plot)\n".to_string();
        }

        let mut min_x = all_xs.iter().cloned().fold(f64::INFINITY, f64::min);
        let mut max_x = all_xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut min_y = all_ys.iter().cloned().fold(f64::INFINITY, f64::min);
        let mut max_y = all_ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        // Degenerate ranges would divide by zero when mapping to cells.
        if min_x == max_x {
            min_x -= 1.0;
            max_x += 1.0;
        }
        if min_y == max_y {
            min_y -= 1.0;
            max_y += 1.0;
        }

        let rows = figure.height;
        let cols = figure.width;
        let mut grid = vec![vec![' '; cols]; rows];

        let x_to_col =
            |x: f64| -> usize { ((x - min_x) / (max_x - min_x) * (cols - 1) as f64) as usize };
        let y_to_row = |y: f64| -> usize {
            let pos = (y - min_y) / (max_y - min_y) * (rows - 1) as f64;
            rows - 1 - pos as usize
        };

        let x_axis_row = if min_y <= 0.0 && 0.0 <= max_y {
            y_to_row(0.0)
        } else {
            rows - 1
        };
        for cell in &mut grid[x_axis_row] {
            *cell = '-';
        }

        let y_axis_col = if min_x <= 0.0 && 0.0 <= max_x {
            x_to_col(0.0)
        } else {
            0
        };
        for row in &mut grid {
            row[y_axis_col] = '|';
        }
        grid[x_axis_row][y_axis_col] = '+';

        for (idx, series) in figure.series.iter().enumerate() {
            let marker = effective_marker(figure, idx, series.marker);

            let points: Vec<(usize, usize)> = series
                .xs
                .iter()
                .zip(&series.ys)
                .map(|(x, y)| (x_to_col(*x), y_to_row(*y)))
                .filter(|(c, r)| *c < cols && *r < rows)
                .collect();
            let point_set: HashSet<(usize, usize)> = points.iter().cloned().collect();

            if series.line && points.len() > 1 {
                for pair in points.windows(2) {
                    draw_segment(&mut grid, pair[0], pair[1], marker, &point_set);
                }
            }

            for (c, r) in &points {
                grid[*r][*c] = marker;
            }
        }

        let mut out = String::new();

        if let Some(title) = &figure.title {
            out.push('\n');
            let padding = cols.saturating_sub(title.len()) / 2;
            out.push_str(&" ".repeat(6 + padding));
            out.push_str(title);
            out.push('\n');
        }
        out.push('\n');

        if let Some(ylabel) = &figure.ylabel {
            out.push_str(ylabel);
            out.push('\n');
        }

        let label_positions = [0, rows / 2, rows - 1];
        let label_values = [max_y, (max_y + min_y) / 2.0, min_y];
        for (r, row) in grid.iter().enumerate() {
            let label = match label_positions.iter().position(|pos| *pos == r) {
                Some(idx) => format!("{:5.2}", label_values[idx]),
                None => " ".repeat(5),
            };
            out.push_str(&label);
            out.push(' ');
            out.extend(row.iter());
            out.push('\n');
        }

        let mut x_labels = vec![' '; cols];
        let positions = [
            (0usize, format!("{:.2}", min_x)),
            (cols / 2, format!("{:.2}", (min_x + max_x) / 2.0)),
            (cols - 1, format!("{:.2}", max_x)),
        ];
        for (pos, text) in &positions {
            let start = if *pos == 0 {
                0
            } else if *pos == cols - 1 {
                cols.saturating_sub(text.len())
            } else {
                (pos.saturating_sub(text.len() / 2)).min(cols.saturating_sub(text.len()))
            };
            for (i, ch) in text.chars().enumerate() {
                if start + i < cols {
                    x_labels[start + i] = ch;
                }
            }
        }
        out.push_str(&" ".repeat(6));
        out.extend(x_labels.iter());
        out.push('\n');

        if let Some(xlabel) = &figure.xlabel {
            let padding = cols.saturating_sub(xlabel.len()) / 2;
            out.push_str(&" ".repeat(6 + padding));
            out.push_str(xlabel);
            out.push('\n');
        }

        if figure.series.iter().any(|series| series.label.is_some()) {
            out.push('\n');
            out.push_str("Legend:\n");
            for (idx, series) in figure.series.iter().enumerate() {
                if let Some(label) = &series.label {
                    let marker = effective_marker(figure, idx, series.marker);
                    out.push_str(&format!("  {} - {}\n", marker, label));
                }
            }
        }

        out.push('\n');
        out
    }
}

fn effective_marker(figure: &Figure, idx: usize, marker: char) -> char {
    if figure.series.len() > 1 && marker == '*' {
        MARKER_CYCLE[idx % MARKER_CYCLE.len()]
    } else {
        marker
    }
}

// Bresenham line between two cells, skipping data points and occupied cells.
fn draw_segment(
    grid: &mut [Vec<char>],
    from: (usize, usize),
    to: (usize, usize),
    marker: char,
    points: &HashSet<(usize, usize)>,
) {
    let rows = grid.len() as isize;
    let cols = grid[0].len() as isize;
    let (c1, r1) = (from.0 as isize, from.1 as isize);
    let (c2, r2) = (to.0 as isize, to.1 as isize);

    let dc = (c2 - c1).abs();
    let dr = (r2 - r1).abs();
    let sc = if c2 > c1 { 1 } else { -1 };
    let sr = if r2 > r1 { 1 } else { -1 };
    let mut err = dc - dr;
    let (mut c, mut r) = (c1, r1);

    loop {
        if (0..rows).contains(&r) && (0..cols).contains(&c) {
            let cell = (c as usize, r as usize);
            if !points.contains(&cell) && grid[cell.1][cell.0] == ' ' {
                grid[cell.1][cell.0] = marker;
            }
        }
        if c == c2 && r == r2 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dr {
            err -= dr;
            c += sc;
        }
        if e2 < dc {
            err += dc;
            r += sr;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_canvas_renders_placeholder() {
        let canvas = PlotCanvas::new();
        assert_eq!(canvas.render(), "(empty plot)\n");
    }

    #[test]
    fn renders_axes_and_markers() {
        let mut canvas = PlotCanvas::new();
        canvas
            .plot(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0], None)
            .unwrap();
        let rendered = canvas.render();
        assert!(rendered.contains('*'));
        assert!(rendered.contains('|'));
        assert!(rendered.contains('-'));
        assert!(rendered.contains('+'));
    }

    #[test]
    fn renders_title_and_axis_labels() {
        let mut canvas = PlotCanvas::new();
        canvas.plot(vec![0.0, 1.0], vec![0.0, 1.0], None).unwrap();
        canvas.set_title("growth");
        canvas.set_xlabel("time");
        canvas.set_ylabel("value");
        let rendered = canvas.render();
        assert!(rendered.contains("growth"));
        assert!(rendered.contains("time"));
        assert!(rendered.contains("value"));
    }

    #[test]
    fn scatter_uses_round_markers_without_lines() {
        let mut canvas = PlotCanvas::new();
        canvas
            .scatter(vec![0.0, 5.0], vec![0.0, 5.0], None)
            .unwrap();
        let rendered = canvas.render();
        assert!(rendered.contains('o'));
    }

    #[test]
    fn multiple_series_cycle_markers_and_render_legend() {
        let mut canvas = PlotCanvas::new();
        canvas
            .plot(vec![0.0, 1.0], vec![0.0, 1.0], Some("first".into()))
            .unwrap();
        canvas
            .plot(vec![0.0, 1.0], vec![1.0, 0.0], Some("second".into()))
            .unwrap();
        let rendered = canvas.render();
        assert!(rendered.contains("Legend:"));
        assert!(rendered.contains("* - first"));
        assert!(rendered.contains("o - second"));
    }

    #[test]
    fn rejects_mismatched_series_lengths() {
        let mut canvas = PlotCanvas::new();
        assert!(matches!(
            canvas.plot(vec![0.0], vec![0.0, 1.0], None),
            Err(RuntimeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn axis_labels_cover_value_range() {
        let mut canvas = PlotCanvas::new();
        canvas
            .plot(vec![0.0, 10.0], vec![-5.0, 5.0], None)
            .unwrap();
        let rendered = canvas.render();
        assert!(rendered.contains("5.00"));
        assert!(rendered.contains("-5.00"));
        assert!(rendered.contains("10.00"));
    }

    #[test]
    fn clf_clears_data_but_keeps_canvas() {
        let mut canvas = PlotCanvas::new();
        canvas.plot(vec![0.0, 1.0], vec![0.0, 1.0], None).unwrap();
        canvas.clf();
        assert_eq!(canvas.render(), "(empty plot)\n");
    }
}
