//! ASCII rendering of a board for terminal output.

use crate::model::PuzzleState;

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Draw the tubes side by side, bottoms aligned, one row per common height
/// unit (the gcd of all segment heights, so pixel-scale boards stay compact).
/// Empty space renders as `.` and a tube-index footer closes the board.
pub fn render_state(state: &PuzzleState) -> String {
    let tubes = state.get_tubes();
    if tubes.is_empty() {
        return String::new();
    }

    let mut unit = 0;
    for tube in tubes {
        for segment in tube.get_segments() {
            unit = gcd(unit, segment.height);
        }
    }
    if unit == 0 {
        unit = 1;
    }

    let mut columns: Vec<Vec<String>> = Vec::with_capacity(tubes.len());
    let mut width = 1;
    for tube in tubes {
        let mut cells = Vec::new();
        for segment in tube.get_segments() {
            let label = segment.color.get_letter_representation();
            for _ in 0..(segment.height / unit) {
                cells.push(label.clone());
            }
        }
        width = width.max(cells.iter().map(String::len).max().unwrap_or(1));
        columns.push(cells);
    }
    let max_rows = columns.iter().map(Vec::len).max().unwrap_or(0);

    let mut out = String::new();
    for row in 0..max_rows {
        for (i, cells) in columns.iter().enumerate() {
            // Shorter tubes stand on the same base line.
            let hang = max_rows - cells.len();
            if i > 0 {
                out.push(' ');
            }
            if row < hang {
                out.push_str(&" ".repeat(width + 2));
            } else {
                out.push('|');
                out.push_str(&format!("{:>width$}", cells[row - hang]));
                out.push('|');
            }
        }
        out.push('\n');
    }
    for i in 0..columns.len() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!(" {i:>width$} "));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(repr: &str) -> PuzzleState {
        PuzzleState::from_repr(repr).unwrap()
    }

    #[test]
    fn rows_scale_by_the_common_unit() {
        let rendered = render_state(&state("A25,B50,A25;.100"));
        // 25-pixel unit: four rows plus the footer.
        assert_eq!(rendered.lines().count(), 5);
        assert_eq!(rendered.lines().next(), Some("|A| |.|"));
    }

    #[test]
    fn bottoms_align_for_mixed_capacities() {
        let rendered = render_state(&state("A2,B2;.2"));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "|A|    ");
        assert_eq!(lines[1], "|B| |.|");
        assert_eq!(lines[2], " 0   1 ");
    }

    #[test]
    fn empty_board_renders_nothing() {
        assert_eq!(render_state(&PuzzleState::new(Vec::new())), "");
    }
}
