pub const LINE_BREAK_MARKER: char = '⏎';

/// Reduces a stored value to something that fits on one line. Multi-line
/// values keep their first non-empty line and gain a marker on the side where
/// text was dropped.
pub fn format_display_text(value: &str) -> String {
    let mut lines = value
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    let first = lines.next().unwrap_or_default();
    let Some(second) = lines.next() else {
        return value.to_owned();
    };

    if !first.is_empty() {
        return format!("{first}{LINE_BREAK_MARKER}");
    }

    let mut display = format!("{LINE_BREAK_MARKER}{second}");
    if lines.next().is_some() {
        display.push(LINE_BREAK_MARKER);
    }
    display
}
