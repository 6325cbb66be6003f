//! Part file text.

/// Written in place of a segment that was never recognized.
pub const GAP_MARKER: &str = "[unrecognized segment]";

/// `HH:MM:SS` for a second offset.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Render segments in index order, one block per segment under its time
/// range. `None` text becomes the gap marker.
pub fn render_part_text<'a, I>(segments: I, segment_secs: u64) -> String
where
    I: IntoIterator<Item = (usize, Option<&'a str>)>,
{
    let mut out = String::new();
    for (index, text) in segments {
        let start = index as u64 * segment_secs;
        let end = start + segment_secs;
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!(
            "[{} - {}]\n{}\n",
            format_clock(start),
            format_clock(end),
            text.map(str::trim).unwrap_or(GAP_MARKER)
        ));
    }
    out
}
