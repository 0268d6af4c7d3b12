use std::path::Path;

use ariadne::{Config, Label, Report, ReportKind, Source};

/// Renders a registry file parse error as a report quoting the offending spot in the file.
pub(crate) fn render_parse_error(path: &Path, source: &str, err: &serde_json::Error) -> String {
	let id = path.display().to_string();
	let text = err.to_string();
	if source.trim().is_empty() {
		return format!("cannot parse registry file {id}: {text}");
	}

	// serde_json reports 1-based line and column; ariadne wants a char offset.
	let byte_offset = find_byte_offset(source.as_bytes(), err.line(), err.column())
		.unwrap_or(source.len());
	let char_len = source.chars().count();
	let start = source
		.get(..byte_offset)
		.map_or(char_len, |head| head.chars().count())
		.min(char_len.saturating_sub(1));
	let span = start..(start + 1).min(char_len.max(1));

	let msg = text.rsplit_once(" at line ").map_or(&text[..], |(msg, _)| msg);

	let mut out = Vec::new();
	let written = Report::build(ReportKind::Error, id.clone(), start)
		.with_config(Config::default().with_color(false))
		.with_message(format!("cannot parse registry file {id}"))
		.with_label(Label::new((id.clone(), span)).with_message(msg))
		.finish()
		.write((id, Source::from(source)), &mut out);
	match written {
		Ok(()) => String::from_utf8_lossy(&out).into_owned(),
		// Writing into a Vec doesn't fail in practice; fall back to serde's own message.
		Err(_) => text,
	}
}

/// Finds the byte offset of a 1-based line and column in `src`.
fn find_byte_offset(src: &[u8], line: usize, column: usize) -> Option<usize> {
	let mut walk_line = 1;
	let mut walk_column = 1;
	let mut offset = 0;
	while offset < src.len() && (walk_line < line || (walk_line == line && walk_column < column)) {
		if src[offset] == b'\n' {
			walk_line += 1;
			walk_column = 1;
		} else {
			walk_column += 1;
		}
		offset += 1;
	}

	if offset >= src.len() || walk_line != line || walk_column != column {
		None
	} else {
		Some(offset)
	}
}
