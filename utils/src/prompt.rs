//! This module implements prompting.

use std::fmt;
use std::io::BufRead;
use std::io::Write;
use std::io;

/// Shows a prompt and returns the line read from stdin, or `None` on EOF.
pub fn prompt<P: fmt::Display>(prompt: P) -> Option<String> {
	print!("{prompt}");
	let _ = io::stdout().flush();

	io::stdin().lock().lines().next()?.ok()
}
