//! Timestamped progress lines on stderr.
//!
//! Provisioning and teardown block for minutes; these helpers give the test
//! log a visible heartbeat between Terraform's own output.

use owo_colors::{OwoColorize, Stream::Stderr, Style};

fn line(tag: &str, style: Style, msg: &str) {
    let ts = chrono::Local::now().format("%H:%M:%S");
    eprintln!(
        "{ts} {} {msg}",
        tag.if_supports_color(Stderr, |t| t.style(style))
    );
}

pub fn step(msg: &str) {
    line("·", Style::new().blue(), msg);
}

pub fn success(msg: &str) {
    line("✓", Style::new().green(), msg);
}

pub fn warn(msg: &str) {
    line("!", Style::new().yellow(), msg);
}

pub fn error(msg: &str) {
    line("✗", Style::new().red(), msg);
}
