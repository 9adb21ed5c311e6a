//! Terminal formatting of chat lines.

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use murmur_core::persona::Persona;
use murmur_core::turn::{Turn, TurnKind};

const FALLBACK_COLOR: (u8, u8, u8) = (200, 200, 200);

/// Parses `#RRGGBB`.
pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// `[HH:MM:SS] <icon><name>: <text>` in the persona's colour.
pub fn turn_line(turn: &Turn, color: Option<&str>) -> String {
    let (r, g, b) = color.and_then(parse_hex).unwrap_or(FALLBACK_COLOR);
    let head = format!(
        "[{}] {}{}:",
        clock(turn.timestamp),
        turn.interest.icon(),
        turn.persona_name
    );

    match turn.kind {
        TurnKind::Spoken => format!(
            "{} {}",
            head.truecolor(r, g, b).bold(),
            turn.text.truecolor(r, g, b)
        ),
        TurnKind::Apology | TurnKind::Cancelled => format!(
            "{} {}",
            head.truecolor(r, g, b),
            turn.text.bright_black().italic()
        ),
    }
}

pub fn system_line(text: &str) -> String {
    format!("[{}] 🤖 {}", clock(Utc::now()), text)
        .bright_yellow()
        .to_string()
}

pub fn error_line(text: &str) -> String {
    text.red().to_string()
}

/// One roster entry for `murmur personas`.
pub fn persona_block(persona: &Persona) -> String {
    let (r, g, b) = persona
        .color
        .as_deref()
        .and_then(parse_hex)
        .unwrap_or(FALLBACK_COLOR);

    let mut header = format!("{} ({})", persona.name, persona.id);
    if let Some(age) = persona.age {
        header.push_str(&format!(", {age}"));
    }
    if !persona.occupation.is_empty() {
        header.push_str(&format!(", {}", persona.occupation));
    }

    let mut lines = vec![
        header.truecolor(r, g, b).bold().to_string(),
        format!("  temperament: {}", persona.temperament.code()),
        format!("  style:       {}", persona.speaking_style),
    ];
    if !persona.interest_topics.is_empty() {
        lines.push(format!("  interests:   {}", persona.interest_topics.join(", ")));
    }
    if !persona.keywords.is_empty() {
        lines.push(format!("  keywords:    {}", persona.keywords.join(", ")));
    }
    lines.join("\n")
}
