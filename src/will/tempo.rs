//! 时间感知：按小时划分的五个时段

use chrono::{DateTime, Local, Timelike};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    Nadir,
    Dawn,
    Zenith,
    Dusk,
    Vesper,
}

impl DayPart {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=4 => DayPart::Nadir,
            5..=11 => DayPart::Dawn,
            12..=16 => DayPart::Zenith,
            17..=20 => DayPart::Dusk,
            _ => DayPart::Vesper,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayPart::Nadir => "Nadir (Unconscious Processing)",
            DayPart::Dawn => "Dawn (Planning)",
            DayPart::Zenith => "Zenith (Execution)",
            DayPart::Dusk => "Dusk (Reflection)",
            DayPart::Vesper => "Vesper (Consolidation)",
        }
    }
}

/// 规划上下文中的时空段落
pub fn current_context(now: DateTime<Local>, location: &str) -> String {
    let part = DayPart::from_hour(now.hour());
    format!(
        "Tempo: {}\nVibe: {}\nAnchor:\n{}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        part.label(),
        location
    )
}
