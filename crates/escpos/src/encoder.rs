//! [`PrintContent`] → [`ByteStream`].
//!
//! Every document shares one frame: init, charset, centered double-height bold house
//! name, an optional title line, the body left-aligned, paper feed and a full cut.

use chrono::NaiveDate;
use homeprint_core::{DeviceType, PrinterSettings, civil_weekday};

use crate::charset::CharacterTable;
use crate::command::{Alignment, ByteStream, CutKind, Op};
use crate::content::{DailyTasks, MenuDay, Message, PrintContent, WeeklyMenu};
use crate::error::EncodingError;
use crate::markdown;

/// Blank lines fed before the cut so the last line clears the blade.
pub const FEED_LINES: usize = 3;

pub const MIN_LINE_WIDTH: usize = 16;
pub const MAX_LINE_WIDTH: usize = 80;

const WEEKDAY_NAMES: [&str; 7] = [
    "Domingo",
    "Segunda-feira",
    "Terça-feira",
    "Quarta-feira",
    "Quinta-feira",
    "Sexta-feira",
    "Sábado",
];

pub fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAY_NAMES[usize::from(civil_weekday(date))]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub house_name: String,
    pub line_width: usize,
    pub charset: CharacterTable,
}

impl EncoderConfig {
    pub fn new(house_name: impl Into<String>) -> Self {
        Self {
            house_name: house_name.into(),
            line_width: DeviceType::default().line_width(),
            charset: CharacterTable::default(),
        }
    }

    /// Paper width and character table follow the configured device type.
    pub fn from_settings(settings: &PrinterSettings) -> Self {
        let charset = match settings.device_type {
            DeviceType::Thermal80mm => CharacterTable::Pc860,
            DeviceType::Thermal58mm => CharacterTable::Pc850,
        };
        Self {
            house_name: settings.house_name.clone(),
            line_width: settings.device_type.line_width(),
            charset,
        }
    }

    pub fn with_line_width(mut self, line_width: usize) -> Self {
        self.line_width = line_width;
        self
    }

    pub fn with_charset(mut self, charset: CharacterTable) -> Self {
        self.charset = charset;
        self
    }

    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.house_name.trim().is_empty() {
            return Err(EncodingError::MissingHouseName);
        }
        if !(MIN_LINE_WIDTH..=MAX_LINE_WIDTH).contains(&self.line_width) {
            return Err(EncodingError::InvalidLineWidth(self.line_width));
        }
        Ok(())
    }

    fn separator(&self) -> String {
        "-".repeat(self.line_width)
    }
}

pub fn encode(content: &PrintContent, config: &EncoderConfig) -> Result<ByteStream, EncodingError> {
    config.validate()?;

    let mut out = ByteStream::new();
    match content {
        PrintContent::DailyTasks(daily) => encode_daily(daily, config, &mut out)?,
        PrintContent::WeeklyMenu(menu) => encode_weekly(menu, config, &mut out)?,
        PrintContent::Message(message) => encode_message(message, config, &mut out)?,
    }
    footer(&mut out);

    tracing::debug!(kind = content.kind(), ops = out.ops().len(), "content encoded");
    Ok(out)
}

fn header(config: &EncoderConfig, title: Option<&str>, out: &mut ByteStream) {
    out.push(Op::Init)
        .push(Op::SetCharset(config.charset))
        .align(Alignment::Center)
        .double_height(true)
        .bold(true)
        .text(config.house_name.trim())
        .newline()
        .bold(false)
        .double_height(false);
    if let Some(title) = title {
        out.line(title);
    }
    out.align(Alignment::Left);
}

fn footer(out: &mut ByteStream) {
    for _ in 0..FEED_LINES {
        out.newline();
    }
    out.cut(CutKind::Full);
}

fn encode_daily(
    daily: &DailyTasks,
    config: &EncoderConfig,
    out: &mut ByteStream,
) -> Result<(), EncodingError> {
    let title = format!(
        "Tarefas de {} {}",
        weekday_name(daily.date).to_lowercase(),
        daily.date.format("%d/%m/%Y")
    );
    header(config, Some(&title), out);

    for group in daily.groups.iter().filter(|g| !g.tasks.is_empty()) {
        out.line(&config.separator())
            .bold(true)
            .text(&group.heading().to_uppercase())
            .bold(false)
            .newline();
        for task in &group.tasks {
            if task.title.trim().is_empty() {
                return Err(EncodingError::BlankTaskTitle {
                    group: group.heading().to_string(),
                });
            }
            out.line(&format!("[ ] {}", task.title.trim()));
            if let Some(description) = task.description.as_deref().map(str::trim) {
                if !description.is_empty() {
                    out.line(&format!("    {description}"));
                }
            }
        }
    }

    out.line(&config.separator())
        .line(&format!("Total: {} tarefa(s)", daily.total_count()));

    if let Some(menu) = daily.menu.as_ref().filter(|m| !m.is_empty()) {
        out.line(&config.separator())
            .bold(true)
            .text("Cardápio do dia")
            .bold(false)
            .newline();
        meals(menu, out);
    }
    Ok(())
}

fn encode_weekly(
    menu: &WeeklyMenu,
    config: &EncoderConfig,
    out: &mut ByteStream,
) -> Result<(), EncodingError> {
    if menu.days.len() != 7 {
        return Err(EncodingError::IncompleteWeek(menu.days.len()));
    }
    header(config, Some("Cardápio da semana"), out);

    for day in &menu.days {
        out.line(&config.separator())
            .bold(true)
            .text(&format!("{} {}", weekday_name(day.date), day.date.format("%d/%m")))
            .bold(false)
            .newline();
        if day.is_empty() {
            out.line("(sem refeições planejadas)");
        } else {
            meals(day, out);
        }
    }
    Ok(())
}

fn meals(day: &MenuDay, out: &mut ByteStream) {
    if let Some(lunch) = &day.lunch {
        out.line(&format!("Almoço: {lunch}"));
    }
    if let Some(dinner) = &day.dinner {
        out.line(&format!("Jantar: {dinner}"));
    }
}

fn encode_message(
    message: &Message,
    config: &EncoderConfig,
    out: &mut ByteStream,
) -> Result<(), EncodingError> {
    if message.is_empty() {
        return Err(EncodingError::EmptyMessage);
    }
    header(config, None, out);
    out.newline();

    let title = message.title.trim();
    if !title.is_empty() {
        markdown::render(&format!("# {title}"), config.line_width, out);
    }
    markdown::render(&message.body, config.line_width, out);
    Ok(())
}
