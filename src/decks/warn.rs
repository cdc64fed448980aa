#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnCode {
    ArchiveReadFailed,
    UnknownEnvKey,
    DeckWithoutUrl,
    DuplicateFileName,
}

impl WarnCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ArchiveReadFailed => "ARCHIVE_READ_FAILED",
            Self::UnknownEnvKey => "UNKNOWN_ENV_KEY",
            Self::DeckWithoutUrl => "DECK_WITHOUT_URL",
            Self::DuplicateFileName => "DUPLICATE_FILE_NAME",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WarnEvent<'a> {
    pub code: WarnCode,
    pub stage: &'a str,
    pub archive: &'a str,
    pub reason: &'a str,
    pub err: &'a str,
}

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_event(event: &WarnEvent<'_>) -> String {
    format!(
        "DECK_WARN code={} stage={} archive={} reason={} err={}",
        event.code.as_str(),
        sanitize_value(event.stage),
        sanitize_value(event.archive),
        sanitize_value(event.reason),
        sanitize_value(event.err),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    eprintln!("{}", format_event(&event));
}
