//! Timestamps and file names.

use once_cell::sync::OnceCell;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::core::catalog::DivisionKey;

/// `AFCEASTMeme-10-16-26.png`.
pub fn export_filename(key: DivisionKey, date: Date) -> String {
    format!(
        "{}{}Meme-{:02}-{:02}-{:02}.png",
        key.conference.as_str(),
        key.division.as_str(),
        u8::from(date.month()),
        date.day(),
        date.year().rem_euclid(100)
    )
}

static LOCAL_OFFSET: OnceCell<UtcOffset> = OnceCell::new();

/// Reads the local UTC offset and keeps it for the rest of the process.
///
/// On Unix `time` refuses to read the offset once a second thread exists,
/// so native shells call this at the top of `main`. Returns `None` when the
/// offset cannot be determined; dates then fall back to UTC.
pub fn capture_local_offset() -> Option<UtcOffset> {
    match UtcOffset::current_local_offset() {
        Ok(offset) => Some(*LOCAL_OFFSET.get_or_init(|| offset)),
        Err(err) => {
            tracing::warn!("[format] local offset unavailable, using UTC: {err}");
            None
        }
    }
}

/// Pins the offset used for file names and timestamps.
pub fn register_local_offset(offset: UtcOffset) {
    if LOCAL_OFFSET.set(offset).is_err() {
        tracing::debug!("[format] local offset already registered");
    }
}

fn local_offset() -> UtcOffset {
    if let Some(offset) = LOCAL_OFFSET.get() {
        return *offset;
    }
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn local_today() -> Date {
    OffsetDateTime::now_utc().to_offset(local_offset()).date()
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

/// "Oct 16, 3:04 PM" in local time; the raw text when it does not parse.
pub fn short_timestamp(rfc3339: &str) -> String {
    let Ok(parsed) = OffsetDateTime::parse(rfc3339, &Rfc3339) else {
        return rfc3339.to_string();
    };
    format_short(parsed.to_offset(local_offset()))
}

fn format_short(moment: OffsetDateTime) -> String {
    let layout = format_description!(
        "[month repr:short] [day padding:none], [hour repr:12 padding:none]:[minute] [period]"
    );
    moment
        .format(layout)
        .unwrap_or_else(|_| moment.date().to_string())
}
