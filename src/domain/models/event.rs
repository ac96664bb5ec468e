#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A one-shot, non-blocking notification surfaced to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Notice {
        return Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        };
    }

    pub fn error(message: impl Into<String>) -> Notice {
        return Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        };
    }
}

/// Side channel shared by every screen. `SessionExpired` is emitted when any
/// authenticated call comes back 401/403 or with an unparsable success body,
/// and forces the same teardown as an explicit logout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Notice(Notice),
    SessionExpired,
}
