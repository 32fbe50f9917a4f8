use std::time::{Duration, Instant};

use crate::WORD_LENGTH;

pub const DEFAULT_DURATION_MS: u64 = 2000;
pub const CHECKING_DURATION_MS: u64 = 1000;

/// Transient messages shown above the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    InvalidLength,
    NotInList,
    Unverified,
    Checking,
    NewWordAccepted,
    Won,
    Lost,
    ModeDaily,
    ModeRandom,
}

impl Message {
    pub fn text(self) -> String {
        match self {
            Message::InvalidLength => format!("يجب أن تكون الكلمة {WORD_LENGTH} أحرف"),
            Message::NotInList => "الكلمة غير موجودة في القائمة".into(),
            Message::Unverified => "تعذر التحقق من الكلمة، ربما ليست صحيحة".into(),
            Message::Checking => "جارٍ التحقق من الكلمة...".into(),
            Message::NewWordAccepted => "تم قبول الكلمة الجديدة!".into(),
            Message::Won => "أحسنت! لقد فزت!".into(),
            Message::Lost => "حظاً أوفر في المرة القادمة!".into(),
            Message::ModeDaily => "الوضع اليومي".into(),
            Message::ModeRandom => "كلمة عشوائية".into(),
        }
    }
}

/// A message plus how long it stays up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub message: Message,
    pub duration: Duration,
    pub shown_at: Instant,
}

impl Feedback {
    pub fn new(message: Message, duration: Duration) -> Self {
        Self {
            message,
            duration,
            shown_at: Instant::now(),
        }
    }

    pub fn text(&self) -> String {
        self.message.text()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_length_mentions_word_length() {
        assert_eq!(Message::InvalidLength.text(), "يجب أن تكون الكلمة 5 أحرف");
    }

    #[test]
    fn feedback_expires() {
        let feedback = Feedback::new(Message::Checking, Duration::from_millis(CHECKING_DURATION_MS));
        assert!(!feedback.is_expired(feedback.shown_at));
        assert!(feedback.is_expired(feedback.shown_at + Duration::from_millis(CHECKING_DURATION_MS)));
    }
}
