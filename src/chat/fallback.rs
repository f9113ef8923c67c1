//! Keyword-matching responder used offline and when Bedrock is unreachable.

use chrono::{Local, NaiveTime};

use crate::config::{get_reply_table, CannedReply, ReplyTable};

/// Deterministic, network-free reply generator.
#[derive(Debug, Clone, Copy)]
pub struct LocalResponder {
    table: &'static ReplyTable,
}

impl LocalResponder {
    pub fn new(table: &'static ReplyTable) -> Self {
        Self { table }
    }

    /// Responder for a language code ("ko" or "en").
    pub fn for_lang(lang: &str) -> Self {
        Self::new(get_reply_table(lang))
    }

    /// Reply to `input` using the local clock for time questions.
    pub fn respond(&self, input: &str) -> String {
        self.respond_at(input, Local::now().time())
    }

    /// Reply to `input` as of `now`.
    ///
    /// The first keyword in table order that occurs anywhere in the input,
    /// ignoring case, selects the reply.
    pub fn respond_at(&self, input: &str, now: NaiveTime) -> String {
        let input = input.to_lowercase();

        self.table
            .entries
            .iter()
            .find(|(keyword, _)| input.contains(&keyword.to_lowercase()))
            .map(|(_, reply)| match reply {
                CannedReply::Fixed(text) => text.to_string(),
                CannedReply::CurrentTime(template) => {
                    template.replace("{time}", &now.format("%H:%M").to_string())
                }
            })
            .unwrap_or_else(|| self.table.fallback.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{REPLIES_EN, REPLIES_KO};

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 5, 0).unwrap()
    }

    #[test]
    fn test_weather_keyword() {
        let responder = LocalResponder::for_lang("ko");
        assert_eq!(
            responder.respond("오늘 날씨 어때"),
            "죄송하지만 실시간 날씨 정보는 제공할 수 없습니다."
        );
    }

    #[test]
    fn test_generic_fallback() {
        let responder = LocalResponder::for_lang("ko");
        assert_eq!(responder.respond("xyz"), REPLIES_KO.fallback);
        assert_eq!(LocalResponder::for_lang("en").respond("xyz"), REPLIES_EN.fallback);
    }

    #[test]
    fn test_first_keyword_in_table_order_wins() {
        let responder = LocalResponder::for_lang("ko");
        // "날씨" appears first in the text but "안녕" comes first in the table
        assert_eq!(
            responder.respond_at("날씨 얘기 전에 안녕", noon()),
            "안녕하세요! 무엇을 도와드릴까요?"
        );
    }

    #[test]
    fn test_deterministic() {
        let responder = LocalResponder::for_lang("ko");
        let first = responder.respond_at("이름이 뭐야? 날씨는?", noon());
        for _ in 0..10 {
            assert_eq!(responder.respond_at("이름이 뭐야? 날씨는?", noon()), first);
        }
        assert_eq!(first, "저는 AI 챗봇입니다.");
    }

    #[test]
    fn test_current_time_reply() {
        let responder = LocalResponder::for_lang("ko");
        assert_eq!(
            responder.respond_at("지금 시간 알려줘", noon()),
            "현재 시간은 대략 12:05 입니다."
        );
    }

    #[test]
    fn test_case_insensitive() {
        let responder = LocalResponder::for_lang("en");
        assert_eq!(
            responder.respond_at("HELLO there", noon()),
            "Hello! How can I help you?"
        );
        assert_eq!(
            responder.respond_at("What TIME is it", noon()),
            "The current time is about 12:05."
        );
    }
}
