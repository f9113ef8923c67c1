//! Canned replies for the local fallback responder.
//!
//! Tables are slices, so iteration order is the declaration order.

/// Reply attached to a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedReply {
    Fixed(&'static str),
    /// `{time}` is replaced with the local `HH:MM`.
    CurrentTime(&'static str),
}

/// Ordered keyword table plus the reply used when nothing matches.
#[derive(Debug, Clone, Copy)]
pub struct ReplyTable {
    pub entries: &'static [(&'static str, CannedReply)],
    pub fallback: &'static str,
}

/// Korean replies
pub static REPLIES_KO: ReplyTable = ReplyTable {
    entries: &[
        ("안녕", CannedReply::Fixed("안녕하세요! 무엇을 도와드릴까요?")),
        ("이름", CannedReply::Fixed("저는 AI 챗봇입니다.")),
        (
            "날씨",
            CannedReply::Fixed("죄송하지만 실시간 날씨 정보는 제공할 수 없습니다."),
        ),
        ("시간", CannedReply::CurrentTime("현재 시간은 대략 {time} 입니다.")),
    ],
    fallback: "흥미로운 질문이네요! AWS Bedrock이 연결되면 더 자세한 답변을 드릴 수 있을 것입니다.",
};

/// English replies
pub static REPLIES_EN: ReplyTable = ReplyTable {
    entries: &[
        ("hello", CannedReply::Fixed("Hello! How can I help you?")),
        ("name", CannedReply::Fixed("I am an AI chatbot.")),
        (
            "weather",
            CannedReply::Fixed("Sorry, I can't provide real-time weather information."),
        ),
        ("time", CannedReply::CurrentTime("The current time is about {time}.")),
    ],
    fallback: "Interesting question! I can give a more detailed answer once AWS Bedrock is connected.",
};

/// Get the reply table by language. Unknown codes fall back to Korean.
pub fn get_reply_table(lang: &str) -> &'static ReplyTable {
    match lang {
        "en" => &REPLIES_EN,
        _ => &REPLIES_KO,
    }
}
