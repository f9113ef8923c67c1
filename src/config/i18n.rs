//! Internationalization (i18n) module for user-visible chat messages.

use std::time::Duration;

/// UI messages structure
#[derive(Debug, Clone)]
pub struct Messages {
    pub title: &'static str,
    pub description: &'static str,
    pub model_info: &'static str,
    pub input_prompt: &'static str,
    pub thinking: &'static str,
    pub local_thinking: &'static str,
    pub no_text_found: &'static str,
    pub max_retries_exceeded: &'static str,
    pub error_occurred: &'static str,
    pub error_type: &'static str,
    /// `{secs}` is replaced with the backoff delay.
    pub throttled: &'static str,
    pub client_init_failed: &'static str,
    pub connection_failed: &'static str,
    pub online_mode: &'static str,
    pub offline_mode: &'static str,
    pub history_cleared: &'static str,
    pub history_empty: &'static str,
    pub settings_saved: &'static str,
    pub help: &'static str,
    pub goodbye: &'static str,
}

impl Messages {
    /// Warning shown before a backoff wait.
    pub fn throttle_warning(&self, delay: Duration) -> String {
        self.throttled
            .replace("{secs}", &delay.as_secs_f64().to_string())
    }

    /// Reply text for a failed, non-retryable model call.
    pub fn error_reply(&self, description: &str, category: &str) -> String {
        format!(
            "{}: {}\n{}: {}",
            self.error_occurred, description, self.error_type, category
        )
    }
}

/// Korean messages
pub static MESSAGES_KO: Messages = Messages {
    title: "🤖 AI 챗봇",
    description: "AWS Bedrock과 연결된 질문 답변 챗봇입니다.",
    model_info: "🤖 사용 모델: Claude 3.5 Sonnet",
    input_prompt: "질문을 입력하세요",
    thinking: "AI가 생각중입니다...",
    local_thinking: "로컬 AI가 생각중입니다...",
    no_text_found: "응답에서 텍스트를 찾을 수 없습니다.",
    max_retries_exceeded: "최대 재시도 횟수에 도달했습니다. 잠시 후 다시 시도해 주세요.",
    error_occurred: "오류가 발생했습니다",
    error_type: "응답 타입",
    throttled: "요청이 너무 많습니다. {secs}초 후 재시도합니다.",
    client_init_failed: "AWS Bedrock 클라이언트 초기화 실패",
    connection_failed: "AWS Bedrock 연결에 실패했습니다. 로컬 모드로 전환합니다.",
    online_mode: "AWS Bedrock 사용: 켜짐",
    offline_mode: "AWS Bedrock 사용: 꺼짐 (로컬 모드)",
    history_cleared: "🗑️ 채팅 기록이 초기화되었습니다.",
    history_empty: "대화 기록이 없습니다.",
    settings_saved: "⚙️ 설정이 저장되었습니다.",
    help: "명령어: /online, /offline, /mode (전환), /reset (기록 초기화), /history, /save (설정 저장), /help, quit",
    goodbye: "안녕히 가세요! 👋",
};

/// English messages
pub static MESSAGES_EN: Messages = Messages {
    title: "🤖 AI Chatbot",
    description: "A question-answering chatbot connected to AWS Bedrock.",
    model_info: "🤖 Model: Claude 3.5 Sonnet",
    input_prompt: "Ask a question",
    thinking: "AI is thinking...",
    local_thinking: "Local AI is thinking...",
    no_text_found: "No text found in the response.",
    max_retries_exceeded: "Maximum retry attempts reached. Please try again later.",
    error_occurred: "An error occurred",
    error_type: "Error type",
    throttled: "Too many requests. Retrying in {secs} seconds.",
    client_init_failed: "Failed to initialize AWS Bedrock client",
    connection_failed: "Failed to connect to AWS Bedrock. Switching to local mode.",
    online_mode: "AWS Bedrock: on",
    offline_mode: "AWS Bedrock: off (local mode)",
    history_cleared: "🗑️ Chat history cleared.",
    history_empty: "No messages yet.",
    settings_saved: "⚙️ Settings saved.",
    help: "Commands: /online, /offline, /mode (toggle), /reset (clear history), /history, /save (save settings), /help, quit",
    goodbye: "Goodbye! 👋",
};

/// Get UI messages by language.
///
/// # Arguments
/// * `lang` - Language code, "ko" for Korean, "en" for English.
///
/// # Returns
/// Reference to Messages struct. Unknown codes fall back to Korean.
pub fn get_messages(lang: &str) -> &'static Messages {
    match lang {
        "en" => &MESSAGES_EN,
        _ => &MESSAGES_KO,
    }
}
