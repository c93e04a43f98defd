//! Chat client configuration

use skillswap_core::Result;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_WS_URL: &str = "ws://localhost:8081/chat/v1/ws";
const DEFAULT_PAGE_SIZE: usize = 30;
const DEFAULT_TYPING_DEBOUNCE_MS: u64 = 2000;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;
const DEFAULT_MAX_FILE_SIZE_MB: u32 = 25;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_base_url: String,
    pub ws_url: String,
    pub page_size: usize,
    pub typing_debounce_ms: u64,
    pub reconnect_delay_ms: u64,
    pub max_file_size_mb: u32,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_base_url: std::env::var("CHAT_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            ws_url: std::env::var("CHAT_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string()),
            page_size: std::env::var("CHAT_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PAGE_SIZE),
            typing_debounce_ms: std::env::var("CHAT_TYPING_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TYPING_DEBOUNCE_MS),
            reconnect_delay_ms: std::env::var("CHAT_RECONNECT_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RECONNECT_DELAY_MS),
            max_file_size_mb: std::env::var("CHAT_MAX_FILE_SIZE_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB),
        })
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            typing_debounce_ms: DEFAULT_TYPING_DEBOUNCE_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
        }
    }
}
