//! Meeting-link generation
//!
//! Meeting rooms live on the external provider; the client only mints the
//! room code. The code format (three dash-joined base-36 fragments of
//! lengths 3, 4, 3) must stay stable for compatibility with existing links.

use rand::Rng;

const MEETING_URL_BASE: &str = "https://meet.skillswap.com";

const FRAGMENT_LENGTHS: [usize; 3] = [3, 4, 3];
const BASE36: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random meeting room code, e.g. `abc-de12-xyz`.
pub fn generate_meeting_code() -> String {
    let mut rng = rand::thread_rng();
    FRAGMENT_LENGTHS
        .iter()
        .map(|&len| {
            (0..len)
                .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Embed a room code in the provider URL template.
pub fn meeting_url(code: &str) -> String {
    format!("{MEETING_URL_BASE}/{code}")
}

/// Mint a fresh room and return its full URL.
pub fn generate_meeting_url() -> String {
    meeting_url(&generate_meeting_code())
}
