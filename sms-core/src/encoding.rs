//! GSM 03.38 alphabet detection.
//!
//! Text made only of characters from the default 7-bit alphabet (and its
//! extension table) goes out in the modem's default mode; anything else
//! needs unicode mode.

use sms_types::Encoding;

/// GSM 03.38 basic character set, excluding the escape code.
const GSM7_BASIC: &str = "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?\
¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà";

/// GSM 03.38 extension table (sent as escape + code).
const GSM7_EXTENSION: &str = "^{}\\[~]|€\u{000C}";

/// Whether `c` can be sent in the default 7-bit alphabet.
pub fn is_gsm7_char(c: char) -> bool {
    GSM7_BASIC.contains(c) || GSM7_EXTENSION.contains(c)
}

/// Pick the send mode for `text`.
pub fn detect_encoding(text: &str) -> Encoding {
    if text.chars().all(is_gsm7_char) {
        Encoding::Gsm7
    } else {
        Encoding::Unicode
    }
}
