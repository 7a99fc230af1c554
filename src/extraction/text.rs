const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Decode a text upload: UTF-8, then BOM-marked UTF-16, then Latin-1 (which never fails).
pub fn decode_text(content: &[u8]) -> String {
    let body = content.strip_prefix(&UTF8_BOM).unwrap_or(content);
    if let Ok(text) = std::str::from_utf8(body) {
        return text.to_string();
    }

    if let Some(text) = decode_utf16(content) {
        return text;
    }

    content.iter().map(|&byte| char::from(byte)).collect()
}

fn decode_utf16(content: &[u8]) -> Option<String> {
    let (body, little_endian) = if let Some(body) = content.strip_prefix(&UTF16_LE_BOM) {
        (body, true)
    } else if let Some(body) = content.strip_prefix(&UTF16_BE_BOM) {
        (body, false)
    } else {
        return None;
    };

    if body.len() % 2 != 0 {
        return None;
    }

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            let bytes = [pair[0], pair[1]];
            if little_endian {
                u16::from_le_bytes(bytes)
            } else {
                u16::from_be_bytes(bytes)
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}
