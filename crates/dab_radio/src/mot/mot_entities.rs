use log::debug;

/// Parameter identifier of the content name header extension.
const PARAM_CONTENT_NAME: u8 = 0x0C;

/// Parsed MOT header entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotHeader {
    pub body_size: u32,
    pub header_size: u16,
    pub content_type: u8,
    pub content_subtype: u16,
    pub content_name: Option<String>,
    pub content_name_charset: u8,
}

/// A completely reassembled MOT object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotEntity {
    pub transport_id: u16,
    pub header: MotHeader,
    pub body: Vec<u8>,
}

/// Decodes the MOT header core and walks its extension parameters.
pub fn parse_mot_header(buf: &[u8]) -> Option<MotHeader> {
    if buf.len() < 7 {
        return None;
    }

    let body_size = (u32::from(buf[0]) << 20)
        | (u32::from(buf[1]) << 12)
        | (u32::from(buf[2]) << 4)
        | (u32::from(buf[3]) >> 4);
    let header_size = (u16::from(buf[3] & 0x0F) << 9) | (u16::from(buf[4]) << 1) | (u16::from(buf[5]) >> 7);
    let content_type = (buf[5] & 0b0111_1110) >> 1;
    let content_subtype = (u16::from(buf[5] & 0b0000_0001) << 8) | u16::from(buf[6]);

    let mut header = MotHeader {
        body_size,
        header_size,
        content_type,
        content_subtype,
        content_name: None,
        content_name_charset: 0,
    };

    // Walk the extension parameters up to the declared header size.
    let extension_end = usize::from(header_size).min(buf.len());
    let mut curr_byte = 7;
    while curr_byte < extension_end {
        let descriptor = buf[curr_byte];
        let pli = (descriptor & 0b1100_0000) >> 6;
        let param_id = descriptor & 0b0011_1111;
        curr_byte += 1;

        let nb_data_bytes = match pli {
            0b00 => 0,
            0b01 => 1,
            0b10 => 4,
            _ => {
                // Variable length field with an optional 15 bit extension.
                if curr_byte >= extension_end {
                    return Some(header);
                }
                let indicator = buf[curr_byte];
                if indicator & 0b1000_0000 == 0 {
                    curr_byte += 1;
                    usize::from(indicator & 0b0111_1111)
                } else {
                    if curr_byte + 1 >= extension_end {
                        return Some(header);
                    }
                    let length = (usize::from(indicator & 0b0111_1111) << 8) | usize::from(buf[curr_byte + 1]);
                    curr_byte += 2;
                    length
                }
            }
        };

        if curr_byte + nb_data_bytes > extension_end {
            return Some(header);
        }
        let data = &buf[curr_byte..curr_byte + nb_data_bytes];
        curr_byte += nb_data_bytes;

        if param_id == PARAM_CONTENT_NAME && !data.is_empty() {
            header.content_name_charset = (data[0] & 0b1111_0000) >> 4;
            header.content_name = Some(String::from_utf8_lossy(&data[1..]).into_owned());
        } else {
            debug!("mot header parameter id={} L={}", param_id, nb_data_bytes);
        }
    }

    Some(header)
}

/// Serialises a header entity; used to fabricate test objects.
#[cfg(test)]
pub fn build_mot_header(
    body_size: u32,
    content_type: u8,
    content_subtype: u16,
    content_name: Option<&str>,
) -> Vec<u8> {
    let mut extension = Vec::new();
    if let Some(name) = content_name {
        extension.push(0b1100_0000 | PARAM_CONTENT_NAME);
        extension.push((name.len() + 1) as u8);
        extension.push(0x40); // charset 4, ISO latin
        extension.extend_from_slice(name.as_bytes());
    }

    let header_size = (7 + extension.len()) as u16;
    let mut buf = Vec::with_capacity(usize::from(header_size));
    buf.push((body_size >> 20) as u8);
    buf.push((body_size >> 12) as u8);
    buf.push((body_size >> 4) as u8);
    buf.push((((body_size & 0x0F) as u8) << 4) | ((header_size >> 9) as u8));
    buf.push((header_size >> 1) as u8);
    buf.push((((header_size & 0x01) as u8) << 7) | (content_type << 1) | ((content_subtype >> 8) as u8));
    buf.push((content_subtype & 0xFF) as u8);
    buf.extend_from_slice(&extension);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_core_round_trip() {
        let buf = build_mot_header(0x12345, 2, 3, None);
        let header = parse_mot_header(&buf).unwrap();
        assert_eq!(header.body_size, 0x12345);
        assert_eq!(header.header_size, 7);
        assert_eq!(header.content_type, 2);
        assert_eq!(header.content_subtype, 3);
        assert!(header.content_name.is_none());
    }

    #[test]
    fn content_name_parameter_is_decoded() {
        let buf = build_mot_header(100, 2, 1, Some("slide.jpg"));
        let header = parse_mot_header(&buf).unwrap();
        assert_eq!(header.content_name.as_deref(), Some("slide.jpg"));
        assert_eq!(header.content_name_charset, 4);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let buf = build_mot_header(100, 2, 1, None);
        assert!(parse_mot_header(&buf[..5]).is_none());
    }
}
