use crate::consts;
use crate::http::headers::Headers;
use crate::http::mime::MimeType;
use crate::http::request::RequestFile;
use crate::http::syntax;
use crate::http::uri::DataMap;

// Decodes a multipart/form-data payload. Plain fields land in `post`, parts with a filename in
// `files`. Returns false when the delimiter structure is broken.
pub(crate) fn parse_form_data(
    data: &[u8],
    boundary: &str,
    post: &mut DataMap,
    files: &mut Vec<(String, RequestFile)>,
) -> bool {
    let delimiter = format!("--{}", boundary).into_bytes();

    let mut seen_terminator = false;
    let mut cursor = match find_bytes(data, &delimiter, 0) {
        Some(index) => index + delimiter.len(),
        None => return false,
    };

    while !seen_terminator {
        if data[cursor..].starts_with(b"--") {
            break;
        }
        let part_start = match skip_line_break(&data[cursor..]) {
            Some(skipped) => cursor + skipped,
            None => return false,
        };

        let part_end;
        match find_bytes(data, &delimiter, part_start) {
            Some(index) => {
                part_end = index;
                cursor = index + delimiter.len();
                seen_terminator = data[cursor..].starts_with(b"--");
            }
            None => return false,
        }

        // The CRLF before the delimiter belongs to the delimiter, not the content.
        let part = data[part_start..part_end].strip_suffix(b"\r\n").unwrap_or(&data[part_start..part_end]);
        if !parse_part(part, post, files) {
            return false;
        }
    }
    true
}

fn parse_part(part: &[u8], post: &mut DataMap, files: &mut Vec<(String, RequestFile)>) -> bool {
    let (headers, contents) = match split_headers(part) {
        Some(split) => split,
        None => return false,
    };

    let disposition = match headers.get("Content-Disposition") {
        Some(disposition) => disposition.to_string(),
        None => return false,
    };

    let mut name = None;
    let mut filename = None;
    for piece in syntax::split_outside_quotes(&disposition, ';').iter().skip(1) {
        let (attr, value) = syntax::parse_kv(piece.trim());
        match attr.as_str() {
            "name" => name = Some(value),
            "filename" => filename = Some(value),
            _ => {}
        }
    }
    let name = match name {
        Some(name) => name,
        None => return false,
    };

    match filename {
        Some(filename) => {
            let content_type = headers
                .get(consts::H_CONTENT_TYPE)
                .map(MimeType::parse)
                .unwrap_or_else(|| MimeType::parse(consts::H_MEDIA_TEXT));
            files.push((name, RequestFile {
                filename,
                content_type,
                headers,
                contents: contents.to_vec(),
            }));
        }
        None => post.append(&name, &String::from_utf8_lossy(contents)),
    }
    true
}

// Splits a part into its header fields and content at the blank line.
fn split_headers(part: &[u8]) -> Option<(Headers, &[u8])> {
    let mut headers = Headers::new();
    let mut rest = part;

    loop {
        let line_end = find_bytes(rest, b"\n", 0)?;
        let line = String::from_utf8_lossy(&rest[..line_end]);
        let line = line.trim_end_matches('\r');
        rest = &rest[line_end + 1..];

        if line.is_empty() {
            return Some((headers, rest));
        }
        let colon = line.find(':')?;
        headers.append(line[..colon].trim(), line[colon + 1..].trim());
    }
}

fn skip_line_break(data: &[u8]) -> Option<usize> {
    if data.starts_with(b"\r\n") {
        Some(2)
    } else if data.starts_with(b"\n") {
        Some(1)
    } else {
        None
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|index| index + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fields_and_files() {
        let body = b"--xyz\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\
            \r\n\
            hello\r\n\
            --xyz\r\n\
            Content-Disposition: form-data; name=\"upload\"; filename=\"a.bin\"\r\n\
            Content-Type: application/octet-stream\r\n\
            \r\n\
            \x00\x01\x02\r\n\
            --xyz--\r\n";

        let mut post = DataMap::new();
        let mut files = Vec::new();
        assert!(parse_form_data(body, "xyz", &mut post, &mut files));

        assert_eq!(post.get("title"), Some("hello"));
        assert_eq!(files.len(), 1);
        let (name, file) = &files[0];
        assert_eq!(name, "upload");
        assert_eq!(file.filename, "a.bin");
        assert!(file.content_type.matches("application/octet-stream"));
        assert_eq!(file.contents, vec![0, 1, 2]);
    }

    #[test]
    fn file_without_content_type_defaults_to_text() {
        let body = b"--b\r\n\
            Content-Disposition: form-data; name=\"f\"; filename=\"x.txt\"\r\n\
            \r\n\
            data\r\n\
            --b--\r\n";
        let mut post = DataMap::new();
        let mut files = Vec::new();
        assert!(parse_form_data(body, "b", &mut post, &mut files));
        assert!(files[0].1.content_type.matches("text/plain"));
    }

    #[test]
    fn rejects_missing_terminator() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"f\"\r\n\r\nvalue";
        let mut post = DataMap::new();
        let mut files = Vec::new();
        assert!(!parse_form_data(body, "b", &mut post, &mut files));
    }

    #[test]
    fn rejects_part_without_disposition() {
        let body = b"--b\r\nContent-Type: text/plain\r\n\r\nvalue\r\n--b--\r\n";
        let mut post = DataMap::new();
        let mut files = Vec::new();
        assert!(!parse_form_data(body, "b", &mut post, &mut files));
    }
}
