//! Strips scriptable content from uploaded SVG brand assets.
//!
//! Brand files are served from `/uploads` on the same origin as the admin
//! console, so an SVG must not carry scripts, event handlers, embedded
//! documents or external references.

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::Cursor;

/// Elements dropped together with everything inside them.
const BLOCKED_ELEMENTS: &[&str] = &[
    "script",
    "foreignobject",
    "iframe",
    "embed",
    "object",
    "applet",
    "set",
    "animate",
    "animatetransform",
    "animatemotion",
    "handler",
    "listener",
];

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:text/html", "data:application"];

const URI_ATTRIBUTES: &[&str] = &["href", "xlink:href", "src", "action", "formaction"];

/// Return a cleaned copy of `input`, or an error if it is not a well-formed SVG.
pub fn sanitize_svg(input: &[u8]) -> Result<Vec<u8>, String> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    // Depth inside a blocked element; 0 means we are writing
    let mut skipping: usize = 0;
    let mut root_seen = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("Invalid SVG: {}", e))?;
        let out = match event {
            Event::Eof => break,
            Event::Start(e) => {
                if skipping > 0 || is_blocked(&e) {
                    skipping += 1;
                    continue;
                }
                root_seen |= local_name(&e) == "svg";
                Event::Start(scrub(&e))
            }
            Event::End(e) => {
                if skipping > 0 {
                    skipping -= 1;
                    continue;
                }
                Event::End(e)
            }
            Event::Empty(e) => {
                if skipping > 0 || is_blocked(&e) || external_use(&e) {
                    continue;
                }
                root_seen |= local_name(&e) == "svg";
                Event::Empty(scrub(&e))
            }
            // Comments can hide conditional markup; DOCTYPE can declare entities
            Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
            _ if skipping > 0 => continue,
            other => other,
        };
        writer
            .write_event(out)
            .map_err(|e| format!("Could not rewrite SVG: {}", e))?;
    }

    if !root_seen {
        return Err("Not an SVG image".to_string());
    }
    Ok(writer.into_inner().into_inner())
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_lowercase()
}

fn is_blocked(e: &BytesStart) -> bool {
    BLOCKED_ELEMENTS.contains(&local_name(e).as_str())
}

/// `<use>` pointing off-document pulls in content we never saw.
fn external_use(e: &BytesStart) -> bool {
    if local_name(e) != "use" {
        return false;
    }
    e.attributes().flatten().any(|attr| {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_lowercase();
        let value = String::from_utf8_lossy(&attr.value);
        let value = value.trim();
        (key == "href" || key == "xlink:href")
            && (value.starts_with("http://") || value.starts_with("https://") || value.starts_with("//"))
    })
}

fn attribute_allowed(key: &str, value: &str) -> bool {
    let key = key.to_lowercase();
    // onload, onclick, ...
    if key.len() > 2 && key.starts_with("on") {
        return false;
    }
    let value = value.trim().to_lowercase();
    if URI_ATTRIBUTES.contains(&key.as_str()) && BLOCKED_SCHEMES.iter().any(|s| value.starts_with(s)) {
        return false;
    }
    if key == "style" && (value.contains("javascript:") || value.contains("expression(")) {
        return false;
    }
    true
}

fn scrub(e: &BytesStart) -> BytesStart<'static> {
    let mut clean = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => continue,
        };
        if attribute_allowed(&key, &value) {
            clean.push_attribute(Attribute::from((key.as_str(), value.as_str())));
        }
    }
    clean
}
