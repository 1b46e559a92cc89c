use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

use crate::errors::PlistError;
use crate::value::{Dictionary, PlistValue};

const XML_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const PLIST_DOCTYPE: &str = "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n";
const INDENT: &str = "    ";

/// Render a dictionary as an XML property list document.
pub fn write_plist(dict: &Dictionary) -> String {
    let mut out = String::new();
    out.push_str(XML_PROLOG);
    out.push_str(PLIST_DOCTYPE);
    out.push_str("<plist version=\"1.0\">\n");
    write_dict(&mut out, dict, 1);
    out.push_str("</plist>\n");
    out
}

fn write_dict(out: &mut String, dict: &Dictionary, depth: usize) {
    let pad = INDENT.repeat(depth);
    if dict.is_empty() {
        out.push_str(&format!("{pad}<dict/>\n"));
        return;
    }
    out.push_str(&format!("{pad}<dict>\n"));
    for (key, value) in dict.iter() {
        out.push_str(&format!("{pad}{INDENT}<key>{}</key>\n", escape(key)));
        write_value(out, value, depth + 1);
    }
    out.push_str(&format!("{pad}</dict>\n"));
}

fn write_value(out: &mut String, value: &PlistValue, depth: usize) {
    let pad = INDENT.repeat(depth);
    match value {
        PlistValue::String(text) => {
            out.push_str(&format!("{pad}<string>{}</string>\n", escape(text.as_str())));
        }
        PlistValue::Bool(true) => out.push_str(&format!("{pad}<true/>\n")),
        PlistValue::Bool(false) => out.push_str(&format!("{pad}<false/>\n")),
        PlistValue::Array(items) if items.is_empty() => {
            out.push_str(&format!("{pad}<array/>\n"));
        }
        PlistValue::Array(items) => {
            out.push_str(&format!("{pad}<array>\n"));
            for item in items {
                write_value(out, item, depth + 1);
            }
            out.push_str(&format!("{pad}</array>\n"));
        }
        PlistValue::Dict(dict) => write_dict(out, dict, depth),
    }
}

pub fn read_plist_file(path: &Path) -> Result<Dictionary, PlistError> {
    let xml = fs::read_to_string(path)?;
    read_plist(&xml)
}

enum Frame {
    Dict {
        dict: Dictionary,
        pending_key: Option<String>,
    },
    Array(Vec<PlistValue>),
}

/// Scalar element currently collecting text.
enum Capture {
    Key,
    Scalar,
}

/// Parse an XML property list whose root value is a dictionary.
pub fn read_plist(xml: &str) -> Result<Dictionary, PlistError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<PlistValue> = None;
    let mut capture: Option<Capture> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(event)) => {
                let name = String::from_utf8_lossy(event.name().as_ref()).to_string();
                match name.as_str() {
                    "plist" => {}
                    "dict" => stack.push(Frame::Dict {
                        dict: Dictionary::new(),
                        pending_key: None,
                    }),
                    "array" => stack.push(Frame::Array(Vec::new())),
                    "key" => {
                        capture = Some(Capture::Key);
                        text.clear();
                    }
                    "string" | "integer" | "real" | "date" | "data" => {
                        capture = Some(Capture::Scalar);
                        text.clear();
                    }
                    _ => return Err(PlistError::UnexpectedElement(name)),
                }
            }
            Ok(Event::Empty(event)) => {
                let name = String::from_utf8_lossy(event.name().as_ref()).to_string();
                let value = match name.as_str() {
                    "true" => PlistValue::Bool(true),
                    "false" => PlistValue::Bool(false),
                    "string" | "integer" | "real" | "date" | "data" => {
                        PlistValue::String(String::new())
                    }
                    "dict" => PlistValue::Dict(Dictionary::new()),
                    "array" => PlistValue::Array(Vec::new()),
                    _ => return Err(PlistError::UnexpectedElement(name)),
                };
                push_value(&mut stack, &mut root, value)?;
            }
            Ok(Event::Text(event)) => {
                if capture.is_some() {
                    let decoded = event
                        .decode()
                        .map_err(|err| PlistError::Malformed(err.to_string()))?;
                    text.push_str(&decoded);
                }
            }
            Ok(Event::CData(event)) => {
                if capture.is_some() {
                    text.push_str(&String::from_utf8_lossy(&event));
                }
            }
            Ok(Event::GeneralRef(event)) => {
                if capture.is_some() {
                    let resolved = match event
                        .resolve_char_ref()
                        .map_err(|err| PlistError::Malformed(err.to_string()))?
                    {
                        Some(ch) => ch,
                        None => {
                            let name = event
                                .decode()
                                .map_err(|err| PlistError::Malformed(err.to_string()))?;
                            resolve_entity(&name)?
                        }
                    };
                    text.push(resolved);
                }
            }
            Ok(Event::End(event)) => {
                let name = String::from_utf8_lossy(event.name().as_ref()).to_string();
                match name.as_str() {
                    "plist" => {}
                    "key" => {
                        capture = None;
                        match stack.last_mut() {
                            Some(Frame::Dict { pending_key, .. }) => {
                                *pending_key = Some(std::mem::take(&mut text));
                            }
                            _ => {
                                return Err(PlistError::Malformed(
                                    "<key> outside of <dict>".to_string(),
                                ));
                            }
                        }
                    }
                    "string" | "integer" | "real" | "date" | "data" => {
                        capture = None;
                        let value = PlistValue::String(std::mem::take(&mut text));
                        push_value(&mut stack, &mut root, value)?;
                    }
                    "dict" | "array" => {
                        let value = match stack.pop() {
                            Some(Frame::Dict { dict, .. }) if name == "dict" => {
                                PlistValue::Dict(dict)
                            }
                            Some(Frame::Array(items)) if name == "array" => {
                                PlistValue::Array(items)
                            }
                            _ => {
                                return Err(PlistError::Malformed(format!(
                                    "unbalanced </{name}>"
                                )));
                            }
                        };
                        push_value(&mut stack, &mut root, value)?;
                    }
                    _ => return Err(PlistError::UnexpectedElement(name)),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(PlistError::Malformed(err.to_string())),
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(PlistError::Malformed("unterminated container".to_string()));
    }
    match root {
        Some(PlistValue::Dict(dict)) => Ok(dict),
        Some(_) => Err(PlistError::Malformed(
            "root value is not a <dict>".to_string(),
        )),
        None => Err(PlistError::Malformed("document has no root value".to_string())),
    }
}

fn push_value(
    stack: &mut [Frame],
    root: &mut Option<PlistValue>,
    value: PlistValue,
) -> Result<(), PlistError> {
    match stack.last_mut() {
        Some(Frame::Dict { dict, pending_key }) => {
            let key = pending_key
                .take()
                .ok_or_else(|| PlistError::Malformed("dict value without <key>".to_string()))?;
            dict.insert(key, value);
        }
        Some(Frame::Array(items)) => items.push(value),
        None => {
            if root.is_some() {
                return Err(PlistError::Malformed("multiple root values".to_string()));
            }
            *root = Some(value);
        }
    }
    Ok(())
}

fn resolve_entity(name: &str) -> Result<char, PlistError> {
    match name {
        "amp" => Ok('&'),
        "lt" => Ok('<'),
        "gt" => Ok('>'),
        "quot" => Ok('"'),
        "apos" => Ok('\''),
        other => Err(PlistError::Malformed(format!("unknown entity &{other};"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_values_and_entities() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
<plist version=\"1.0\">\n\
  <dict>\n\
    <key>CFBundleName</key>\n\
    <string>Tom &amp; Jerry</string>\n\
    <key>JVMOptions</key>\n\
    <array>\n\
      <string>-Xmx512m</string>\n\
      <string>-Dapp.name=a&lt;b</string>\n\
    </array>\n\
    <key>NSHighResolutionCapable</key>\n\
    <true/>\n\
    <key>Build</key>\n\
    <integer>42</integer>\n\
    <key>Nested</key>\n\
    <dict>\n\
      <key>Inner</key>\n\
      <false/>\n\
    </dict>\n\
  </dict>\n\
</plist>\n";

        let dict = read_plist(xml).expect("parse plist");
        assert_eq!(dict.string("CFBundleName"), Some("Tom & Jerry"));
        assert_eq!(dict.strings("JVMOptions"), vec!["-Xmx512m", "-Dapp.name=a<b"]);
        assert_eq!(dict.bool("NSHighResolutionCapable"), Some(true));
        assert_eq!(dict.string("Build"), Some("42"));
        let nested = dict
            .get("Nested")
            .and_then(PlistValue::as_dict)
            .expect("nested dict");
        assert_eq!(nested.bool("Inner"), Some(false));
    }

    #[test]
    fn rejects_unknown_elements() {
        let err = read_plist("<plist><dict><key>A</key><blob>x</blob></dict></plist>")
            .expect_err("unknown element");
        assert!(err.to_string().contains("<blob>"));
    }

    #[test]
    fn rejects_non_dict_root() {
        let err = read_plist("<plist><array/></plist>").expect_err("array root");
        assert!(err.to_string().contains("root value"));
    }

    #[test]
    fn written_plist_reads_back_with_escaped_text() {
        let mut dict = Dictionary::new();
        dict.insert("Name", "R&D <tools>");
        dict.insert("Empty", PlistValue::Array(Vec::new()));

        let xml = write_plist(&dict);
        assert!(xml.contains("<string>R&amp;D &lt;tools&gt;</string>"));
        assert!(xml.contains("        <array/>\n"));

        let parsed = read_plist(&xml).expect("read back");
        assert_eq!(parsed, dict);
    }
}
