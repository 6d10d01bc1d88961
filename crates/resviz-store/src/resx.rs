use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use resviz_core::{ResourceTable, normalize_path};

use crate::StoreError;

pub trait ResourceReader: Send + Sync {
    fn read_table(&self, path: &Path) -> Result<ResourceTable, StoreError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResxReader;

impl ResourceReader for ResxReader {
    fn read_table(&self, path: &Path) -> Result<ResourceTable, StoreError> {
        let raw = fs::read(path)?;
        let text = String::from_utf8_lossy(&raw);
        let text = text.trim_start_matches('\u{feff}');
        let display_path = normalize_path(&path.to_string_lossy());

        let pairs = parse_resx(text).map_err(|message| StoreError::Malformed {
            path: display_path.clone(),
            message,
        })?;

        Ok(ResourceTable::new(&display_path, pairs, &raw))
    }
}

#[derive(Debug)]
struct PendingEntry {
    name: String,
    value: Option<String>,
}

pub fn parse_resx(content: &str) -> Result<Vec<(String, String)>, String> {
    let mut reader = Reader::from_str(content);

    let mut entries = Vec::new();
    let mut pending: Option<PendingEntry> = None;
    let mut value_text: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"data" => pending = text_entry(e)?,
                b"value" if pending.is_some() => value_text = Some(String::new()),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"value"
                    && let Some(entry) = pending.as_mut()
                    && entry.value.is_none()
                {
                    entry.value = Some(String::new());
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(text) = value_text.as_mut() {
                    let unescaped = e
                        .unescape()
                        .map_err(|err| format!("invalid text in <value>: {err}"))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(text) = value_text.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"value" => {
                    if let Some(text) = value_text.take()
                        && let Some(entry) = pending.as_mut()
                        && entry.value.is_none()
                    {
                        entry.value = Some(text);
                    }
                }
                b"data" => {
                    if let Some(PendingEntry {
                        name,
                        value: Some(value),
                    }) = pending.take()
                    {
                        entries.push((name, value));
                    }
                    value_text = None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(format!(
                    "XML parse error at position {}: {err}",
                    reader.error_position()
                ));
            }
            _ => {}
        }
    }

    Ok(entries)
}

fn text_entry(e: &BytesStart<'_>) -> Result<Option<PendingEntry>, String> {
    if attribute(e, "mimetype")?.is_some() {
        return Ok(None);
    }

    if let Some(kind) = attribute(e, "type")?
        && !kind.contains("System.String")
    {
        return Ok(None);
    }

    Ok(attribute(e, "name")?
        .filter(|name| !name.is_empty())
        .map(|name| PendingEntry { name, value: None }))
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, String> {
    let Some(attr) = e
        .try_get_attribute(key)
        .map_err(|err| format!("attribute error: {err}"))?
    else {
        return Ok(None);
    };

    let value = attr
        .unescape_value()
        .map_err(|err| format!("attribute value error: {err}"))?;
    Ok(Some(value.into_owned()))
}
