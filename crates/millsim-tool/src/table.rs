//! Tool tables keyed by tool number.

use std::collections::BTreeMap;
use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use crate::error::xml_error;
use crate::{Result, Tool, ToolError, ToolUnits};

/// The tools available to a tool path, keyed by tool number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolTable {
    tools: BTreeMap<u32, Tool>,
    null: Tool,
}

impl ToolTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tool, replacing any tool with the same number.
    pub fn add(&mut self, tool: Tool) -> Option<Tool> {
        self.tools.insert(tool.number(), tool)
    }

    /// Look up a tool by number.
    pub fn get(&self, number: u32) -> Option<&Tool> {
        self.tools.get(&number)
    }

    /// Look up a tool by number, falling back to [`Tool::null`].
    pub fn get_or_null(&self, number: u32) -> &Tool {
        self.tools.get(&number).unwrap_or(&self.null)
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, number: u32) -> Option<&mut Tool> {
        self.tools.get_mut(&number)
    }

    /// True if a tool with this number exists.
    pub fn has(&self, number: u32) -> bool {
        self.tools.contains_key(&number)
    }

    /// Remove a tool.
    pub fn remove(&mut self, number: u32) -> Option<Tool> {
        self.tools.remove(&number)
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True if there are no tools.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Remove every tool.
    pub fn clear(&mut self) {
        self.tools.clear();
    }

    /// Tools in ascending number order.
    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    /// Write a `<tool_table>` element.
    pub fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer
            .write_event(Event::Start(BytesStart::new("tool_table")))
            .map_err(xml_error)?;

        for tool in self.tools.values() {
            let mut elem = BytesStart::new("tool");
            for (key, value) in tool.attributes() {
                elem.push_attribute((key, value.as_str()));
            }

            if tool.description().is_empty() {
                writer.write_event(Event::Empty(elem)).map_err(xml_error)?;
            } else {
                writer.write_event(Event::Start(elem)).map_err(xml_error)?;
                writer
                    .write_event(Event::Text(BytesText::new(tool.description())))
                    .map_err(xml_error)?;
                writer
                    .write_event(Event::End(BytesEnd::new("tool")))
                    .map_err(xml_error)?;
            }
        }

        writer
            .write_event(Event::End(BytesEnd::new("tool_table")))
            .map_err(xml_error)?;
        Ok(())
    }

    /// Serialize to a standalone `<tool_table>` document.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_xml(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }

    /// Read the body of a `<tool_table>` element whose start tag has just
    /// been consumed, up to and including its end tag.
    ///
    /// A `<tool>` that fails to parse is logged and skipped so that the
    /// remaining tools still load. Malformed XML is an error.
    pub fn read_xml(&mut self, reader: &mut Reader<&[u8]>) -> Result<()> {
        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) if e.name().as_ref() == b"tool" => {
                    let attrs = read_attributes(&e)?;
                    let description = read_text(reader, b"tool")?;
                    self.load_tool(&attrs, description);
                }
                Event::Empty(e) if e.name().as_ref() == b"tool" => {
                    let attrs = read_attributes(&e)?;
                    self.load_tool(&attrs, String::new());
                }
                Event::End(e) if e.name().as_ref() == b"tool_table" => return Ok(()),
                Event::Eof => {
                    return Err(ToolError::Xml("unterminated <tool_table>".into()));
                }
                _ => {}
            }
        }
    }

    /// Parse a document containing a `<tool_table>` element.
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut table = Self::new();
        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) if e.name().as_ref() == b"tool_table" => {
                    table.read_xml(&mut reader)?;
                    return Ok(table);
                }
                Event::Empty(e) if e.name().as_ref() == b"tool_table" => return Ok(table),
                Event::Eof => return Ok(table),
                _ => {}
            }
        }
    }

    fn load_tool(&mut self, attrs: &BTreeMap<String, String>, description: String) {
        let Some(number) = attrs.get("number").and_then(|n| n.trim().parse::<u32>().ok()) else {
            log::warn!("skipping <tool> without a valid number: {:?}", attrs.get("number"));
            return;
        };

        let mut tool = Tool::new(number, number, ToolUnits::Mm);
        match tool.read_attributes(attrs) {
            Ok(()) => {
                tool.set_description(description);
                self.add(tool);
            }
            Err(err) => log::warn!("skipping tool {}: {}", number, err),
        }
    }

    /// JSON object keyed by tool number.
    pub fn to_json(&self) -> Value {
        let dict: Map<String, Value> = self
            .tools
            .iter()
            .map(|(number, tool)| (number.to_string(), tool.to_json(false)))
            .collect();
        Value::Object(dict)
    }

    /// Replace the contents from a JSON object keyed by tool number.
    ///
    /// Entries that fail to parse are logged and skipped.
    pub fn read_json(&mut self, value: &Value) -> Result<()> {
        let dict = value
            .as_object()
            .ok_or_else(|| ToolError::Json(format!("expected tool table object, got {}", value)))?;

        self.tools.clear();
        for (key, entry) in dict {
            let Ok(number) = key.trim().parse::<u32>() else {
                log::warn!("skipping tool with invalid number '{}'", key);
                continue;
            };

            let mut tool = Tool::new(number, number, ToolUnits::Mm);
            match tool.read_json(entry).and_then(|_| tool.validate()) {
                Ok(()) => {
                    tool.set_number(number);
                    self.add(tool);
                }
                Err(err) => log::warn!("skipping tool {}: {}", number, err),
            }
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a ToolTable {
    type Item = &'a Tool;
    type IntoIter = std::collections::btree_map::Values<'a, u32, Tool>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.values()
    }
}

fn read_attributes(e: &BytesStart) -> Result<BTreeMap<String, String>> {
    let mut attrs = BTreeMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(xml_error)?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) if e.name().as_ref() == end => return Ok(text),
            Event::Eof => {
                return Err(ToolError::Xml(format!(
                    "unterminated <{}>",
                    String::from_utf8_lossy(end)
                )))
            }
            _ => {}
        }
    }
}
