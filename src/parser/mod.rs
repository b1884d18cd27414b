use html_escape::decode_html_entities;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::app::{Result, TributaryError};

/// Channel metadata plus the items in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RawItem>,
}

/// A single `<item>` as it appeared in the document. The publish date
/// is kept as raw text; turning it into a timestamp is the ingestor's
/// job so one unparseable date cannot fail the whole document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub pub_date: Option<String>,
}

/// Parse an RSS 2.0 feed from raw XML bytes.
pub fn parse_feed(xml: &[u8]) -> Result<ParsedFeed> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut channel = ChannelBuilder::default();
    let mut current_item: Option<RawItemBuilder> = None;
    let mut current_element = String::new();
    let mut saw_channel = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                current_element = name.clone();

                if name == "channel" {
                    saw_channel = true;
                } else if name == "item" {
                    current_item = Some(RawItemBuilder::default());
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if name == "item" {
                    if let Some(builder) = current_item.take() {
                        if let Some(item) = builder.build() {
                            channel.items.push(item);
                        }
                    }
                }
                current_element.clear();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if !text.is_empty() {
                    record(&current_element, text, &mut channel, &mut current_item);
                }
            }
            Ok(Event::CData(e)) => {
                let bytes = e.into_inner();
                let text = String::from_utf8_lossy(&bytes).to_string();
                if !text.is_empty() {
                    record(&current_element, text, &mut channel, &mut current_item);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(TributaryError::FeedParse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    if !saw_channel {
        return Err(TributaryError::FeedParse(
            "document has no channel element".into(),
        ));
    }

    Ok(channel.build())
}

fn record(
    element: &str,
    text: String,
    channel: &mut ChannelBuilder,
    current_item: &mut Option<RawItemBuilder>,
) {
    if let Some(item) = current_item {
        match element {
            "title" => item.title = Some(text),
            "link" => item.link = Some(text),
            "description" => item.description = Some(text),
            "pubDate" => item.pub_date = Some(text),
            _ => {}
        }
    } else {
        // First occurrence wins so nested blocks like <image> cannot
        // overwrite the channel metadata.
        match element {
            "title" if channel.title.is_none() => channel.title = Some(text),
            "link" if channel.link.is_none() => channel.link = Some(text),
            "description" if channel.description.is_none() => channel.description = Some(text),
            _ => {}
        }
    }
}

#[derive(Default)]
struct ChannelBuilder {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    items: Vec<RawItem>,
}

impl ChannelBuilder {
    fn build(self) -> ParsedFeed {
        ParsedFeed {
            title: decode_html_entities(&self.title.unwrap_or_default()).to_string(),
            link: self.link.unwrap_or_default(),
            description: decode_html_entities(&self.description.unwrap_or_default()).to_string(),
            items: self.items,
        }
    }
}

#[derive(Default)]
struct RawItemBuilder {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    pub_date: Option<String>,
}

impl RawItemBuilder {
    fn build(self) -> Option<RawItem> {
        // An item without a link has no identity to dedupe on; drop it.
        Some(RawItem {
            title: decode_html_entities(&self.title.unwrap_or_default()).to_string(),
            link: self.link?,
            description: self
                .description
                .map(|d| decode_html_entities(&d).to_string()),
            pub_date: self.pub_date,
        })
    }
}
