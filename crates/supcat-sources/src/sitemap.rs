//! Sitemap `<loc>` extraction.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Extract every `<loc>` URL from a sitemap document, in document order.
///
/// Only unprefixed `<loc>` elements count, so `<image:loc>` entries of image
/// sitemaps are ignored. Blank locations are dropped.
///
/// # Errors
///
/// Returns [`quick_xml::Error`] if the XML is malformed.
pub fn parse_sitemap_locs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"loc" {
                    in_loc = true;
                    current.clear();
                }
            }
            Ok(Event::Text(e)) => {
                if in_loc {
                    current.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::CData(e)) => {
                if in_loc {
                    current.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"loc" && in_loc {
                    in_loc = false;
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e),
            _ => {}
        }
    }

    Ok(locs)
}
