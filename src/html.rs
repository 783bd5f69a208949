//! HTML rendering for date listings.
//!
//! Markup is produced with `quick-xml` so object keys are always escaped,
//! both as link text and inside `href` attributes.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use crate::routing::DateKey;

/// Render the index page for one date.
///
/// ```html
/// <html><body>
///   <h1>Looking at 2024/05/01</h1>
///   <a href="/2024/05/01/a.jpg">2024/05/01/a.jpg</a><br/>
/// </body></html>
/// ```
///
/// Links appear in the order of `keys`.
pub fn render_listing(date: &DateKey, keys: &[String]) -> String {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    start(&mut writer, "html");
    start(&mut writer, "body");

    start(&mut writer, "h1");
    text(&mut writer, &format!("Looking at {date}"));
    end(&mut writer, "h1");

    for key in keys {
        let href = format!("/{key}");
        writer
            .write_event(Event::Start(
                BytesStart::new("a").with_attributes([("href", href.as_str())]),
            ))
            .expect("start a");
        text(&mut writer, key);
        end(&mut writer, "a");
        writer
            .write_event(Event::Empty(BytesStart::new("br")))
            .expect("br");
    }

    end(&mut writer, "body");
    end(&mut writer, "html");

    String::from_utf8(writer.into_inner().into_inner()).expect("valid utf-8")
}

fn start(writer: &mut Writer<Cursor<Vec<u8>>>, tag: &str) {
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .expect("start tag");
}

fn end(writer: &mut Writer<Cursor<Vec<u8>>>, tag: &str) {
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .expect("end tag");
}

fn text(writer: &mut Writer<Cursor<Vec<u8>>>, value: &str) {
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .expect("text");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn may_first() -> DateKey {
        DateKey::parse("2024", "05", "01").unwrap()
    }

    #[test]
    fn test_render_listing_links_in_order() {
        let keys = vec![
            "2024/05/01/b.jpg".to_string(),
            "2024/05/01/a.jpg".to_string(),
        ];
        let html = render_listing(&may_first(), &keys);

        assert!(html.starts_with("<html><body><h1>Looking at 2024/05/01</h1>"));
        let b = html
            .find(r#"<a href="/2024/05/01/b.jpg">2024/05/01/b.jpg</a><br/>"#)
            .unwrap();
        let a = html
            .find(r#"<a href="/2024/05/01/a.jpg">2024/05/01/a.jpg</a><br/>"#)
            .unwrap();
        assert!(b < a);
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn test_render_listing_empty() {
        let html = render_listing(&may_first(), &[]);
        assert_eq!(
            html,
            "<html><body><h1>Looking at 2024/05/01</h1></body></html>"
        );
    }

    #[test]
    fn test_render_listing_escapes_keys() {
        let keys = vec![r#"2024/05/01/<script>"x"&.jpg"#.to_string()];
        let html = render_listing(&may_first(), &keys);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp;"));
        assert!(html.contains("&quot;"));
    }
}
