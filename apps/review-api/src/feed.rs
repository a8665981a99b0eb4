//! RSS 2.0 feed of a review's activity

use anyhow::Result;
use chrono::DateTime;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use std::io::Cursor;

use crate::models::DbActivity;

const DESCRIPTION: &str = "This feed lists the latest changes to the review. \
    It does not include your own changes.";

/// Channel-level details of a review feed
pub struct ReviewFeed<'a> {
    pub review_id: &'a str,
    /// Review title, if the review still exists
    pub title: Option<&'a str>,
    pub link: &'a str,
    pub branding: &'a str,
}

impl ReviewFeed<'_> {
    /// Serialize the feed with one item per activity row
    pub fn render(&self, activity: &[DbActivity]) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        writer.write_event(Event::Start(rss))?;
        writer.write_event(Event::Start(BytesStart::new("channel")))?;

        let title = match self.title {
            Some(title) => format!("{}: review updates", title),
            None => "Review updates".to_string(),
        };
        write_simple_element(&mut writer, "title", &title)?;
        write_simple_element(&mut writer, "link", self.link)?;
        write_simple_element(&mut writer, "description", DESCRIPTION)?;

        for row in activity {
            writer.write_event(Event::Start(BytesStart::new("item")))?;
            write_simple_element(&mut writer, "title", &format!("Activity #{}", row.id))?;
            write_simple_element(&mut writer, "link", self.link)?;
            // Activity messages are stored as HTML fragments
            write_simple_element(&mut writer, "description", &row.msg)?;
            if let Some(date) = DateTime::from_timestamp(row.timestamp, 0) {
                write_simple_element(&mut writer, "pubDate", &date.to_rfc2822())?;
            }

            let mut guid = BytesStart::new("guid");
            guid.push_attribute(("isPermaLink", "false"));
            writer.write_event(Event::Start(guid))?;
            let guid_text = format!("{}-review-{}-{}", self.branding, self.review_id, row.id);
            writer.write_event(Event::Text(BytesText::new(&guid_text)))?;
            writer.write_event(Event::End(BytesEnd::new("guid")))?;

            writer.write_event(Event::End(BytesEnd::new("item")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("channel")))?;
        writer.write_event(Event::End(BytesEnd::new("rss")))?;

        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }
}

fn write_simple_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(id: i64, msg: &str) -> DbActivity {
        DbActivity {
            id,
            review_id: "rev1".to_string(),
            owner: "bob@example.com".to_string(),
            msg: msg.to_string(),
            timestamp: 1_700_000_000,
        }
    }

    fn feed(title: Option<&str>) -> ReviewFeed<'_> {
        ReviewFeed {
            review_id: "rev1",
            title,
            link: "https://reviews.example.com/?review=rev1",
            branding: "Acme",
        }
    }

    #[test]
    fn test_channel_and_items() {
        let xml = feed(Some("Design notes"))
            .render(&[activity(7, "<b>Bob</b> added a comment: ok")])
            .unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel>"#));
        assert!(xml.contains("<title>Design notes: review updates</title>"));
        assert!(xml.contains("<title>Activity #7</title>"));
        assert!(xml.contains("<description>&lt;b&gt;Bob&lt;/b&gt; added a comment: ok</description>"));
        assert!(xml.contains(r#"<guid isPermaLink="false">Acme-review-rev1-7</guid>"#));
        assert!(xml.contains("<pubDate>Tue, 14 Nov 2023 22:13:20 +0000</pubDate>"));
        assert!(xml.ends_with("</channel></rss>"));
    }

    #[test]
    fn test_missing_review_uses_generic_title() {
        let xml = feed(None).render(&[]).unwrap();
        assert!(xml.contains("<title>Review updates</title>"));
        assert!(!xml.contains("<item>"));
    }

    #[test]
    fn test_title_is_escaped() {
        let xml = feed(Some("Q&A <draft>")).render(&[]).unwrap();
        assert!(xml.contains("<title>Q&amp;A &lt;draft&gt;: review updates</title>"));
    }
}
