//! pdfmark markup for a review's comments
//!
//! Ghostscript reads the generated PostScript before the source PDF and turns
//! each `/ANN pdfmark` into a real annotation. The optional overlay redraws
//! every anchored comment as a filled box, which survives rasterisation to
//! PNG where interactive annotations are dropped.

use crate::comment::{Comment, ReplyIndex, MAX_THREAD_DEPTH};
use crate::escape::escape_ps;
use crate::geometry::place;

const RC_OPEN: &str = r#"<?xml version="1.0"?><body xmlns="http://www.w3.org/1999/xhtml" xmlns:xfa="http://www.xfa.org/schema/xfa-data/1.0/" xfa:APIVersion="Acrobat:15.23.0" xfa:spec="2.0.2">"#;
const RC_CLOSE: &str = "</body>";

const OVERLAY_PROCS: &str = "\
/roundbox { % needs width, height and corner radius
    /radius exch def /height exch def /width exch def
    radius 1 lt { /radius 1  def } if
    width  2 lt { /width  10 def } if
    height 2 lt { /height 10 def } if
    0 radius moveto
    0 height width height radius arcto 4 {pop} repeat
    width height width 0 radius arcto 4 {pop} repeat
    width 0 0 0 radius arcto 4 {pop} repeat
    0 0 0 height radius arcto 4 {pop} repeat
    closepath
} def

/highlight { % xll yll xur yur  r g b
    /colb exch def /colg exch def /colr exch def
    /yur exch def /xur exch def /yll exch def /xll exch def
    xll yll moveto
    gsave
        currentpoint translate
        xur xll sub yur yll sub 1 roundbox
        colr colg colb setrgbcolor fill
    grestore
} def

";

/// Options for one markup document
#[derive(Debug, Clone)]
pub struct MarkupOptions<'a> {
    /// Brand shown in the document producer field
    pub producer: &'a str,
    /// Subtracted from every page number, for exports of a page subrange
    pub page_offset: i64,
    /// Also paint each comment's box onto the page content
    pub highlight_overlay: bool,
}

/// Page number tracked by the generated PostScript while Ghostscript renders.
///
/// The counter only exists inside the output; each `/BeginPage` call
/// compares against it and advances it once per shown page.
struct PageCounter {
    name: &'static str,
    start: i64,
}

impl PageCounter {
    const OUTPUT: PageCounter = PageCounter {
        name: "pageNum",
        start: 1,
    };

    fn init(&self) -> String {
        format!("globaldict /{} {} put\n\n", self.name, self.start)
    }

    fn matches(&self, page: i64) -> String {
        format!("    {} {} eq {{\n", self.name, page)
    }

    fn advance(&self) -> String {
        format!(
            "    showCount 1 eq {{\n        globaldict /{name} {name} 1 add put\n    }} if\n",
            name = self.name
        )
    }
}

/// Render the annotation markup for every anchored comment
pub fn render_markup(comments: &[Comment], options: &MarkupOptions<'_>) -> String {
    let index = ReplyIndex::new(comments);
    let counter = PageCounter::OUTPUT;
    let mut overlay = String::new();

    let mut ps = String::from("%!PS\n\n");
    ps.push_str(&format!(
        "[ /Producer ({} PDF Review)\n",
        escape_ps(options.producer)
    ));
    ps.push_str("  /DOCINFO pdfmark\n\n");

    for comment in comments.iter().filter(|c| c.is_anchored()) {
        let kind = comment.annotation_kind();
        let placement = place(&comment.rects, kind);
        let page = comment.page_id.unwrap_or(0) + 1 - options.page_offset;

        ps.push_str(&format!("[ /Rect [{}]\n", placement.bbox.to_ps()));
        ps.push_str(&format!("  /Subtype /{}\n", kind.subtype()));
        ps.push_str(&format!("  /Color [{}]\n", kind.color()));
        ps.push_str(&format!("  /SrcPg {}\n", page));
        if !placement.quad_points.is_empty() {
            ps.push_str(&format!(
                "  /QuadPoints [{}]\n",
                placement.quad_points_ps()
            ));
        }
        ps.push_str(&format!("  /Title ({})\n", title(comment)));

        let mut body = format_message(&comment.msg);
        render_replies(&index, &comment.id, 1, &mut body);
        ps.push_str(&format!("  /RC ({}{}{})\n", RC_OPEN, body, RC_CLOSE));
        ps.push_str("  /ANN pdfmark\n\n");

        overlay.push_str(&counter.matches(page));
        overlay.push_str(&format!(
            "        {}  {} highlight\n",
            placement.bbox.to_ps(),
            kind.color()
        ));
        overlay.push_str("    } if\n");
    }

    if options.highlight_overlay {
        ps.push_str(OVERLAY_PROCS);
        ps.push_str(&counter.init());
        ps.push_str("<< /BeginPage {\n");
        ps.push_str("    /showCount exch def\n");
        ps.push_str(&overlay);
        ps.push_str(&counter.advance());
        ps.push_str("} bind\n");
        ps.push_str(">> setpagedevice\n\n");
    }

    ps
}

/// Author with an optional ` (status)` badge
fn title(comment: &Comment) -> String {
    let author = escape_ps(&comment.author);
    if comment.has_status() {
        format!("{} \\({}\\)", author, escape_ps(&comment.status))
    } else {
        author
    }
}

fn format_message(message: &str) -> String {
    format!("<p>{}</p>", escape_ps(message))
}

/// Append the reply thread below `parent`, indented two spaces per level
fn render_replies(index: &ReplyIndex<'_>, parent: &str, depth: usize, out: &mut String) {
    if depth > MAX_THREAD_DEPTH {
        tracing::warn!("Reply thread below {} exceeds maximum depth", parent);
        return;
    }

    let indent = format!("\n{}", "  ".repeat(depth));
    for reply in index.replies_to(parent) {
        out.push_str(&format!(
            "\n{}<p><b>{}</b></p>",
            indent,
            escape_ps(&reply.author)
        ));
        out.push_str(&indent);
        out.push_str(&format_message(&reply.msg).replace('\n', &indent));
        render_replies(index, &reply.id, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::Rect;
    use pretty_assertions::assert_eq;

    fn root(id: &str, kind: &str, page: i64, rects: Vec<Rect>) -> Comment {
        Comment {
            id: id.to_string(),
            author: "Ann".to_string(),
            msg: format!("root {}", id),
            status: "None".to_string(),
            secs_utc: Some(0),
            deleted: false,
            rects,
            owner: false,
            page_id: Some(page),
            kind: Some(kind.to_string()),
            reply_to_id: None,
            unread: false,
        }
    }

    fn reply(id: &str, to: &str, author: &str) -> Comment {
        Comment {
            id: id.to_string(),
            author: author.to_string(),
            msg: format!("reply {}", id),
            status: "None".to_string(),
            secs_utc: Some(0),
            deleted: false,
            rects: Vec::new(),
            owner: false,
            page_id: None,
            kind: None,
            reply_to_id: Some(to.to_string()),
            unread: false,
        }
    }

    fn options(page_offset: i64, highlight_overlay: bool) -> MarkupOptions<'static> {
        MarkupOptions {
            producer: "Acme",
            page_offset,
            highlight_overlay,
        }
    }

    #[test]
    fn test_header_only_without_anchored_comments() {
        let mut gone = root("a", "highlight", 0, vec![Rect::new([0.0, 0.0], [1.0, 1.0])]);
        gone.deleted = true;
        let comments = vec![gone, reply("b", "nowhere", "Bob")];
        let ps = render_markup(&comments, &options(0, false));
        assert_eq!(ps, "%!PS\n\n[ /Producer (Acme PDF Review)\n  /DOCINFO pdfmark\n\n");
        assert!(!ps.contains("/ANN pdfmark"));
    }

    #[test]
    fn test_highlight_block() {
        let comments = vec![root(
            "a",
            "highlight",
            2,
            vec![Rect::new([10.0, 700.0], [110.0, 688.5])],
        )];
        let ps = render_markup(&comments, &options(0, false));
        let expected = format!(
            "[ /Rect [10 688.5 110 700]\n  /Subtype /Highlight\n  /Color [1 0.95 0.66]\n  /SrcPg 3\n  /QuadPoints [10 700 110 700 10 688.5 110 688.5]\n  /Title (Ann)\n  /RC ({}<p>root a</p></body>)\n  /ANN pdfmark\n\n",
            RC_OPEN
        );
        assert!(ps.ends_with(&expected), "{}", ps);
    }

    #[test]
    fn test_strike_and_text_subtypes() {
        let comments = vec![
            root("s", "strike", 0, vec![Rect::new([0.0, 0.0], [5.0, 5.0])]),
            root("t", "text", 0, vec![Rect::new([7.0, 8.0], [9.0, 1.0])]),
        ];
        let ps = render_markup(&comments, &options(0, false));
        assert!(ps.contains("/Subtype /StrikeOut\n  /Color [1 0.7 0.7]"));
        assert!(ps.contains("[ /Rect [7 8 7 8]\n  /Subtype /Text\n  /Color [1 0.95 0.66]"));
        assert_eq!(ps.matches("/QuadPoints").count(), 1);
    }

    #[test]
    fn test_page_offset() {
        let comments = vec![root("a", "highlight", 4, vec![Rect::new([0.0, 0.0], [1.0, 1.0])])];
        let ps = render_markup(&comments, &options(4, false));
        assert!(ps.contains("/SrcPg 1\n"));
    }

    #[test]
    fn test_title_status_badge() {
        let mut c = root("a", "highlight", 0, vec![Rect::new([0.0, 0.0], [1.0, 1.0])]);
        c.author = "Ann (QA)".to_string();
        c.status = "Accepted".to_string();
        let ps = render_markup(&[c], &options(0, false));
        assert!(ps.contains(r"/Title (Ann \(QA\) \(Accepted\))"));
    }

    #[test]
    fn test_reply_thread_depth_order() {
        let mut d = reply("d", "a", "Dee");
        d.deleted = true;
        let comments = vec![
            root("a", "highlight", 0, vec![Rect::new([0.0, 0.0], [1.0, 1.0])]),
            reply("b", "a", "Bob"),
            reply("c", "b", "Cat"),
            d,
        ];
        let ps = render_markup(&comments, &options(0, false));
        let expected = format!(
            "  /RC ({}<p>root a</p>\n\n  <p><b>Bob</b></p>\n  <p>reply b</p>\n\n    <p><b>Cat</b></p>\n    <p>reply c</p></body>)\n",
            RC_OPEN
        );
        assert!(ps.contains(&expected), "{}", ps);
        assert!(!ps.contains("Dee"));
        assert_eq!(ps.matches("/ANN pdfmark").count(), 1);
    }

    #[test]
    fn test_multiline_reply_is_indented() {
        let mut b = reply("b", "a", "Bob");
        b.msg = "one\ntwo".to_string();
        let comments = vec![
            root("a", "text", 0, vec![Rect::new([0.0, 0.0], [1.0, 1.0])]),
            b,
        ];
        let ps = render_markup(&comments, &options(0, false));
        assert!(ps.contains("\n  <p>one\n  two</p>"));
    }

    #[test]
    fn test_message_escaped() {
        let mut c = root("a", "text", 0, vec![Rect::new([0.0, 0.0], [1.0, 1.0])]);
        c.msg = "50% <b>(sic)</b>\0".to_string();
        let ps = render_markup(&[c], &options(0, false));
        assert!(ps.contains(r"<p>50\% &lt;b&gt;\(sic\)&lt;/b&gt;</p>"));
    }

    #[test]
    fn test_backslash_cannot_close_rich_content() {
        let mut c = root("a", "text", 0, vec![Rect::new([0.0, 0.0], [1.0, 1.0])]);
        c.msg = r"C:\) /Title (pwned".to_string();
        let ps = render_markup(&[c], &options(0, false));
        assert!(ps.contains(r"<p>C:\\\) /Title \(pwned</p></body>)"), "{}", ps);
    }

    #[test]
    fn test_overlay_block() {
        let comments = vec![
            root("a", "highlight", 0, vec![Rect::new([10.0, 20.0], [30.0, 40.0])]),
            root("b", "strike", 1, vec![Rect::new([1.0, 2.0], [3.0, 4.0])]),
        ];
        let ps = render_markup(&comments, &options(0, true));
        assert!(ps.contains("/roundbox {"));
        assert!(ps.contains("/highlight {"));
        assert!(ps.contains("globaldict /pageNum 1 put\n"));
        assert!(ps.contains(
            "    pageNum 1 eq {\n        10 20 30 40  1 0.95 0.66 highlight\n    } if\n"
        ));
        assert!(ps.contains(
            "    pageNum 2 eq {\n        1 2 3 4  1 0.7 0.7 highlight\n    } if\n"
        ));
        assert!(ps.contains("globaldict /pageNum pageNum 1 add put"));
        assert!(ps.ends_with(">> setpagedevice\n\n"));
    }

    #[test]
    fn test_no_overlay_when_disabled() {
        let comments = vec![root("a", "highlight", 0, vec![Rect::new([0.0, 0.0], [1.0, 1.0])])];
        let ps = render_markup(&comments, &options(0, false));
        assert!(!ps.contains("setpagedevice"));
        assert!(!ps.contains("pageNum"));
    }
}
