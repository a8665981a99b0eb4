//! Property-based tests for review-api
//!
//! Tests the request models and row conversion using proptest.

use proptest::prelude::*;
use review_api::models::{ArchiveParams, NewComment};
use review_export::{CommentRow, OutputFormat, Rect, Viewer};

fn viewer() -> Viewer {
    Viewer {
        email: "ann@example.com".to_string(),
        display_name: "Ann".to_string(),
    }
}

fn rect() -> impl Strategy<Value = Rect> {
    (0.0f64..612.0, 0.0f64..792.0, 0.0f64..612.0, 0.0f64..792.0)
        .prop_map(|(a, b, c, d)| Rect::new([a, b], [c, d]))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ============================================================
    // Row Conversion Tests
    // ============================================================

    #[test]
    fn arbitrary_rects_text_never_fails_conversion(rects in ".{0,80}") {
        let row = CommentRow {
            hash: "c1".to_string(),
            author: "Bob".to_string(),
            rects: Some(rects),
            ..Default::default()
        };
        let comment = row.into_comment(&viewer());
        prop_assert_eq!(comment.id, "c1");
    }

    #[test]
    fn stored_rects_survive_conversion(rects in prop::collection::vec(rect(), 0..8)) {
        let row = CommentRow {
            hash: "c1".to_string(),
            author: "Bob".to_string(),
            page_id: Some(0),
            rects: Some(serde_json::to_string(&rects).unwrap()),
            ..Default::default()
        };
        let comment = row.into_comment(&viewer());
        prop_assert_eq!(comment.rects, rects);
    }

    // ============================================================
    // Request Validation Tests
    // ============================================================

    #[test]
    fn replies_need_no_rects(parent in "[A-Za-z0-9]{1,64}") {
        let body = serde_json::json!({"replyToId": parent, "msg": "ok"});
        let comment: NewComment = serde_json::from_value(body).unwrap();
        prop_assert!(comment.is_placed());
    }

    #[test]
    fn roots_need_rects(rects in prop::collection::vec(rect(), 0..4)) {
        let body = serde_json::json!({"pageId": 1, "type": "highlight", "rects": rects});
        let comment: NewComment = serde_json::from_value(body).unwrap();
        prop_assert_eq!(comment.is_placed(), !rects.is_empty());
    }

    #[test]
    fn only_png_selects_png(format in "[a-z]{0,6}") {
        let params = ArchiveParams {
            format: Some(format.clone()),
            ..Default::default()
        };
        let parsed = OutputFormat::parse(params.format.as_deref());
        prop_assert_eq!(parsed == OutputFormat::Png, format == "png");
    }
}
