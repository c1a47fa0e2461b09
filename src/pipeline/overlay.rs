//! First-page overlay: placement math and in-place document mutation.
//!
//! The stamp is a fixed 250 × 190 pt footprint anchored relative to the
//! page's bottom edge, with per-profile nudges, plus two lines of blue
//! Helvetica text. The raster goes in as an RGB image XObject (with an
//! `SMask` carrying the PNG alpha channel, which is why the XObject is
//! built by hand rather than via `lopdf`'s image helper), and the text as
//! an appended `BT … ET` block. The page's original content is wrapped in
//! `q`/`Q` first so a dangling transform in the source document cannot
//! displace the overlay.
//!
//! Everything here is CPU-bound and synchronous; the async entry points in
//! [`crate::process`] run it under `spawn_blocking`.

use crate::error::StampError;
use crate::pipeline::document;
use crate::profile::{StampImage, StampProfile};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

/// Stamp footprint width in points.
pub const STAMP_WIDTH: f32 = 250.0;
/// Stamp footprint height in points.
pub const STAMP_HEIGHT: f32 = 190.0;
/// One centimetre in PostScript points.
pub const POINTS_PER_CM: f32 = 28.346_457;
/// Physical offset of the stamp area from the page's bottom edge, in cm.
pub const BOTTOM_PADDING_CM: f32 = 15.0;
/// Text size for both overlay lines.
pub const FONT_SIZE: f32 = 14.0;
/// Vertical gap between the issue-date line and the issued-to line.
pub const LINE_GAP: f32 = 20.0;

const XOBJECT_NAME: &str = "StampImg";
const FONT_NAME: &str = "StampFont";

/// One document's worth of stamping parameters.
///
/// Constructed once per document and never mutated. The profile's raster is
/// `Arc`-shared, so cloning a request for concurrent batch workers is cheap.
#[derive(Debug, Clone)]
pub struct StampRequest {
    pub profile: StampProfile,
    pub issue_date: String,
    pub issued_to: String,
}

impl StampRequest {
    /// Build a request, rejecting blank text fields up front.
    pub fn new(
        profile: StampProfile,
        issue_date: impl Into<String>,
        issued_to: impl Into<String>,
    ) -> Result<Self, StampError> {
        let issue_date = issue_date.into();
        let issued_to = issued_to.into();
        if issue_date.trim().is_empty() {
            return Err(StampError::InvalidRequest("issue date is empty".into()));
        }
        if issued_to.trim().is_empty() {
            return Err(StampError::InvalidRequest("issued-to is empty".into()));
        }
        Ok(Self {
            profile,
            issue_date,
            issued_to,
        })
    }
}

/// Absolute overlay coordinates for one page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Bottom-left corner of the stamp image.
    pub x: f32,
    pub y: f32,
    /// Left edge of both text lines.
    pub text_x: f32,
    /// Baseline of the issue-date line.
    pub date_y: f32,
    /// Baseline of the issued-to line, one [`LINE_GAP`] below the date.
    pub issued_to_y: f32,
}

/// Compute where the stamp and its text land on a page of height `page_height`.
///
/// The origin is `y = H − padding − height` with the padding converted from
/// centimetres, then nudged by the profile anchor. Pure function, so the
/// coordinate math is testable without a document.
pub fn placement(profile: &StampProfile, page_height: f32) -> Placement {
    let padding_from_bottom = BOTTOM_PADDING_CM * POINTS_PER_CM;
    let x = profile.anchor.0;
    let y = page_height - padding_from_bottom - STAMP_HEIGHT + profile.anchor.1;
    let text_x = x + profile.text_offset.0;
    let date_y = y + STAMP_HEIGHT - profile.text_offset.1;
    Placement {
        x,
        y,
        text_x,
        date_y,
        issued_to_y: date_y - LINE_GAP,
    }
}

/// Stamp the first page of `bytes` and return the re-encoded document.
///
/// Blocking CPU-bound core of the overlay engine. Decodes, mutates page 0
/// only, and re-encodes all pages.
pub fn stamp_bytes(bytes: &[u8], request: &StampRequest) -> Result<Vec<u8>, StampError> {
    let mut doc = document::load(bytes)?;
    let page_id = document::first_page(&doc)?;
    let (width, height) = document::page_size(&doc, page_id)?;
    let place = placement(&request.profile, height);
    debug!(
        "Stamping page 0 ({}x{} pt) with {} profile at ({}, {})",
        width, height, request.profile.kind, place.x, place.y
    );

    apply_overlay(&mut doc, page_id, request, &place)?;

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| StampError::Encode {
        detail: e.to_string(),
    })?;
    Ok(out)
}

/// Install the image and font resources and rewrite page-0 content.
fn apply_overlay(
    doc: &mut Document,
    page_id: ObjectId,
    request: &StampRequest,
    place: &Placement,
) -> Result<(), StampError> {
    materialize_resources(doc, page_id)?;

    let image_id = add_image_xobject(doc, &request.profile.image);
    set_resource(doc, page_id, b"XObject", XOBJECT_NAME, Object::Reference(image_id))?;

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    set_resource(doc, page_id, b"Font", FONT_NAME, Object::Reference(font_id))?;

    let original = doc.get_page_content(page_id).map_err(|e| StampError::Decode {
        detail: format!("page content unreadable: {e}"),
    })?;

    let encode_err = |e: lopdf::Error| StampError::Encode {
        detail: e.to_string(),
    };
    let mut content = Vec::with_capacity(original.len() + 256);
    content.extend_from_slice(b"q\n");
    content.extend_from_slice(&original);
    content.extend_from_slice(b"\nQ\n");
    content.extend(image_ops(place).encode().map_err(encode_err)?);
    content.extend(text_ops(request, place).encode().map_err(encode_err)?);

    doc.change_page_content(page_id, content).map_err(encode_err)
}

/// Add the stamp raster as an RGB image XObject, with an `SMask` when the
/// source PNG carries transparency.
fn add_image_xobject(doc: &mut Document, image: &StampImage) -> ObjectId {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if let Some(alpha) = &image.alpha {
        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha.clone(),
        ));
        dict.set("SMask", Object::Reference(smask_id));
    }
    doc.add_object(Stream::new(dict, image.rgb.clone()))
}

/// `q cm Do Q`: scale the unit image square to the stamp footprint and
/// translate it to the placement origin.
fn image_ops(place: &Placement) -> Content {
    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    STAMP_WIDTH.into(),
                    0.into(),
                    0.into(),
                    STAMP_HEIGHT.into(),
                    place.x.into(),
                    place.y.into(),
                ],
            ),
            Operation::new("Do", vec![XOBJECT_NAME.into()]),
            Operation::new("Q", vec![]),
        ],
    }
}

/// Both text lines in one text object: blue Helvetica, drawn verbatim.
/// Long strings may overflow the stamp visually; that is accepted.
fn text_ops(request: &StampRequest, place: &Placement) -> Content {
    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![FONT_NAME.into(), FONT_SIZE.into()]),
            Operation::new("rg", vec![0.into(), 0.into(), 1.into()]),
            Operation::new("Td", vec![place.text_x.into(), place.date_y.into()]),
            Operation::new("Tj", vec![Object::string_literal(request.issue_date.as_str())]),
            Operation::new("Td", vec![0.into(), (-LINE_GAP).into()]),
            Operation::new("Tj", vec![Object::string_literal(request.issued_to.as_str())]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    }
}

/// Pages may inherit `/Resources` from the page tree. A fresh page-level
/// dictionary would shadow the inherited one and orphan every name the
/// original content uses, so the effective dictionary is copied down onto
/// the page before any stamp entry is added.
fn materialize_resources(doc: &mut Document, page_id: ObjectId) -> Result<(), StampError> {
    let decode_err = |e: lopdf::Error| StampError::Decode {
        detail: format!("page dictionary unreadable: {e}"),
    };
    let has_own = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(decode_err)?
        .has(b"Resources");
    if has_own {
        return Ok(());
    }
    if let Some(inherited) = document::effective_resources(doc, page_id)? {
        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(decode_err)?;
        page.set("Resources", Object::Dictionary(inherited));
    }
    Ok(())
}

/// Set `/Resources/<category>/<name>` on a page, handling both inline and
/// indirect category dictionaries.
fn set_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
    value: Object,
) -> Result<(), StampError> {
    let internal = |e: lopdf::Error| StampError::Decode {
        detail: format!("page resources unreadable: {e}"),
    };

    // First pass: find out whether the category dict is inline or behind a
    // reference, creating an empty inline dict when absent.
    let indirect = {
        let resources = doc
            .get_or_create_resources(page_id)
            .map_err(internal)?
            .as_dict_mut()
            .map_err(internal)?;
        match resources.get(category) {
            Ok(Object::Reference(id)) => Some(*id),
            Ok(Object::Dictionary(_)) => None,
            _ => {
                resources.set(category, Dictionary::new());
                None
            }
        }
    };

    match indirect {
        Some(id) => {
            let dict = doc
                .get_object_mut(id)
                .and_then(Object::as_dict_mut)
                .map_err(internal)?;
            dict.set(name, value);
        }
        None => {
            let resources = doc
                .get_or_create_resources(page_id)
                .map_err(internal)?
                .as_dict_mut()
                .map_err(internal)?;
            let dict = resources
                .get_mut(category)
                .and_then(Object::as_dict_mut)
                .map_err(internal)?;
            dict.set(name, value);
        }
    }
    Ok(())
}
