//! PDF decoding and page geometry lookup.
//!
//! Thin wrappers over `lopdf` that map its errors into the crate taxonomy
//! and resolve the two facts the overlay engine needs about a document:
//! the object id of page 0 and that page's size in points. `MediaBox` may
//! live on the page itself or anywhere up the `Parent` chain (it is an
//! inheritable attribute), so the lookup walks upwards until it finds one.

use crate::error::StampError;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Upper bound on `Parent` hops when resolving inherited page attributes.
/// A conforming page tree is nowhere near this deep; hitting the bound
/// means the chain is cyclic or otherwise malformed.
const MAX_TREE_DEPTH: usize = 64;

/// Decode raw bytes into a PDF document.
pub fn load(bytes: &[u8]) -> Result<Document, StampError> {
    Document::load_mem(bytes).map_err(|e| StampError::Decode {
        detail: e.to_string(),
    })
}

/// Object id of page 0, the only mutable target.
///
/// Fails with [`StampError::EmptyDocument`] when the page tree is empty.
pub fn first_page(doc: &Document) -> Result<ObjectId, StampError> {
    doc.get_pages()
        .into_values()
        .next()
        .ok_or(StampError::EmptyDocument)
}

/// Width and height of a page in points, from its effective `MediaBox`.
pub fn page_size(doc: &Document, page_id: ObjectId) -> Result<(f32, f32), StampError> {
    let media_box = effective_media_box(doc, page_id)?.ok_or_else(|| StampError::Decode {
        detail: "page has no MediaBox".into(),
    })?;
    if media_box.len() != 4 {
        return Err(StampError::Decode {
            detail: format!("MediaBox has {} elements, expected 4", media_box.len()),
        });
    }
    let corner = |i: usize| -> Result<f32, StampError> {
        as_float(resolve(doc, &media_box[i])).ok_or_else(|| StampError::Decode {
            detail: "MediaBox element is not a number".into(),
        })
    };
    let (x0, y0, x1, y1) = (corner(0)?, corner(1)?, corner(2)?, corner(3)?);
    Ok(((x1 - x0).abs(), (y1 - y0).abs()))
}

/// Find the `MediaBox` on the page or up its `Parent` chain.
fn effective_media_box(doc: &Document, page_id: ObjectId) -> Result<Option<Vec<Object>>, StampError> {
    let mut cur = dict_at(doc, page_id)?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Some(array) = array_entry(doc, cur, b"MediaBox") {
            return Ok(Some(array));
        }
        match cur.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => cur = dict_at(doc, *parent_id)?,
            _ => return Ok(None),
        }
    }
    Err(chain_too_deep())
}

/// The nearest `/Resources` dictionary on the page or up its `Parent`
/// chain, cloned. `None` when no node in the chain declares one.
pub fn effective_resources(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Option<Dictionary>, StampError> {
    let mut cur = dict_at(doc, page_id)?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Some(dict) = dict_entry(doc, cur, b"Resources") {
            return Ok(Some(dict));
        }
        match cur.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => cur = dict_at(doc, *parent_id)?,
            _ => return Ok(None),
        }
    }
    Err(chain_too_deep())
}

fn chain_too_deep() -> StampError {
    StampError::Decode {
        detail: format!("page tree Parent chain exceeds {MAX_TREE_DEPTH} nodes; likely cyclic"),
    }
}

fn dict_at(doc: &Document, id: ObjectId) -> Result<&Dictionary, StampError> {
    doc.get_object(id)
        .and_then(Object::as_dict)
        .map_err(|e| StampError::Decode {
            detail: format!("object {id:?} is not a dictionary: {e}"),
        })
}

/// Fetch a dictionary entry as an owned array, following one reference hop.
fn array_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Vec<Object>> {
    match dict.get(key).ok()? {
        Object::Array(a) => Some(a.clone()),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Array(a) => Some(a.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Fetch a dictionary entry as an owned dictionary, following one
/// reference hop.
fn dict_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Dictionary> {
    match dict.get(key).ok()? {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Dictionary(d) => Some(d.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Resolve a single reference hop so numeric coordinates can be indirect.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn as_float(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use lopdf::Stream;

    fn letter_pdf() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                // Inherited by the page, which carries no MediaBox itself.
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    #[test]
    fn media_box_is_inherited_from_the_page_tree() {
        let doc = letter_pdf();
        let page_id = first_page(&doc).unwrap();
        assert_eq!(page_size(&doc, page_id).unwrap(), (612.0, 792.0));
    }

    #[test]
    fn garbage_bytes_fail_with_decode() {
        let err = load(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, StampError::Decode { .. }));
    }

    #[test]
    fn resources_are_found_up_the_page_tree() {
        let mut doc = letter_pdf();
        let page_id = first_page(&doc).unwrap();
        // Attach Resources to the Pages node only.
        let pages_id = match dict_at(&doc, page_id).unwrap().get(b"Parent").unwrap() {
            Object::Reference(id) => *id,
            _ => panic!("page has no Parent reference"),
        };
        doc.get_object_mut(pages_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set(
                "Resources",
                dictionary! { "Font" => dictionary! {} },
            );

        let resources = effective_resources(&doc, page_id).unwrap().unwrap();
        assert!(resources.has(b"Font"));
    }

    #[test]
    fn cyclic_parent_chain_fails_instead_of_hanging() {
        let mut doc = Document::with_version("1.5");
        let a = doc.new_object_id();
        let b = doc.new_object_id();
        doc.objects.insert(
            a,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Parent" => Object::Reference(b),
            }),
        );
        doc.objects.insert(
            b,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Parent" => Object::Reference(a),
            }),
        );
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(a),
        });

        let err = page_size(&doc, page_id).unwrap_err();
        assert!(matches!(err, StampError::Decode { .. }), "got: {err:?}");
        assert!(err.to_string().contains("Parent chain"), "got: {err}");

        let err = effective_resources(&doc, page_id).unwrap_err();
        assert!(matches!(err, StampError::Decode { .. }), "got: {err:?}");
    }
}
