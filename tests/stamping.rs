//! Integration tests for the stamping pipeline.
//!
//! All fixtures are built in memory: minimal PDFs via `lopdf` and archives
//! via the `zip` crate. No external files, no network.

use lopdf::{dictionary, Document, Object, Stream};
use pdfstamp::{
    process, process_to_file, stamp_archive, stamp_document, InputKind, ProfileSet, StampConfig,
    StampError, StampKind, StampProgressCallback,
};
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// A valid PDF with `pages` letter-sized pages, each carrying a marker in
/// its content stream so pages can be told apart after a round trip.
fn minimal_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(pages);
    for i in 0..pages {
        let marker = format!("BT ET\n% page-{i}");
        let content_id = doc.add_object(Stream::new(dictionary! {}, marker.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn zero_page_pdf() -> Vec<u8> {
    minimal_pdf(0)
}

/// A one-page PDF whose `/Resources` (with a `/F1` font) lives on the Pages
/// node, not on the page itself. The page content uses the inherited font.
fn pdf_with_inherited_resources() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        b"BT /F1 12 Tf (inherited) Tj ET".to_vec(),
    ));
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
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, bytes) in entries {
        if name.ends_with('/') {
            writer.add_directory(name.trim_end_matches('/'), options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

fn archive_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn hero() -> ProfileSet {
    ProfileSet::bundled().expect("bundled assets must load")
}

fn page_contents(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned())
        .collect()
}

// ── Single-document path ─────────────────────────────────────────────────────

#[tokio::test]
async fn stamping_keeps_page_count_and_touches_only_page_zero() {
    let profiles = hero();
    let input = minimal_pdf(3);

    let stamped = stamp_document(
        &input,
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME Construction Ltd",
    )
    .await
    .unwrap();

    let before = page_contents(&input);
    let after = page_contents(&stamped);
    assert_eq!(after.len(), 3, "page count must be preserved");

    // Page 0 gained the overlay: image draw plus both text lines.
    assert!(after[0].contains("StampImg"), "page 0: {}", after[0]);
    assert!(after[0].contains("2024-06-01"));
    assert!(after[0].contains("ACME Construction Ltd"));
    assert!(after[0].contains("% page-0"), "original content must survive");

    // Pages 1..N keep their content untouched.
    assert_eq!(after[1], before[1]);
    assert_eq!(after[2], before[2]);
}

#[tokio::test]
async fn stamping_is_deterministic_for_identical_parameters() {
    let profiles = hero();
    let input = minimal_pdf(1);
    let profile = profiles.resolve(StampKind::AsBuilt);

    let first = stamp_document(&input, profile, "2024-06-01", "ACME").await.unwrap();
    let second = stamp_document(&input, profile, "2024-06-01", "ACME").await.unwrap();

    assert_eq!(page_contents(&first), page_contents(&second));
}

#[tokio::test]
async fn stamping_keeps_resources_inherited_from_the_page_tree() {
    let profiles = hero();
    let stamped = stamp_document(
        &pdf_with_inherited_resources(),
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
    )
    .await
    .unwrap();

    let doc = Document::load_mem(&stamped).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();

    // The page-level dictionary must carry both the inherited font and the
    // stamp's additions, not shadow the Pages-level dictionary.
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
    assert!(fonts.has(b"F1"), "inherited font must remain reachable");
    assert!(fonts.has(b"StampFont"));
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    assert!(xobjects.has(b"StampImg"));
}

#[tokio::test]
async fn zero_page_document_fails_with_empty_document() {
    let profiles = hero();
    let err = stamp_document(
        &zero_page_pdf(),
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StampError::EmptyDocument), "got: {err:?}");
}

#[tokio::test]
async fn garbage_bytes_fail_with_decode() {
    let profiles = hero();
    let err = stamp_document(
        b"this is not a pdf",
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StampError::Decode { .. }), "got: {err:?}");
}

#[tokio::test]
async fn blank_text_fields_are_rejected_before_decoding() {
    let profiles = hero();
    let err = stamp_document(&minimal_pdf(1), profiles.resolve(StampKind::Hero), " ", "ACME")
        .await
        .unwrap_err();
    assert!(matches!(err, StampError::InvalidRequest(_)), "got: {err:?}");
}

// ── Batch path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn archive_stamps_qualifying_entries_and_drops_the_rest() {
    let profiles = hero();
    let zip = build_zip(&[
        ("a.pdf", minimal_pdf(1).as_slice()),
        ("b.pdf", minimal_pdf(2).as_slice()),
        ("notes.txt", b"remember the milk".as_slice()),
        ("sub/", b"".as_slice()),
    ]);

    let outcome = stamp_archive(
        &zip,
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
        &StampConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.stats.processed, 2);
    assert_eq!(outcome.stats.skipped, 2);

    let bytes = outcome.bytes.expect("non-empty batch must produce an archive");
    assert_eq!(archive_names(&bytes), vec!["a.pdf", "b.pdf"]);

    // Every output entry is itself a stamped, loadable PDF.
    let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut payload = Vec::new();
        entry.read_to_end(&mut payload).unwrap();
        let pages = page_contents(&payload);
        assert!(pages[0].contains("2024-06-01"));
    }
}

#[tokio::test]
async fn one_corrupt_entry_aborts_the_whole_batch() {
    let profiles = hero();
    let zip = build_zip(&[
        ("1.pdf", minimal_pdf(1).as_slice()),
        ("2.pdf", b"corrupt".as_slice()),
        ("3.pdf", minimal_pdf(1).as_slice()),
    ]);

    let err = stamp_archive(
        &zip,
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
        &StampConfig::default(),
    )
    .await
    .unwrap_err();

    // The per-entry decode failure surfaces unchanged; no partial archive.
    assert!(matches!(err, StampError::Decode { .. }), "got: {err:?}");
}

#[tokio::test]
async fn empty_batch_is_an_outcome_not_an_error() {
    let profiles = hero();
    let zip = build_zip(&[("notes.txt", b"nothing to stamp".as_slice())]);

    let outcome = stamp_archive(
        &zip,
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
        &StampConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.stats.processed, 0);
    assert!(outcome.bytes.is_none());
}

#[tokio::test]
async fn garbage_archive_fails_with_archive_decode() {
    let profiles = hero();
    let err = stamp_archive(
        b"not a zip",
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
        &StampConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StampError::ArchiveDecode { .. }), "got: {err:?}");
}

#[tokio::test]
async fn batch_reports_progress_events() {
    #[derive(Default)]
    struct Counting {
        started_with: AtomicUsize,
        completed: AtomicUsize,
        finished: AtomicUsize,
    }

    impl StampProgressCallback for Counting {
        fn on_batch_start(&self, total: usize) {
            self.started_with.store(total, Ordering::SeqCst);
        }
        fn on_entry_complete(&self, _name: &str, _completed: usize, _total: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_batch_complete(&self, processed: usize, _skipped: usize) {
            self.finished.store(processed, Ordering::SeqCst);
        }
    }

    let counting = Arc::new(Counting::default());
    let config = StampConfig::builder()
        .concurrency(2)
        .progress_callback(counting.clone())
        .build()
        .unwrap();

    let profiles = hero();
    let zip = build_zip(&[
        ("a.pdf", minimal_pdf(1).as_slice()),
        ("b.pdf", minimal_pdf(1).as_slice()),
    ]);
    stamp_archive(
        &zip,
        profiles.resolve(StampKind::Construction),
        "2024-06-01",
        "ACME",
        &config,
    )
    .await
    .unwrap();

    assert_eq!(counting.started_with.load(Ordering::SeqCst), 2);
    assert_eq!(counting.completed.load(Ordering::SeqCst), 2);
    assert_eq!(counting.finished.load(Ordering::SeqCst), 2);
}

// ── Dispatcher ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unsupported_input_is_rejected_before_decoding() {
    let profiles = hero();
    // Deliberately valid PDF bytes: classification alone must reject.
    let err = process(
        &minimal_pdf(1),
        InputKind::Unsupported,
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
        &StampConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StampError::UnsupportedInput { .. }), "got: {err:?}");
}

#[tokio::test]
async fn document_path_counts_one_processed() {
    let profiles = hero();
    let outcome = process(
        &minimal_pdf(1),
        InputKind::Document,
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
        &StampConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(outcome.stats.processed, 1);
    assert_eq!(outcome.stats.skipped, 0);
    assert!(outcome.bytes.is_some());
}

#[tokio::test]
async fn process_to_file_writes_the_artifact_atomically() {
    let profiles = hero();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("stamped.pdf");

    let outcome = process_to_file(
        &minimal_pdf(1),
        InputKind::Document,
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
        &StampConfig::default(),
        &out,
    )
    .await
    .unwrap();

    let written = std::fs::read(&out).unwrap();
    assert_eq!(Some(written), outcome.bytes);

    // No staging file may be left behind.
    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["stamped.pdf"]);
}

#[tokio::test]
async fn process_to_file_leaves_sibling_files_alone() {
    let profiles = hero();
    let dir = tempfile::tempdir().unwrap();
    // A neighbour that a naive extension-swapped staging path would hit.
    let sibling = dir.path().join("stamped.tmp");
    std::fs::write(&sibling, b"precious").unwrap();
    let out = dir.path().join("stamped.pdf");

    process_to_file(
        &minimal_pdf(1),
        InputKind::Document,
        profiles.resolve(StampKind::Hero),
        "2024-06-01",
        "ACME",
        &StampConfig::default(),
        &out,
    )
    .await
    .unwrap();

    assert!(out.exists());
    assert_eq!(std::fs::read(&sibling).unwrap(), b"precious");
}
