//! Integration tests over the public API. No OCR engine or libpdfium is
//! needed: PDFs are synthesised with lopdf and engines are stubbed.

use prescription_parser::pipeline::extract::content_chars;
use prescription_parser::test_support::pdf_with_lines;
use prescription_parser::{
    parse_medications, process_sync, Document, DocumentKind, ErrorOutcome, ExtractionConfig,
    Extractor, MedicationParser, ParseOutcome, ParserConfig, Pipeline, PrescriptionError,
    StrategyError, StrategyKind, TextStrategy,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("prescription_parser=debug")
        .try_init();
}

/// Strategy returning fixed text and counting its calls.
struct Counted {
    kind: StrategyKind,
    text: &'static str,
    calls: Arc<AtomicUsize>,
}

impl Counted {
    fn new(kind: StrategyKind, text: &'static str) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Arc::new(Self {
            kind,
            text,
            calls: Arc::clone(&calls),
        });
        (strategy, calls)
    }
}

impl TextStrategy for Counted {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn extract(&self, _bytes: &[u8]) -> Result<String, StrategyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.to_string())
    }
}

const PRESCRIPTION: &str = "\
City Clinic
Dr. A. Patel
Patient: J. Doe

Metformin - 500mg - Take twice daily
1. Lisinopril 10mg Once daily
Atorvastatin (20mg) - at bedtime
Follow up in two weeks
";

// ── Parsing ──────────────────────────────────────────────────────────────────

#[test]
fn typical_prescription_yields_each_drug_once() {
    let meds = parse_medications(PRESCRIPTION);
    let names: Vec<&str> = meds.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Metformin", "Lisinopril", "Atorvastatin"]);

    let metformin = &meds[0];
    assert_eq!(metformin.dosage, "500mg");
    assert_eq!(metformin.frequency, "Take twice daily");
    assert_eq!(metformin.instructions, "Take 500mg Take twice daily");
}

#[test]
fn names_are_alphabetic_and_unique() {
    let text = format!("{PRESCRIPTION}\nMETFORMIN - 850mg - once daily\n");
    let meds = parse_medications(&text);

    let mut seen = std::collections::HashSet::new();
    for med in &meds {
        assert!(med.name.chars().all(|c| c.is_alphabetic() || c == ' '));
        assert!(med.name.trim().chars().count() > 2);
        assert!(seen.insert(med.name.to_lowercase()), "duplicate {}", med.name);
    }
    // First occurrence wins.
    let metformin = meds.iter().find(|m| m.name == "Metformin").unwrap();
    assert_eq!(metformin.dosage, "500mg");
}

#[test]
fn prose_without_keywords_yields_nothing() {
    assert!(parse_medications("Please rest and drink plenty of water.").is_empty());
    assert!(parse_medications("").is_empty());
}

#[test]
fn line_fallback_uses_sentinels() {
    let meds = parse_medications("Paracetamol - one tablet when needed");
    assert_eq!(meds.len(), 1);
    assert_eq!(meds[0].name, "Paracetamol");
    assert_eq!(meds[0].dosage, "Not specified");
    assert_eq!(meds[0].frequency, "As directed");
}

#[test]
fn custom_keywords_change_line_fallback() {
    let config = ParserConfig::builder()
        .keywords(["inhaler"])
        .build()
        .unwrap();
    let parser = MedicationParser::new(config).unwrap();

    let meds = parser.parse("Salbutamol - inhaler, two puffs");
    assert_eq!(meds.len(), 1);
    assert_eq!(meds[0].name, "Salbutamol");
    assert!(parser.parse("Paracetamol - one tablet when needed").is_empty());
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[test]
fn ocr_is_skipped_when_text_layer_is_substantial() {
    let config = ExtractionConfig::default();
    let (native, native_calls) = Counted::new(
        StrategyKind::NativeText,
        "Metformin - 500mg - Take twice daily and Aspirin - 75mg - once daily",
    );
    let (ocr, ocr_calls) = Counted::new(StrategyKind::PdfOcr, "ignored");
    let extractor = Extractor::from_strategies(&config, vec![native, ocr], vec![]);

    let text = extractor.extract(&Document::new(b"%PDF-1.4".to_vec(), DocumentKind::Pdf));
    assert!(content_chars(&text) > 50);
    assert_eq!(native_calls.load(Ordering::SeqCst), 1);
    assert_eq!(ocr_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn short_text_layer_falls_through_to_ocr() {
    let config = ExtractionConfig::default();
    let (native, _) = Counted::new(StrategyKind::NativeText, "Page 1");
    let (ocr, ocr_calls) = Counted::new(StrategyKind::PdfOcr, "Zinc - 5mg - daily");
    let extractor = Extractor::from_strategies(&config, vec![native, ocr], vec![]);

    let extraction = extractor.extract_bytes(b"%PDF-1.4", DocumentKind::Pdf);
    assert_eq!(ocr_calls.load(Ordering::SeqCst), 1);
    assert!(extraction.text.contains("Page 1"));
    assert!(extraction.text.contains("Zinc"));
    assert_eq!(extraction.final_strategy(), Some(StrategyKind::PdfOcr));
}

#[test]
fn real_text_layer_is_read_without_ocr() {
    init_logging();
    let pdf = pdf_with_lines(&[&[
        "City Clinic, 12 High Street",
        "Metformin - 500mg - Take twice daily",
        "Lisinopril - 10mg - Once daily",
    ]])
    .unwrap();
    let extraction = Extractor::default().extract_bytes(&pdf, DocumentKind::Pdf);

    assert!(extraction.text.contains("Metformin"), "got {:?}", extraction.text);
    assert!(extraction
        .attempts
        .iter()
        .all(|a| a.strategy != StrategyKind::PdfOcr));
}

#[test]
fn corrupt_inputs_yield_empty_text() {
    let extractor = Extractor::default();
    assert_eq!(extractor.extract_bytes(b"", DocumentKind::Pdf).text, "");
    // Image decoding fails before any OCR engine is needed.
    let extraction = extractor.extract_bytes(b"not an image", DocumentKind::Image);
    assert_eq!(extraction.text, "");
    assert!(matches!(
        extraction.attempts[0].error,
        Some(StrategyError::ImageDecode { .. })
    ));
}

// ── End to end ───────────────────────────────────────────────────────────────

#[test]
fn stubbed_pipeline_processes_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rx.pdf");
    std::fs::write(&path, b"%PDF-1.4 placeholder").unwrap();

    let config = ExtractionConfig::default();
    let (native, _) = Counted::new(StrategyKind::NativeText, PRESCRIPTION);
    let extractor = Extractor::from_strategies(&config, vec![native], vec![]);
    let pipeline = Pipeline::from_parts(config, extractor, MedicationParser::default());

    let outcome = process_sync(path.to_str().unwrap(), &pipeline).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.medications_found, 3);
    assert_eq!(
        outcome.extracted_text_length,
        Some(PRESCRIPTION.chars().count())
    );
}

#[test]
fn text_layer_pdf_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prescription.pdf");
    std::fs::write(
        &path,
        pdf_with_lines(&[&[
            "Dr. A. Patel, City Clinic",
            "Metformin - 500mg - Take twice daily",
            "Lisinopril - 10mg - Once daily",
        ]])
        .unwrap(),
    )
    .unwrap();

    let outcome = tokio_test::block_on(Pipeline::default().process(path.to_str().unwrap()))
        .expect("local pdf resolves");
    assert!(outcome.medications.iter().any(|m| m.name == "Metformin"));
    assert!(outcome.extracted_text_length.unwrap_or(0) > 0);
}

#[test]
fn envelope_serialises_with_wire_names() {
    let outcome = Pipeline::default().process_text("Aspirin - 75mg - once daily");
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["medications_found"], 1);
    let med = &json["medications"][0];
    for key in ["name", "dosage", "frequency", "instructions", "parsed_at"] {
        assert!(med.get(key).is_some(), "missing {key}");
    }

    let back: ParseOutcome = serde_json::from_value(json).unwrap();
    assert_eq!(back.medications[0].name, "Aspirin");
}

// ── Input errors ─────────────────────────────────────────────────────────────

#[test]
fn missing_file_is_reported() {
    let err = process_sync("/definitely/not/here/rx.pdf", &Pipeline::default()).unwrap_err();
    assert!(matches!(err, PrescriptionError::FileNotFound { .. }));

    let json = serde_json::to_value(ErrorOutcome::from(&err)).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("rx.pdf"));
}

#[test]
fn unsupported_and_empty_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let gif = dir.path().join("scan.gif");
    std::fs::write(&gif, b"GIF89a").unwrap();
    let empty = dir.path().join("empty.pdf");
    std::fs::write(&empty, b"").unwrap();

    let pipeline = Pipeline::default();
    assert!(matches!(
        process_sync(gif.to_str().unwrap(), &pipeline),
        Err(PrescriptionError::UnsupportedFileType { .. })
    ));
    assert!(matches!(
        process_sync(empty.to_str().unwrap(), &pipeline),
        Err(PrescriptionError::EmptyDocument { .. })
    ));
}

#[test]
fn oversized_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.pdf");
    std::fs::write(&path, vec![b'x'; 64]).unwrap();

    let config = ExtractionConfig::builder()
        .max_payload_bytes(16)
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config, ParserConfig::default()).unwrap();

    match process_sync(path.to_str().unwrap(), &pipeline) {
        Err(PrescriptionError::PayloadTooLarge { size, limit, .. }) => {
            assert_eq!(size, 64);
            assert_eq!(limit, 16);
        }
        other => panic!("expected PayloadTooLarge, got {other:?}"),
    }
}
