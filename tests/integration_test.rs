//! Integration tests for Carvex

use carvex::carve::signatures::REGISTRY;
use carvex::{
    Analyzer, BoundaryMethod, CancelFlag, EngineConfig, EngineError, FormatKind, InputFile,
};
use chrono::{DateTime, Utc};
use tempfile::tempdir;

// ============================================================================
// Fixtures
// ============================================================================

/// Deterministic lowercase filler; 'f' is left out so `ftyp` can never appear
fn letters(len: usize, seed: u32) -> Vec<u8> {
    const ALPHABET: &[u8] = b"abcdeghijklmnopqrstuvwxyz";
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            ALPHABET[(state % ALPHABET.len() as u32) as usize]
        })
        .collect()
}

/// Xorshift noise with near-maximal entropy
fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

fn jpeg() -> Vec<u8> {
    let mut j = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    j.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
    j.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x05, 0x00, 0x10, 0x0B]);
    j.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
    j.extend(letters(300, 7));
    j.extend_from_slice(&[0xFF, 0xD9]);
    j
}

fn png() -> Vec<u8> {
    let mut p = b"\x89PNG\r\n\x1a\n".to_vec();
    p.extend_from_slice(&13u32.to_be_bytes());
    p.extend_from_slice(b"IHDR");
    p.extend_from_slice(&[0u8; 13 + 4]);
    p.extend_from_slice(&0u32.to_be_bytes());
    p.extend_from_slice(b"IEND\xAE\x42\x60\x82");
    p
}

/// Stored single-entry archive with central directory and EOCD
fn zip(name: &str, content: &[u8]) -> Vec<u8> {
    let mut z = Vec::new();
    z.extend_from_slice(b"PK\x03\x04");
    z.extend_from_slice(&[20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    z.extend_from_slice(&0u32.to_le_bytes()); // crc
    z.extend_from_slice(&(content.len() as u32).to_le_bytes());
    z.extend_from_slice(&(content.len() as u32).to_le_bytes());
    z.extend_from_slice(&(name.len() as u16).to_le_bytes());
    z.extend_from_slice(&0u16.to_le_bytes());
    z.extend_from_slice(name.as_bytes());
    z.extend_from_slice(content);

    let cd_offset = z.len() as u32;
    z.extend_from_slice(b"PK\x01\x02");
    z.extend_from_slice(&[20, 0, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    z.extend_from_slice(&0u32.to_le_bytes());
    z.extend_from_slice(&(content.len() as u32).to_le_bytes());
    z.extend_from_slice(&(content.len() as u32).to_le_bytes());
    z.extend_from_slice(&(name.len() as u16).to_le_bytes());
    z.extend_from_slice(&[0u8; 12]);
    z.extend_from_slice(&0u32.to_le_bytes()); // local header offset
    z.extend_from_slice(name.as_bytes());
    let cd_size = z.len() as u32 - cd_offset;

    z.extend_from_slice(b"PK\x05\x06");
    z.extend_from_slice(&[0, 0, 0, 0, 1, 0, 1, 0]);
    z.extend_from_slice(&cd_size.to_le_bytes());
    z.extend_from_slice(&cd_offset.to_le_bytes());
    z.extend_from_slice(&0u16.to_le_bytes());
    z
}

fn pdf() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\nxref\n0 1\ntrailer\n<< /Root 1 0 R >>\n%%EOF"
        .to_vec()
}

/// PE32 image: headers in the first 512 bytes, one section of `raw_size` bytes after
fn pe(raw_size: u32, size_of_image: u32) -> Vec<u8> {
    let mut data = vec![0u8; 512 + raw_size as usize];
    data[0..2].copy_from_slice(b"MZ");
    data[60..64].copy_from_slice(&64u32.to_le_bytes());
    data[64..68].copy_from_slice(b"PE\0\0");
    data[68..70].copy_from_slice(&0x14Cu16.to_le_bytes());
    data[70..72].copy_from_slice(&1u16.to_le_bytes());
    data[84..86].copy_from_slice(&224u16.to_le_bytes());
    data[88..90].copy_from_slice(&0x10Bu16.to_le_bytes());
    data[144..148].copy_from_slice(&size_of_image.to_le_bytes());
    let sec = 88 + 224;
    data[sec..sec + 5].copy_from_slice(b".text");
    data[sec + 16..sec + 20].copy_from_slice(&raw_size.to_le_bytes());
    data[sec + 20..sec + 24].copy_from_slice(&512u32.to_le_bytes());
    data
}

fn mixed_buffer() -> Vec<u8> {
    let mut data = letters(300, 1);
    data.extend(jpeg());
    data.extend(letters(100, 2));
    data.extend(png());
    data.extend(letters(100, 3));
    data.extend(zip("hello.txt", b"hi"));
    data.extend(letters(100, 4));
    data.extend(pdf());
    data.extend(letters(200, 5));
    data
}

fn analyze(data: &[u8]) -> carvex::AnalysisResult {
    Analyzer::new(EngineConfig::default())
        .analyze(data, &InputFile::new("fixture.bin", data.len() as u64))
        .unwrap()
}

// ============================================================================
// Carving invariants
// ============================================================================

#[test]
fn test_carved_bytes_match_source() {
    let data = mixed_buffer();
    let result = analyze(&data);

    assert!(!result.carved_files.is_empty());
    for f in &result.carved_files {
        let range = f.offset as usize..f.end() as usize;
        assert_eq!(&data[range], f.data.as_slice(), "misattributed {}", f.id);
    }
}

#[test]
fn test_carved_files_do_not_overlap() {
    let result = analyze(&mixed_buffer());
    for pair in result.carved_files.windows(2) {
        assert!(pair[0].end() <= pair[1].offset);
    }
}

#[test]
fn test_confidence_and_size_bounds() {
    let config = EngineConfig::default();
    let result = analyze(&mixed_buffer());
    for f in &result.carved_files {
        assert!(f.confidence <= 100);
        assert!(f.size >= config.carving.min_file_size);
        assert!(f.size <= config.carving.max_file_size);
    }
}

#[test]
fn test_mixed_buffer_kinds_in_order() {
    let result = analyze(&mixed_buffer());
    let kinds: Vec<FormatKind> = result.carved_files.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![FormatKind::Jpeg, FormatKind::Png, FormatKind::Zip, FormatKind::Pdf]
    );

    let methods: Vec<BoundaryMethod> = result
        .carved_files
        .iter()
        .map(|f| f.boundary_method)
        .collect();
    assert_eq!(
        methods,
        vec![
            BoundaryMethod::FooterScan,
            BoundaryMethod::FooterScan,
            BoundaryMethod::Trailer,
            BoundaryMethod::Trailer,
        ]
    );
    assert_eq!(result.statistics.files_carved, 4);
    assert_eq!(result.statistics.by_type.get("pdf"), Some(&1));
}

// ============================================================================
// Format scenarios
// ============================================================================

#[test]
fn test_jpeg_at_known_offset() {
    let mut data = letters(4000, 11);
    let jpeg = jpeg();
    data.extend_from_slice(&jpeg);
    data.extend(letters(3000, 12));

    let result = analyze(&data);
    assert_eq!(result.carved_files.len(), 1);
    let f = &result.carved_files[0];
    assert_eq!(f.kind, FormatKind::Jpeg);
    assert_eq!(f.offset, 4000);
    assert_eq!(f.size, jpeg.len() as u64);
    assert!(f.confidence >= 80, "confidence {}", f.confidence);

    let segments = &f.metadata.jpeg.as_ref().unwrap().segments;
    assert_eq!(segments.last().unwrap().marker, 0xFFDA);
}

#[test]
fn test_jpeg_in_random_padding() {
    let mut data = noise(4000, 42);
    let jpeg = jpeg();
    data.extend_from_slice(&jpeg);
    data.extend(noise(3000, 43));

    let result = analyze(&data);
    let jpegs: Vec<_> = result
        .carved_files
        .iter()
        .filter(|f| f.kind == FormatKind::Jpeg)
        .collect();
    assert_eq!(jpegs.len(), 1);
    assert_eq!(jpegs[0].offset, 4000);
    assert_eq!(jpegs[0].data, jpeg);
    assert!(jpegs[0].confidence >= 80, "confidence {}", jpegs[0].confidence);
}

#[test]
fn test_zip_entry_filename() {
    let mut data = zip("hello.txt", b"hi");
    data.extend(letters(64, 21));

    let result = analyze(&data);
    let f = &result.carved_files[0];
    assert_eq!(f.kind, FormatKind::Zip);
    assert_eq!(f.size, zip("hello.txt", b"hi").len() as u64);
    assert_eq!(f.metadata.zip.as_ref().unwrap().files[0].filename, "hello.txt");
}

#[test]
fn test_pdf_version_and_trailer() {
    let mut data = letters(50, 31);
    data.extend(pdf());
    data.extend(letters(50, 32));

    let result = analyze(&data);
    let f = &result.carved_files[0];
    assert_eq!(f.kind, FormatKind::Pdf);
    assert_eq!(f.end() as usize, 50 + pdf().len());
    assert_eq!(f.metadata.pdf.as_ref().unwrap().version, "1.4");
}

#[test]
fn test_zero_buffer() {
    let data = vec![0u8; 100 * 1024];
    let result = analyze(&data);

    assert!(result.carved_files.is_empty());
    assert!(result
        .suspicious_regions
        .iter()
        .any(|r| r.offset == 0 && r.size == data.len() as u64 && r.entropy == 0.0));
}

#[test]
fn test_pe_overlay() {
    let mut data = pe(1024, 4096);
    data.extend(noise(5000, 0x5EED));

    let result = analyze(&data);
    let overlay = result.overlay_data.as_ref().unwrap();
    assert_eq!(overlay.overlay_offset, 1536);
    assert_eq!(overlay.overlay_size, 5000);
    assert!(overlay.entropy > 7.0);

    let exe = &result.carved_files[0];
    assert_eq!(exe.kind, FormatKind::Pe);
    assert_eq!(exe.boundary_method, BoundaryMethod::InternalSize);
    assert_eq!(exe.size, 4096);
    assert_eq!(exe.metadata.pe.unwrap().section_count, 1);
}

#[test]
fn test_polyglot_gif_pdf() {
    let mut data = b"GIF89a".to_vec();
    data.extend(letters(994, 41));
    data.extend(pdf());
    data.extend(letters(100, 42));

    let result = analyze(&data);
    let polyglot = result.polyglot_analysis.as_ref().unwrap();
    assert_eq!(polyglot.detected_types, vec!["gif@0", "pdf@1000"]);
}

// ============================================================================
// Registry order contract
// ============================================================================

#[test]
fn test_registry_order_contract() {
    let order: Vec<FormatKind> = REGISTRY.iter().map(|s| s.kind).collect();
    let zip_pos = order.iter().position(|k| *k == FormatKind::Zip).unwrap();
    for member in [
        FormatKind::Jar,
        FormatKind::Docx,
        FormatKind::Xlsx,
        FormatKind::Pptx,
        FormatKind::Epub,
        FormatKind::Odt,
    ] {
        let pos = order.iter().position(|k| *k == member).unwrap();
        assert!(pos < zip_pos, "{member} must precede zip");
    }
}

#[test]
fn test_docx_resolved_before_zip() {
    let mut data = zip("word/document.xml", b"<w:document/>");
    data.extend(letters(64, 51));

    let result = analyze(&data);
    assert_eq!(result.carved_files[0].kind, FormatKind::Docx);
    assert_eq!(result.carved_files[0].extension, "docx");
}

// ============================================================================
// Determinism, cancellation, entry points
// ============================================================================

#[test]
fn test_deterministic_results() {
    let mut data = mixed_buffer();
    data.extend(pe(512, 2048));
    data.extend(noise(3000, 99));

    let normalize = |mut r: carvex::AnalysisResult| {
        r.timestamp = DateTime::<Utc>::default();
        r.statistics.processing_time_ms = 0;
        for e in &mut r.timeline {
            e.timestamp = DateTime::<Utc>::default();
        }
        r
    };

    let first = normalize(analyze(&data));
    let second = normalize(analyze(&data));
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_sequential_anomaly_passes_match_parallel() {
    let mut data = mixed_buffer();
    data.extend(noise(4096, 3));

    let mut config = EngineConfig::default();
    config.general.parallel_anomaly_passes = false;
    let info = InputFile::new("fixture.bin", data.len() as u64);
    let seq = Analyzer::new(config).analyze(&data, &info).unwrap();
    let par = analyze(&data);

    assert_eq!(seq.hidden_data, par.hidden_data);
    assert_eq!(seq.suspicious_regions, par.suspicious_regions);
    assert_eq!(seq.carved_files, par.carved_files);
}

#[test]
fn test_cancelled_scan() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let data = mixed_buffer();
    let err = Analyzer::new(EngineConfig::default())
        .analyze_with_cancel(&data, &InputFile::new("x", data.len() as u64), &cancel)
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled { offset: 0 }));
}

#[tokio::test]
async fn test_analyze_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("image.dd");
    tokio::fs::write(&path, mixed_buffer()).await.unwrap();

    let result = Analyzer::new(EngineConfig::default())
        .analyze_path(&path)
        .await
        .unwrap();
    assert_eq!(result.file.name, "image.dd");
    assert_eq!(result.file.declared_type.as_deref(), Some("dd"));
    assert_eq!(result.carved_files.len(), 4);
}

#[tokio::test]
async fn test_config_file_drives_analyzer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("carvex.toml");
    tokio::fs::write(&path, "[carving]\nmin_file_size = 1000\n")
        .await
        .unwrap();

    let config = EngineConfig::load_from(&path).unwrap();
    let data = mixed_buffer();
    let result = Analyzer::new(config)
        .analyze(&data, &InputFile::new("m", data.len() as u64))
        .unwrap();
    assert!(result.carved_files.is_empty());
}
