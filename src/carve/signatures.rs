//! File signature database for carving.
//!
//! Each format owns one or more variants: magic bytes at a fixed offset from
//! the file start, an optional footer, an optional secondary anchor, and an
//! optional context substring. The table is static and its order is part of
//! the contract: the carver takes the first variant that fully matches, so
//! variants sharing a prefix (the ZIP family) list their narrower members
//! first.

use serde::{Deserialize, Serialize};

/// File type categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Executable,
    Database,
}

/// Format family a signature identifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Jpeg,
    Png,
    Gif,
    Pdf,
    Jar,
    Docx,
    Xlsx,
    Pptx,
    Epub,
    Odt,
    Zip,
    Rar,
    #[serde(rename = "7z")]
    SevenZip,
    Gzip,
    Bzip2,
    Webp,
    Wav,
    Avi,
    Bmp,
    Tiff,
    Mp3,
    Flac,
    Ogg,
    Mp4,
    Pe,
    Elf,
    MachO,
    JavaClass,
    Sqlite,
}

impl FormatKind {
    /// Stable lowercase key used in labels and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatKind::Jpeg => "jpeg",
            FormatKind::Png => "png",
            FormatKind::Gif => "gif",
            FormatKind::Pdf => "pdf",
            FormatKind::Jar => "jar",
            FormatKind::Docx => "docx",
            FormatKind::Xlsx => "xlsx",
            FormatKind::Pptx => "pptx",
            FormatKind::Epub => "epub",
            FormatKind::Odt => "odt",
            FormatKind::Zip => "zip",
            FormatKind::Rar => "rar",
            FormatKind::SevenZip => "7z",
            FormatKind::Gzip => "gzip",
            FormatKind::Bzip2 => "bzip2",
            FormatKind::Webp => "webp",
            FormatKind::Wav => "wav",
            FormatKind::Avi => "avi",
            FormatKind::Bmp => "bmp",
            FormatKind::Tiff => "tiff",
            FormatKind::Mp3 => "mp3",
            FormatKind::Flac => "flac",
            FormatKind::Ogg => "ogg",
            FormatKind::Mp4 => "mp4",
            FormatKind::Pe => "pe",
            FormatKind::Elf => "elf",
            FormatKind::MachO => "macho",
            FormatKind::JavaClass => "javaclass",
            FormatKind::Sqlite => "sqlite",
        }
    }

    /// ZIP container formats share the local-file-header layout and EOCD trailer
    pub fn is_zip_family(&self) -> bool {
        matches!(
            self,
            FormatKind::Zip
                | FormatKind::Jar
                | FormatKind::Docx
                | FormatKind::Xlsx
                | FormatKind::Pptx
                | FormatKind::Epub
                | FormatKind::Odt
        )
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Second anchor that must also match before a candidate is accepted
#[derive(Debug, Clone, Copy)]
pub enum SecondaryCheck {
    /// `bytes` at a fixed offset from the file start
    Fixed {
        bytes: &'static [u8],
        offset: usize,
    },
    /// `PE\0\0` at the offset stored little-endian at file start + 60
    PeHeader,
}

/// One concrete way a format can begin
#[derive(Debug, Clone, Copy)]
pub struct SignatureVariant {
    /// Magic bytes
    pub magic: &'static [u8],
    /// Offset from the file start where the magic appears (usually 0)
    pub offset: usize,
    /// Optional footer bytes marking the end of file
    pub footer: Option<&'static [u8]>,
    pub secondary: Option<SecondaryCheck>,
    /// Substring required (case-insensitive) in the first 1024 bytes
    pub context: Option<&'static str>,
    pub extension: &'static str,
    pub description: &'static str,
}

/// A format and its ordered variants
#[derive(Debug)]
pub struct FileSignature {
    pub kind: FormatKind,
    pub file_type: FileType,
    pub variants: &'static [SignatureVariant],
}

/// A variant together with the format it belongs to
#[derive(Debug, Clone, Copy)]
pub struct VariantRef {
    pub signature: &'static FileSignature,
    pub variant: &'static SignatureVariant,
}

impl VariantRef {
    pub fn kind(&self) -> FormatKind {
        self.signature.kind
    }
}

const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const RIFF_MAGIC: &[u8] = b"RIFF";

const fn plain(
    magic: &'static [u8],
    extension: &'static str,
    description: &'static str,
) -> SignatureVariant {
    SignatureVariant {
        magic,
        offset: 0,
        footer: None,
        secondary: None,
        context: None,
        extension,
        description,
    }
}

const fn zip_member(
    context: &'static str,
    extension: &'static str,
    description: &'static str,
) -> SignatureVariant {
    SignatureVariant {
        magic: ZIP_MAGIC,
        offset: 0,
        footer: None,
        secondary: None,
        context: Some(context),
        extension,
        description,
    }
}

const fn riff(
    tag: &'static [u8],
    extension: &'static str,
    description: &'static str,
) -> SignatureVariant {
    SignatureVariant {
        magic: RIFF_MAGIC,
        offset: 0,
        footer: None,
        secondary: Some(SecondaryCheck::Fixed {
            bytes: tag,
            offset: 8,
        }),
        context: None,
        extension,
        description,
    }
}

/// All known signatures in match-priority order
pub static REGISTRY: &[FileSignature] = &[
    // === Images ===
    FileSignature {
        kind: FormatKind::Jpeg,
        file_type: FileType::Image,
        variants: &[SignatureVariant {
            magic: &[0xFF, 0xD8, 0xFF],
            offset: 0,
            footer: Some(&[0xFF, 0xD9]),
            secondary: None,
            context: None,
            extension: "jpg",
            description: "JPEG image",
        }],
    },
    FileSignature {
        kind: FormatKind::Png,
        file_type: FileType::Image,
        variants: &[SignatureVariant {
            magic: &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
            offset: 0,
            footer: Some(&[0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82]),
            secondary: None,
            context: None,
            extension: "png",
            description: "PNG image",
        }],
    },
    FileSignature {
        kind: FormatKind::Gif,
        file_type: FileType::Image,
        variants: &[
            SignatureVariant {
                magic: b"GIF87a",
                offset: 0,
                footer: Some(&[0x00, 0x3B]),
                secondary: None,
                context: None,
                extension: "gif",
                description: "GIF image (87a)",
            },
            SignatureVariant {
                magic: b"GIF89a",
                offset: 0,
                footer: Some(&[0x00, 0x3B]),
                secondary: None,
                context: None,
                extension: "gif",
                description: "GIF image (89a)",
            },
        ],
    },
    // === Documents ===
    FileSignature {
        kind: FormatKind::Pdf,
        file_type: FileType::Document,
        variants: &[SignatureVariant {
            magic: b"%PDF-",
            offset: 0,
            footer: Some(b"%%EOF"),
            secondary: None,
            context: None,
            extension: "pdf",
            description: "PDF document",
        }],
    },
    // === ZIP family: narrower members before plain ZIP ===
    FileSignature {
        kind: FormatKind::Jar,
        file_type: FileType::Archive,
        variants: &[zip_member("META-INF/", "jar", "Java archive")],
    },
    FileSignature {
        kind: FormatKind::Docx,
        file_type: FileType::Document,
        variants: &[zip_member("word/", "docx", "Word document (OOXML)")],
    },
    FileSignature {
        kind: FormatKind::Xlsx,
        file_type: FileType::Document,
        variants: &[zip_member("xl/", "xlsx", "Excel workbook (OOXML)")],
    },
    FileSignature {
        kind: FormatKind::Pptx,
        file_type: FileType::Document,
        variants: &[zip_member("ppt/", "pptx", "PowerPoint presentation (OOXML)")],
    },
    FileSignature {
        kind: FormatKind::Epub,
        file_type: FileType::Document,
        variants: &[zip_member("application/epub+zip", "epub", "EPUB e-book")],
    },
    FileSignature {
        kind: FormatKind::Odt,
        file_type: FileType::Document,
        variants: &[zip_member(
            "application/vnd.oasis.opendocument",
            "odt",
            "OpenDocument file",
        )],
    },
    FileSignature {
        kind: FormatKind::Zip,
        file_type: FileType::Archive,
        variants: &[plain(ZIP_MAGIC, "zip", "ZIP archive")],
    },
    // === Archives ===
    FileSignature {
        kind: FormatKind::Rar,
        file_type: FileType::Archive,
        variants: &[
            plain(
                &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x01, 0x00],
                "rar",
                "RAR archive (v5)",
            ),
            plain(
                &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x00],
                "rar",
                "RAR archive (v4)",
            ),
        ],
    },
    FileSignature {
        kind: FormatKind::SevenZip,
        file_type: FileType::Archive,
        variants: &[plain(
            &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C],
            "7z",
            "7-Zip archive",
        )],
    },
    FileSignature {
        kind: FormatKind::Gzip,
        file_type: FileType::Archive,
        variants: &[plain(&[0x1F, 0x8B, 0x08], "gz", "GZIP compressed data")],
    },
    FileSignature {
        kind: FormatKind::Bzip2,
        file_type: FileType::Archive,
        variants: &[SignatureVariant {
            magic: b"BZh",
            offset: 0,
            footer: None,
            secondary: Some(SecondaryCheck::Fixed {
                bytes: b"1AY&SY",
                offset: 4,
            }),
            context: None,
            extension: "bz2",
            description: "BZIP2 compressed data",
        }],
    },
    // === RIFF containers ===
    FileSignature {
        kind: FormatKind::Webp,
        file_type: FileType::Image,
        variants: &[riff(b"WEBP", "webp", "WebP image")],
    },
    FileSignature {
        kind: FormatKind::Wav,
        file_type: FileType::Audio,
        variants: &[riff(b"WAVE", "wav", "WAV audio")],
    },
    FileSignature {
        kind: FormatKind::Avi,
        file_type: FileType::Video,
        variants: &[riff(b"AVI ", "avi", "AVI video")],
    },
    // === More images ===
    FileSignature {
        kind: FormatKind::Bmp,
        file_type: FileType::Image,
        variants: &[SignatureVariant {
            magic: &[0x42, 0x4D],
            offset: 0,
            footer: None,
            secondary: Some(SecondaryCheck::Fixed {
                bytes: &[0x00, 0x00, 0x00, 0x00],
                offset: 6,
            }),
            context: None,
            extension: "bmp",
            description: "BMP image",
        }],
    },
    FileSignature {
        kind: FormatKind::Tiff,
        file_type: FileType::Image,
        variants: &[
            plain(&[0x49, 0x49, 0x2A, 0x00], "tiff", "TIFF image (little-endian)"),
            plain(&[0x4D, 0x4D, 0x00, 0x2A], "tiff", "TIFF image (big-endian)"),
        ],
    },
    // === Audio / video ===
    FileSignature {
        kind: FormatKind::Mp3,
        file_type: FileType::Audio,
        variants: &[plain(b"ID3", "mp3", "MP3 audio (ID3v2)")],
    },
    FileSignature {
        kind: FormatKind::Flac,
        file_type: FileType::Audio,
        variants: &[plain(b"fLaC", "flac", "FLAC audio")],
    },
    FileSignature {
        kind: FormatKind::Ogg,
        file_type: FileType::Audio,
        variants: &[SignatureVariant {
            magic: b"OggS",
            offset: 0,
            footer: None,
            secondary: Some(SecondaryCheck::Fixed {
                bytes: &[0x00],
                offset: 4,
            }),
            context: None,
            extension: "ogg",
            description: "Ogg container",
        }],
    },
    FileSignature {
        kind: FormatKind::Mp4,
        file_type: FileType::Video,
        variants: &[SignatureVariant {
            magic: b"ftyp",
            offset: 4,
            footer: None,
            secondary: None,
            context: None,
            extension: "mp4",
            description: "MPEG-4 / QuickTime media",
        }],
    },
    // === Executables ===
    FileSignature {
        kind: FormatKind::Pe,
        file_type: FileType::Executable,
        variants: &[SignatureVariant {
            magic: b"MZ",
            offset: 0,
            footer: None,
            secondary: Some(SecondaryCheck::PeHeader),
            context: None,
            extension: "exe",
            description: "Windows PE executable",
        }],
    },
    FileSignature {
        kind: FormatKind::Elf,
        file_type: FileType::Executable,
        variants: &[plain(&[0x7F, 0x45, 0x4C, 0x46], "elf", "ELF executable")],
    },
    FileSignature {
        kind: FormatKind::MachO,
        file_type: FileType::Executable,
        variants: &[
            plain(&[0xFE, 0xED, 0xFA, 0xCE], "macho", "Mach-O executable (32-bit BE)"),
            plain(&[0xFE, 0xED, 0xFA, 0xCF], "macho", "Mach-O executable (64-bit BE)"),
            plain(&[0xCE, 0xFA, 0xED, 0xFE], "macho", "Mach-O executable (32-bit LE)"),
            plain(&[0xCF, 0xFA, 0xED, 0xFE], "macho", "Mach-O executable (64-bit LE)"),
        ],
    },
    FileSignature {
        kind: FormatKind::JavaClass,
        file_type: FileType::Executable,
        variants: &[plain(&[0xCA, 0xFE, 0xBA, 0xBE], "class", "Java class file")],
    },
    // === Database ===
    FileSignature {
        kind: FormatKind::Sqlite,
        file_type: FileType::Database,
        variants: &[plain(b"SQLite format 3\x00", "sqlite", "SQLite database")],
    },
];

/// Look up the signature entry for `kind`
pub fn signature(kind: FormatKind) -> Option<&'static FileSignature> {
    REGISTRY.iter().find(|s| s.kind == kind)
}

/// Ordered variants for `kind`, empty when the kind has no entry
pub fn variants(kind: FormatKind) -> &'static [SignatureVariant] {
    signature(kind).map_or(&[], |s| s.variants)
}

/// Every variant flattened in registry order
pub fn ordered_variants() -> Vec<VariantRef> {
    REGISTRY
        .iter()
        .flat_map(|signature| {
            signature
                .variants
                .iter()
                .map(move |variant| VariantRef { signature, variant })
        })
        .collect()
}

/// Build a fast lookup: for each possible first byte, which offset-0 variants start with it
pub fn build_first_byte_index(variants: &[VariantRef]) -> [Vec<usize>; 256] {
    let mut index: [Vec<usize>; 256] = std::array::from_fn(|_| Vec::new());
    for (i, v) in variants.iter().enumerate() {
        if v.variant.offset == 0 {
            if let Some(&first) = v.variant.magic.first() {
                index[first as usize].push(i);
            }
        }
    }
    index
}

/// Build index for variants with non-zero offset (e.g. MP4 ftyp at offset 4)
pub fn build_offset_signatures(variants: &[VariantRef]) -> Vec<(usize, usize)> {
    variants
        .iter()
        .enumerate()
        .filter(|(_, v)| v.variant.offset > 0)
        .map(|(i, v)| (i, v.variant.offset))
        .collect()
}

/// Candidate variants per byte at the cursor, in registry order.
///
/// Offset variants cannot be keyed on the cursor byte, so they appear in every bucket.
pub fn build_dispatch_index(variants: &[VariantRef]) -> [Vec<usize>; 256] {
    let mut index = build_first_byte_index(variants);
    let offset_sigs = build_offset_signatures(variants);
    for bucket in index.iter_mut() {
        bucket.extend(offset_sigs.iter().map(|&(i, _)| i));
        bucket.sort_unstable();
    }
    index
}
